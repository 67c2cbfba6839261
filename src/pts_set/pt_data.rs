// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::marker::PhantomData;

use super::points_to::PointsToSet;
use crate::util::bit_vec::Idx;

/// Diff points-to data.
///
/// The points-to set of a key is split into the part that has already been
/// propagated along its outgoing edges (`propa`) and the part that has not
/// (`diff`). Only the diff is pushed along flow edges; once a key has been
/// processed, its diff is flushed into its propagated set.
///
/// K  (Key):     "owning" pointer of a points-to set.
/// D  (Data):    elements in points-to sets.
/// DS (DataSet): the points-to set; a collection of Data.
pub struct DiffPTData<K, D, DS> {
    /// Diff points-to to be propagated.
    pub(crate) diff_pts_map: HashMap<K, DS>,
    /// Points-to already propagated.
    pub(crate) propa_pts_map: HashMap<K, DS>,

    marker: PhantomData<D>,
}

impl<K, D, DS> fmt::Debug for DiffPTData<K, D, DS> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        "DiffPTData".fmt(f)
    }
}

impl<K, D, DS> Default for DiffPTData<K, D, DS>
where
    K: Hash + Eq + Copy,
    D: Idx,
    DS: PointsToSet<D> + Clone + fmt::Debug,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, D, DS> DiffPTData<K, D, DS>
where
    K: Hash + Eq + Copy,
    D: Idx,
    DS: PointsToSet<D> + Clone + fmt::Debug,
{
    pub fn new() -> DiffPTData<K, D, DS> {
        DiffPTData {
            diff_pts_map: HashMap::new(),
            propa_pts_map: HashMap::new(),
            marker: PhantomData,
        }
    }

    /// Adds element to the points-to set associated with var.
    /// Returns false if elem is already in this set
    #[inline]
    pub fn add_pts(&mut self, var: K, elem: D) -> bool {
        if let Some(propa) = self.propa_pts_map.get(&var) {
            if propa.contains(elem) {
                return false;
            }
        }
        self.diff_pts_map.entry(var).or_insert_with(DS::new).insert(elem)
    }

    /// diff_pts(dst_var) = diff_pts(dst_var) U (src_ds - propa_pts(dst_var)).
    pub fn union_pts_to(&mut self, dst_var: K, src_ds: &DS) -> bool {
        if src_ds.is_empty() {
            return false;
        }
        let mut new = src_ds.clone();
        if let Some(propa) = self.propa_pts_map.get(&dst_var) {
            new.subtract(propa);
        }
        if new.is_empty() {
            return false;
        }
        self.diff_pts_map.entry(dst_var).or_insert_with(DS::new).union(&new)
    }

    /// The whole points-to set of `var`, propagated or not.
    pub fn get_pts(&self, var: K) -> DS {
        let mut pts = self.propa_pts_map.get(&var).cloned().unwrap_or_else(DS::new);
        if let Some(diff) = self.diff_pts_map.get(&var) {
            pts.union(diff);
        }
        pts
    }

    /// Moves the diff of `var` into its propagated set and returns the moved objects.
    pub fn flush(&mut self, var: K) -> Option<DS> {
        let diff = self.diff_pts_map.remove(&var)?;
        if diff.is_empty() {
            return None;
        }
        self.propa_pts_map.entry(var).or_insert_with(DS::new).union(&diff);
        Some(diff)
    }
}
