// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;

use super::context::ContextId;
use super::elements::*;
use crate::heap::ObjId;
use crate::ir::{CallSiteId, FieldId, MethodId, VarId};
use crate::pts_set::points_to::HybridPointsToSet;
use crate::pts_set::pt_data::DiffPTData;
use crate::util::bit_vec::Idx;
use crate::util::index_vec::IndexVec;

pub type PointsTo = HybridPointsToSet<CSObjId>;
pub type DiffPTDataTy = DiffPTData<PointerId, CSObjId, PointsTo>;

/// An arena paired with a reverse map, handing out one index per distinct value.
#[derive(Clone)]
pub struct Interner<I: Idx, T> {
    values: IndexVec<I, T>,
    index_map: HashMap<T, I>,
}

impl<I: Idx, T: Copy + Eq + Hash> Default for Interner<I, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I: Idx, T: Copy + Eq + Hash> Interner<I, T> {
    pub fn new() -> Self {
        Interner {
            values: IndexVec::new(),
            index_map: HashMap::new(),
        }
    }

    pub fn intern(&mut self, value: T) -> I {
        if let Some(id) = self.index_map.get(&value) {
            return *id;
        }
        let id = self.values.push(value);
        self.index_map.insert(value, id);
        id
    }

    #[inline]
    pub fn lookup(&self, value: &T) -> Option<I> {
        self.index_map.get(value).copied()
    }

    #[inline]
    pub fn get(&self, id: I) -> T {
        self.values[id]
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter_enumerated(&self) -> impl Iterator<Item = (I, T)> + '_ {
        self.values.iter_enumerated().map(|(id, value)| (id, *value))
    }
}

/// Canonicalizes context-sensitive elements and pointers, and owns the
/// points-to set of every pointer.
///
/// Each lookup returns the same id for structurally equal keys, so ids can be
/// compared directly.
#[derive(Default)]
pub struct CSManager {
    cs_vars: Interner<CSVarId, CSVar>,
    cs_methods: Interner<CSMethodId, CSMethod>,
    cs_call_sites: Interner<CSCallSiteId, CSCallSite>,
    cs_objs: Interner<CSObjId, CSObj>,
    pointers: Interner<PointerId, Pointer>,
    /// Points-to data of all pointers.
    pub(crate) pt_data: DiffPTDataTy,
}

impl fmt::Debug for CSManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        "CSManager".fmt(f)
    }
}

impl CSManager {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn cs_var(&mut self, cid: ContextId, var: VarId) -> CSVarId {
        self.cs_vars.intern(CSVar { cid, var })
    }

    #[inline]
    pub fn cs_method(&mut self, cid: ContextId, method: MethodId) -> CSMethodId {
        self.cs_methods.intern(CSMethod { cid, method })
    }

    #[inline]
    pub fn cs_call_site(&mut self, cid: ContextId, call_site: CallSiteId) -> CSCallSiteId {
        self.cs_call_sites.intern(CSCallSite { cid, call_site })
    }

    #[inline]
    pub fn cs_obj(&mut self, heap_cid: ContextId, obj: ObjId) -> CSObjId {
        self.cs_objs.intern(CSObj { cid: heap_cid, obj })
    }

    #[inline]
    pub fn var_pointer(&mut self, cs_var: CSVarId) -> PointerId {
        self.pointers.intern(Pointer::Var(cs_var))
    }

    /// The pointer of variable `var` under context `cid`.
    pub fn cs_var_pointer(&mut self, cid: ContextId, var: VarId) -> PointerId {
        let cs_var = self.cs_var(cid, var);
        self.var_pointer(cs_var)
    }

    #[inline]
    pub fn instance_field(&mut self, base: CSObjId, field: FieldId) -> PointerId {
        self.pointers.intern(Pointer::InstanceField(base, field))
    }

    #[inline]
    pub fn static_field(&mut self, field: FieldId) -> PointerId {
        self.pointers.intern(Pointer::StaticField(field))
    }

    #[inline]
    pub fn array_index(&mut self, base: CSObjId) -> PointerId {
        self.pointers.intern(Pointer::ArrayIndex(base))
    }

    #[inline]
    pub fn native_temp(&mut self, cs_call_site: CSCallSiteId) -> PointerId {
        self.pointers.intern(Pointer::NativeTemp(cs_call_site))
    }

    #[inline]
    pub fn get_cs_var(&self, id: CSVarId) -> CSVar {
        self.cs_vars.get(id)
    }

    #[inline]
    pub fn get_cs_method(&self, id: CSMethodId) -> CSMethod {
        self.cs_methods.get(id)
    }

    #[inline]
    pub fn get_cs_call_site(&self, id: CSCallSiteId) -> CSCallSite {
        self.cs_call_sites.get(id)
    }

    #[inline]
    pub fn get_cs_obj(&self, id: CSObjId) -> CSObj {
        self.cs_objs.get(id)
    }

    #[inline]
    pub fn get_pointer(&self, id: PointerId) -> Pointer {
        self.pointers.get(id)
    }

    /// Looks a pointer up without creating it.
    pub fn find_pointer(&self, pointer: &Pointer) -> Option<PointerId> {
        self.pointers.lookup(pointer)
    }

    pub fn find_cs_var(&self, cid: ContextId, var: VarId) -> Option<CSVarId> {
        self.cs_vars.lookup(&CSVar { cid, var })
    }

    pub fn find_cs_call_site(&self, cid: ContextId, call_site: CallSiteId) -> Option<CSCallSiteId> {
        self.cs_call_sites.lookup(&CSCallSite { cid, call_site })
    }

    pub fn pointers(&self) -> impl Iterator<Item = (PointerId, Pointer)> + '_ {
        self.pointers.iter_enumerated()
    }

    pub fn cs_vars(&self) -> impl Iterator<Item = (CSVarId, CSVar)> + '_ {
        self.cs_vars.iter_enumerated()
    }

    pub fn cs_objs(&self) -> impl Iterator<Item = (CSObjId, CSObj)> + '_ {
        self.cs_objs.iter_enumerated()
    }

    pub fn num_pointers(&self) -> usize {
        self.pointers.len()
    }

    pub fn num_cs_vars(&self) -> usize {
        self.cs_vars.len()
    }

    pub fn num_cs_objs(&self) -> usize {
        self.cs_objs.len()
    }

    pub fn num_cs_methods(&self) -> usize {
        self.cs_methods.len()
    }

    /// The whole points-to set of `pointer`.
    pub fn points_to(&self, pointer: PointerId) -> PointsTo {
        self.pt_data.get_pts(pointer)
    }}
