// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! Provides special handling for a set of native methods.
//!
//! A native method has no body to analyze. The methods listed here have a
//! fixed model of their effect on the heap; every other native method only
//! contributes a call edge.

use lazy_static::lazy_static;
use std::collections::HashMap;

use crate::ir::known_names;
use crate::ir::{MethodId, Program};

/// The heap effect of a specially handled native method.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum NativeModel {
    /// `System.arraycopy(src, srcPos, dest, destPos, length)`: the elements of
    /// `src` flow into the elements of `dest`.
    ArrayCopy { src: usize, dest: usize },
}

lazy_static! {
    /// Specially handled methods, keyed by their full signature.
    static ref SPECIALLY_HANDLED_METHODS: HashMap<String, NativeModel> = {
        let mut map = HashMap::new();
        map.insert(
            format!("<{}: {}>", known_names::JAVA_LANG_SYSTEM, known_names::ARRAYCOPY_SUBSIG),
            NativeModel::ArrayCopy { src: 0, dest: 2 },
        );
        map
    };
}

/// Returns the model of `method`, if it is specially handled.
pub fn native_model(program: &Program, method: MethodId) -> Option<NativeModel> {
    SPECIALLY_HANDLED_METHODS
        .get(&program.method_signature(method))
        .copied()
}
