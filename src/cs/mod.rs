// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! Contexts and the registry of context-sensitive elements.

pub mod context;
pub mod elements;
pub mod manager;

pub use context::{Context, ContextCache, ContextElement, ContextId, EMPTY_CONTEXT};
pub use elements::{
    CSCallSite, CSCallSiteId, CSMethod, CSMethodId, CSObj, CSObjId, CSVar, CSVarId, Pointer, PointerId,
};
pub use manager::{CSManager, PointsTo};
