// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! Context-sensitive program elements and the pointers that own points-to sets.

use super::context::ContextId;
use crate::heap::ObjId;
use crate::ir::{CallSiteId, FieldId, MethodId, VarId};

crate::newtype_index! { pub struct CSVarId; }
crate::newtype_index! { pub struct CSMethodId; }
crate::newtype_index! { pub struct CSCallSiteId; }
crate::newtype_index! {
    /// A context-sensitive heap object, the element type of every points-to set.
    pub struct CSObjId;
}
crate::newtype_index! { pub struct PointerId; }

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct CSVar {
    pub cid: ContextId,
    pub var: VarId,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct CSMethod {
    pub cid: ContextId,
    pub method: MethodId,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct CSCallSite {
    pub cid: ContextId,
    pub call_site: CallSiteId,
}

/// An abstract object qualified by its heap context.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct CSObj {
    pub cid: ContextId,
    pub obj: ObjId,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Pointer {
    Var(CSVarId),
    /// The field `f` of a context-sensitive object.
    InstanceField(CSObjId, FieldId),
    StaticField(FieldId),
    /// All elements of an array object.
    ArrayIndex(CSObjId),
    /// A temporary owned by the native model of a call.
    NativeTemp(CSCallSiteId),
}
