// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! This module provides essential functions for resolving call targets.

use crate::ir::{CallKind, CallSite, MethodId, Program, TypeId};

/// Resolves the target of `call_site`.
///
/// `receiver_type` is the runtime type of the receiver object and is only
/// consulted for virtual and interface calls. Returns `None` if the call
/// cannot be resolved, in which case it contributes no call edge.
pub fn resolve_callee(program: &Program, call_site: &CallSite, receiver_type: Option<TypeId>) -> Option<MethodId> {
    match call_site.kind {
        CallKind::Static => resolve_static_call(program, call_site),
        CallKind::Special => {
            let caller_class = program.method(call_site.container).declaring_class;
            program.resolve_special(&call_site.method_ref, caller_class)
        }
        CallKind::Virtual | CallKind::Interface => {
            program.dispatch(receiver_type?, &call_site.method_ref)
        }
    }
}

/// Resolves a static call to its declared target, or `None` if the target is
/// missing or not a static method.
pub fn resolve_static_call(program: &Program, call_site: &CallSite) -> Option<MethodId> {
    program
        .resolve_static(&call_site.method_ref)
        .filter(|m| program.method(*m).is_static())
}

/// Returns true if the result of resolving `call_site` depends on the type of
/// the receiver object.
#[inline]
pub fn is_dynamic_dispatch(call_site: &CallSite) -> bool {
    matches!(call_site.kind, CallKind::Virtual | CallKind::Interface)
}
