// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

use crate::ir::{AllocSiteId, CallSiteId, FieldId, MethodId, TypeId, VarId};

use super::pfg::PFGEdgeKind;

/// A tuple type consisting of source variable, destination variable and edge kind.
pub type InternalEdge = (VarId, VarId, PFGEdgeKind);

/// The context-free flow constraints of one method.
///
/// A method's statements are translated into a template once, the first time
/// the method becomes reachable; the template is then instantiated for every
/// context the method is analyzed under.
#[derive(Debug)]
pub struct MethodPFG {
    pub(crate) method: MethodId,
    /// Allocations `x = new T`.
    pub(crate) allocs: Vec<(VarId, AllocSiteId)>,
    /// Edges between local variables, including deferred loads and stores.
    pub(crate) internal_edges: Vec<InternalEdge>,
    /// `x = T.f`
    pub(crate) static_loads: Vec<(FieldId, VarId)>,
    /// `T.f = x`
    pub(crate) static_stores: Vec<(VarId, FieldId)>,
    /// Calls whose targets are known without a receiver object.
    pub(crate) static_callsites: Vec<CallSiteId>,
    /// Calls resolved on-the-fly, paired with their receiver variable.
    pub(crate) instance_callsites: Vec<(VarId, CallSiteId)>,
    /// Classes initialized when the method runs, by allocation or static field access.
    pub(crate) initialized_classes: Vec<TypeId>,
}

impl MethodPFG {
    pub fn new(method: MethodId) -> Self {
        MethodPFG {
            method,
            allocs: Vec::new(),
            internal_edges: Vec::new(),
            static_loads: Vec::new(),
            static_stores: Vec::new(),
            static_callsites: Vec::new(),
            instance_callsites: Vec::new(),
            initialized_classes: Vec::new(),
        }
    }

    #[inline]
    pub fn method(&self) -> MethodId {
        self.method
    }

    pub fn add_internal_edge(&mut self, src: VarId, dst: VarId, kind: PFGEdgeKind) {
        self.internal_edges.push((src, dst, kind));
    }

    pub fn internal_edges_iter(&self) -> std::slice::Iter<'_, InternalEdge> {
        self.internal_edges.iter()
    }

    pub fn add_initialized_class(&mut self, class: TypeId) {
        if !self.initialized_classes.contains(&class) {
            self.initialized_classes.push(class);
        }
    }
}
