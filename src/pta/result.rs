// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! Read-only queries over the closed analysis state.

use std::collections::{BTreeSet, HashMap};
use std::fmt::{Debug, Formatter};

use itertools::Itertools;

use super::ContextSensitivity;
use crate::builder::call_graph_builder;
use crate::cs::{
    CSCallSiteId, CSManager, CSMethodId, CSObjId, ContextId, Pointer, PointerId, PointsTo,
};
use crate::graph::call_graph::{CICallGraph, CSCallGraph};
use crate::graph::pfg::{PFGEdgeKind, PFG};
use crate::heap::{HeapModel, ObjId};
use crate::ir::{AllocSiteId, CallKind, CallSiteId, FieldId, MethodId, Program, TypeId, VarId};
use crate::pta::propagator::propagator::filter_objs;
use crate::pts_set::points_to::PointsToSet;
use crate::util::bit_vec::Idx;

/// The result of a pointer analysis run: points-to sets of all pointers and
/// the call graph, context-sensitive and projected.
pub struct PTAResult<'p> {
    pub(crate) program: &'p Program,
    pub(crate) context_sensitivity: ContextSensitivity,
    pub(crate) heap: HeapModel,
    pub(crate) csm: CSManager,
    pub(crate) pfg: PFG,
    pub(crate) call_graph: CSCallGraph,
    pub(crate) ci_call_graph: CICallGraph,
    pub(crate) receiver_calls: HashMap<PointerId, Vec<CSCallSiteId>>,
    pub(crate) unresolved_calls: BTreeSet<(CallSiteId, Option<TypeId>)>,
    /// The rendered elements of every context, indexed by context id.
    pub(crate) contexts: Vec<Vec<String>>,
}

impl<'p> Debug for PTAResult<'p> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        "PTAResult".fmt(f)
    }
}

impl<'p> PTAResult<'p> {
    #[inline]
    pub fn program(&self) -> &'p Program {
        self.program
    }

    #[inline]
    pub fn context_sensitivity(&self) -> ContextSensitivity {
        self.context_sensitivity
    }

    #[inline]
    pub fn heap(&self) -> &HeapModel {
        &self.heap
    }

    #[inline]
    pub fn csm(&self) -> &CSManager {
        &self.csm
    }

    #[inline]
    pub fn pfg(&self) -> &PFG {
        &self.pfg
    }

    #[inline]
    pub fn call_graph(&self) -> &CSCallGraph {
        &self.call_graph
    }

    #[inline]
    pub fn ci_call_graph(&self) -> &CICallGraph {
        &self.ci_call_graph
    }

    /// The object created for the allocation site `site`, if it was reached.
    pub fn obj_of_site(&self, site: AllocSiteId) -> Option<ObjId> {
        self.heap.find_obj(site)
    }

    pub fn num_contexts(&self) -> usize {
        self.contexts.len()
    }

    /// The rendered elements of a context, oldest first.
    pub fn context_elements(&self, cid: ContextId) -> &[String] {
        self.contexts.get(cid.index()).map_or(&[], |elems| elems.as_slice())
    }

    /// The points-to set of `pointer`.
    pub fn points_to(&self, pointer: PointerId) -> PointsTo {
        self.csm.points_to(pointer)
    }

    fn objs_of(&self, pts: &PointsTo) -> Vec<ObjId> {
        pts.iter().map(|cs_obj| self.csm.get_cs_obj(cs_obj).obj).collect_vec()
    }

    /// The points-to set of `var` under context `cid`.
    pub fn cs_var_points_to(&self, cid: ContextId, var: VarId) -> PointsTo {
        self.csm
            .find_cs_var(cid, var)
            .and_then(|cs_var| self.csm.find_pointer(&Pointer::Var(cs_var)))
            .map(|pointer| self.points_to(pointer))
            .unwrap_or_default()
    }

    /// The objects `var` may point to in any context.
    pub fn var_points_to(&self, var: VarId) -> BTreeSet<ObjId> {
        self.csm
            .cs_vars()
            .filter(|(_, cs_var)| cs_var.var == var)
            .filter_map(|(cs_var, _)| self.csm.find_pointer(&Pointer::Var(cs_var)))
            .flat_map(|pointer| self.objs_of(&self.points_to(pointer)))
            .collect()
    }

    /// The contexts `var` was analyzed under.
    pub fn contexts_of_var(&self, var: VarId) -> Vec<ContextId> {
        self.csm
            .cs_vars()
            .filter(|(_, cs_var)| cs_var.var == var)
            .map(|(_, cs_var)| cs_var.cid)
            .collect()
    }

    fn ci_projection(&self, matches: impl Fn(&Pointer) -> bool) -> BTreeSet<ObjId> {
        self.csm
            .pointers()
            .filter(|(_, pointer)| matches(pointer))
            .flat_map(|(pointer, _)| self.objs_of(&self.points_to(pointer)))
            .collect()
    }

    /// The objects the field `field` of `obj` may point to, over all heap
    /// contexts of `obj`.
    pub fn instance_field_points_to(&self, obj: ObjId, field: FieldId) -> BTreeSet<ObjId> {
        self.ci_projection(|pointer| match pointer {
            Pointer::InstanceField(base, f) => *f == field && self.csm.get_cs_obj(*base).obj == obj,
            _ => false,
        })
    }

    pub fn static_field_points_to(&self, field: FieldId) -> BTreeSet<ObjId> {
        self.ci_projection(|pointer| matches!(pointer, Pointer::StaticField(f) if *f == field))
    }

    /// The objects stored in the array object `obj`, over all its heap contexts.
    pub fn array_index_points_to(&self, obj: ObjId) -> BTreeSet<ObjId> {
        self.ci_projection(|pointer| match pointer {
            Pointer::ArrayIndex(base) => self.csm.get_cs_obj(*base).obj == obj,
            _ => false,
        })
    }

    /// Reachable methods, in discovery order.
    pub fn reachable_methods(&self) -> impl Iterator<Item = MethodId> + '_ {
        self.ci_call_graph.reach_funcs()
    }

    /// Reachable context-sensitive methods, in discovery order.
    pub fn reachable_cs_methods(&self) -> impl Iterator<Item = CSMethodId> + '_ {
        self.call_graph.reach_funcs()
    }

    pub fn is_reachable(&self, method: MethodId) -> bool {
        self.ci_call_graph.contains_node(method)
    }

    /// The contexts `method` is reachable under.
    pub fn contexts_of(&self, method: MethodId) -> Vec<ContextId> {
        self.call_graph
            .reach_funcs()
            .map(|cs_method| self.csm.get_cs_method(cs_method))
            .filter(|cs_method| cs_method.method == method)
            .map(|cs_method| cs_method.cid)
            .collect()
    }

    /// Context-insensitive call edges as `(call site, callee, kind)`.
    pub fn call_edges(&self) -> BTreeSet<(CallSiteId, MethodId, CallKind)> {
        self.ci_call_graph
            .edges()
            .map(|(callsite, _, callee, kind)| (callsite, callee, kind))
            .collect()
    }

    /// Context-sensitive call edges as `(call site, caller, callee, kind)`.
    pub fn cs_call_edges(&self) -> Vec<(CSCallSiteId, CSMethodId, CSMethodId, CallKind)> {
        self.call_graph.edges().collect()
    }

    /// The methods called from `call_site` in any context.
    pub fn callees_of(&self, call_site: CallSiteId) -> BTreeSet<MethodId> {
        self.ci_call_graph.get_callees(&call_site).into_iter().collect()
    }

    /// The methods called from `call_site` under the caller context `cid`.
    pub fn cs_callees_of(&self, cid: ContextId, call_site: CallSiteId) -> BTreeSet<CSMethodId> {
        self.csm
            .find_cs_call_site(cid, call_site)
            .map(|cs_callsite| self.call_graph.get_callees(&cs_callsite).into_iter().collect())
            .unwrap_or_default()
    }

    /// Calls that found no target, with the receiver type that was tried
    /// (`None` for calls without a receiver).
    pub fn unresolved_calls(&self) -> &BTreeSet<(CallSiteId, Option<TypeId>)> {
        &self.unresolved_calls
    }

    pub fn is_unresolved(&self, call_site: CallSiteId) -> bool {
        self.unresolved_calls
            .range((call_site, None)..)
            .next()
            .map_or(false, |(cs, _)| *cs == call_site)
    }

    /// Returns true if no constraint of the analysis is violated by the
    /// computed points-to sets.
    pub fn check_fixpoint(&self) -> bool {
        let violations = self.fixpoint_violations();
        for violation in &violations {
            log::warn!("Fixpoint violation: {}", violation);
        }
        violations.is_empty()
    }

    /// Describes every flow edge whose target misses objects of its source,
    /// every deferred load or store not instantiated for an object of its base,
    /// and every receiver object whose resolvable call has no call edge.
    pub fn fixpoint_violations(&self) -> Vec<String> {
        let mut violations = Vec::new();
        for (src, dst, kind) in self.pfg.edges() {
            let src_pts = self.points_to(src);
            if kind.is_direct() {
                let flowing = filter_objs(self.program, &self.heap, &self.csm, kind, src_pts);
                if !self.points_to(dst).superset(&flowing) {
                    violations.push(format!("{:?} -> {:?} ({:?}) is not closed", src, dst, kind));
                }
                continue;
            }
            let base = match kind {
                PFGEdgeKind::Load(_) | PFGEdgeKind::LoadArray => src,
                _ => dst,
            };
            for obj in self.points_to(base).iter() {
                if !self.is_materialized(src, dst, kind, obj) {
                    violations.push(format!(
                        "{:?} -> {:?} ({:?}) is not instantiated for {:?}",
                        src, dst, kind, obj
                    ));
                }
            }
        }
        for (receiver, callsites) in &self.receiver_calls {
            for cs_callsite in callsites {
                let call_site = self.csm.get_cs_call_site(*cs_callsite).call_site;
                let cs = self.program.call_site(call_site);
                for obj in self.points_to(*receiver).iter() {
                    let ty = self.heap.obj_type(self.program, self.csm.get_cs_obj(obj).obj);
                    if let Some(callee) = call_graph_builder::resolve_callee(self.program, cs, Some(ty)) {
                        if !self.ci_call_graph.has_edge(&call_site, callee) {
                            violations.push(format!(
                                "{} misses its call edge to {}",
                                self.program.call_site_display(call_site),
                                self.program.method_signature(callee)
                            ));
                        }
                    }
                }
            }
        }
        violations
    }

    fn is_materialized(&self, src: PointerId, dst: PointerId, kind: PFGEdgeKind, obj: CSObjId) -> bool {
        let (pointer, edge) = match kind {
            PFGEdgeKind::Load(field) => (Pointer::InstanceField(obj, field), PFGEdgeKind::InstanceLoad),
            PFGEdgeKind::Store(field) => (Pointer::InstanceField(obj, field), PFGEdgeKind::InstanceStore),
            PFGEdgeKind::LoadArray => (Pointer::ArrayIndex(obj), PFGEdgeKind::ArrayLoad),
            _ => (Pointer::ArrayIndex(obj), PFGEdgeKind::ArrayStore),
        };
        match self.csm.find_pointer(&pointer) {
            Some(pointer) if matches!(kind, PFGEdgeKind::Load(_) | PFGEdgeKind::LoadArray) => {
                self.pfg.has_edge(pointer, dst, edge)
            }
            Some(pointer) => self.pfg.has_edge(src, pointer, edge),
            None => false,
        }
    }
}
