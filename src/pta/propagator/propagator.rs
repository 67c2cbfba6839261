// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! The key component of our pointer analysis.

use std::collections::{HashMap, VecDeque};

use log::*;

use crate::cs::{CSCallSiteId, CSManager, CSObjId, PointerId, PointsTo};
use crate::graph::pfg::{PFGEdgeId, PFGEdgeKind, PFG};
use crate::heap::HeapModel;
use crate::ir::Program;
use crate::pta::plugin::{Plugin, PluginEnv};
use crate::pts_set::points_to::PointsToSet;

/// Propagating the points-to information along the PFG edges.
pub struct Propagator<'pta> {
    pub(crate) program: &'pta Program,
    pub(crate) heap: &'pta mut HeapModel,
    /// Registry of context-sensitive elements, owning the points-to data.
    pub(crate) csm: &'pta mut CSManager,
    /// Pointer Flow Graph
    pub(crate) pfg: &'pta mut PFG,

    /// Instance calls waiting on the objects of their receiver pointer.
    receiver_calls: &'pta HashMap<PointerId, Vec<CSCallSiteId>>,
    /// Receiver objects reaching instance calls, to be dispatched by the solver
    /// once the worklist is empty.
    new_call_instances: &'pta mut Vec<(CSCallSiteId, CSObjId)>,

    /// Points-to facts added outside of propagation: allocations, receiver
    /// bindings and plugin facts.
    pending_pts: &'pta mut Vec<(PointerId, CSObjId)>,
    /// Edges added since the last run, whose sources' whole sets still have to
    /// flow across them.
    new_direct_edges: &'pta mut Vec<PFGEdgeId>,

    plugin: &'pta mut dyn Plugin,

    /// Worklist for resolution
    worklist: VecDeque<PointerId>,
}

impl<'pta> Propagator<'pta> {
    /// Constructor
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        program: &'pta Program,
        heap: &'pta mut HeapModel,
        csm: &'pta mut CSManager,
        pfg: &'pta mut PFG,
        receiver_calls: &'pta HashMap<PointerId, Vec<CSCallSiteId>>,
        new_call_instances: &'pta mut Vec<(CSCallSiteId, CSObjId)>,
        pending_pts: &'pta mut Vec<(PointerId, CSObjId)>,
        new_direct_edges: &'pta mut Vec<PFGEdgeId>,
        plugin: &'pta mut dyn Plugin,
    ) -> Self {
        Propagator {
            program,
            heap,
            csm,
            pfg,
            receiver_calls,
            new_call_instances,
            pending_pts,
            new_direct_edges,
            plugin,
            worklist: VecDeque::new(),
        }
    }

    /// Propagate pts data until the worklist is empty.
    pub fn solve_worklist(&mut self) {
        self.init_constraints();
        while let Some(pointer) = self.worklist.pop_front() {
            self.process_node(pointer);
        }
    }

    /// Initialize the worklist, activate new constraints.
    pub fn init_constraints(&mut self) {
        self.process_pending_pts();
        for edge in std::mem::take(self.new_direct_edges) {
            self.propagate(edge, None);
        }
    }

    fn process_pending_pts(&mut self) {
        for (pointer, obj) in std::mem::take(self.pending_pts) {
            if self.csm.pt_data.add_pts(pointer, obj) {
                self.worklist.push_back(pointer);
            }
        }
    }

    /// Processes the objects newly added to `pointer`.
    ///
    /// The diff is flushed up front, so objects reaching `pointer` while it is
    /// processed form a new diff and `pointer` is visited again.
    fn process_node(&mut self, pointer: PointerId) {
        let diff = match self.csm.pt_data.flush(pointer) {
            Some(diff) => diff,
            None => return,
        };

        self.notify_plugin(pointer, &diff);
        self.handle_direct(pointer, &diff);
        self.handle_load_and_store(pointer, &diff);
        self.handle_receiver_calls(pointer, &diff);
    }

    fn notify_plugin(&mut self, pointer: PointerId, diff: &PointsTo) {
        let mut env = PluginEnv {
            program: self.program,
            heap: &mut *self.heap,
            csm: &mut *self.csm,
            pending: &mut *self.pending_pts,
        };
        self.plugin.on_new_points_to_set(&mut env, pointer, diff);
        if !self.pending_pts.is_empty() {
            self.process_pending_pts();
        }
    }

    /// process all outgoing direct edges of the node.
    fn handle_direct(&mut self, pointer: PointerId, diff: &PointsTo) {
        let edges: Vec<PFGEdgeId> = self.pfg.direct_out_edges(pointer).collect();
        for edge in edges {
            self.propagate(edge, Some(diff));
        }
    }

    /// process all outgoing load edges and incoming store edges of the node.
    fn handle_load_and_store(&mut self, pointer: PointerId, diff: &PointsTo) {
        if !self.pfg.is_base(pointer) {
            return;
        }
        let deferred: Vec<PFGEdgeId> = self
            .pfg
            .load_out_edges(pointer)
            .chain(self.pfg.store_in_edges(pointer))
            .collect();
        for edge in deferred {
            for obj in diff.iter() {
                if let Some(new_edge) = materialize_deferred_edge(self.csm, self.pfg, edge, obj) {
                    self.propagate(new_edge, None);
                }
            }
        }
    }

    /// Queues the new receiver objects of the calls on `pointer`.
    fn handle_receiver_calls(&mut self, pointer: PointerId, diff: &PointsTo) {
        if let Some(callsites) = self.receiver_calls.get(&pointer) {
            for callsite in callsites {
                for obj in diff.iter() {
                    self.new_call_instances.push((*callsite, obj));
                }
            }
        }
    }

    /// Propagates objects along a direct edge: the given diff if any, or the
    /// whole points-to set of the source otherwise.
    fn propagate(&mut self, edge: PFGEdgeId, diff: Option<&PointsTo>) {
        let (src, dst) = match self.pfg.edge_endpoints(edge) {
            Some(endpoints) => endpoints,
            None => return,
        };
        let objs = match diff {
            Some(diff) => diff.clone(),
            None => self.csm.pt_data.get_pts(src),
        };
        if objs.is_empty() {
            return;
        }
        let kind = self.pfg.get_edge_kind(edge);
        let objs = filter_objs(self.program, self.heap, self.csm, kind, objs);
        if self.csm.pt_data.union_pts_to(dst, &objs) {
            self.worklist.push_back(dst);
        }
    }
}

/// Restricts `objs` to the objects allowed along an edge of `kind`.
pub(crate) fn filter_objs(
    program: &Program,
    heap: &HeapModel,
    csm: &CSManager,
    kind: PFGEdgeKind,
    objs: PointsTo,
) -> PointsTo {
    match kind.filter_type() {
        Some(ty) => objs
            .iter()
            .filter(|obj| {
                let obj_ty = heap.obj_type(program, csm.get_cs_obj(*obj).obj);
                program.is_subtype(obj_ty, ty)
            })
            .collect(),
        None => objs,
    }
}

/// Instantiates the deferred load or store `edge` for one object of its base.
///
/// A load `base -> x` becomes `o.f -> x` and a store `y -> base` becomes
/// `y -> o.f`. Returns the new direct edge, if it did not exist yet.
pub(crate) fn materialize_deferred_edge(
    csm: &mut CSManager,
    pfg: &mut PFG,
    edge: PFGEdgeId,
    obj: CSObjId,
) -> Option<PFGEdgeId> {
    let (src, dst) = pfg.edge_endpoints(edge)?;
    match pfg.get_edge_kind(edge) {
        PFGEdgeKind::Load(field) => {
            let field_ptr = csm.instance_field(obj, field);
            pfg.add_edge(field_ptr, dst, PFGEdgeKind::InstanceLoad)
        }
        PFGEdgeKind::Store(field) => {
            let field_ptr = csm.instance_field(obj, field);
            pfg.add_edge(src, field_ptr, PFGEdgeKind::InstanceStore)
        }
        PFGEdgeKind::LoadArray => {
            let elem_ptr = csm.array_index(obj);
            pfg.add_edge(elem_ptr, dst, PFGEdgeKind::ArrayLoad)
        }
        PFGEdgeKind::StoreArray => {
            let elem_ptr = csm.array_index(obj);
            pfg.add_edge(src, elem_ptr, PFGEdgeKind::ArrayStore)
        }
        kind => {
            warn!("Edge {:?} of kind {:?} is not a deferred load or store", edge, kind);
            None
        }
    }
}
