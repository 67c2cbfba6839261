// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt::{Debug, Formatter};
use std::rc::Rc;
use std::time::Instant;

use log::*;

use super::context_strategy::{ContextStrategy, ReceiverInfo};
use super::plugin::{Plugin, PluginEnv};
use super::propagator::propagator::{materialize_deferred_edge, Propagator};
use super::result::PTAResult;
use super::ContextSensitivity;
use crate::builder::call_graph_builder;
use crate::builder::method_pfg_builder::build_method_pfg;
use crate::builder::special_function_handler::{self, NativeModel};
use crate::cs::{CSCallSiteId, CSManager, CSMethodId, CSObjId, ContextId, PointerId};
use crate::error::Result;
use crate::graph::call_graph::{CICallGraph, CSCallGraph};
use crate::graph::method_pfg::MethodPFG;
use crate::graph::pfg::{PFGEdgeId, PFGEdgeKind, PFG};
use crate::heap::HeapModel;
use crate::ir::{CallKind, CallSiteId, MethodId, Program, TypeId};
use crate::pts_set::points_to::PointsToSet;
use crate::util::bit_vec::Idx;
use crate::util::chunked_queue::Cursor;
use crate::util::options::AnalysisOptions;

/// The on-the-fly, inclusion-based pointer analysis, parameterized by the
/// context selection strategy. With [`super::context_strategy::ContextInsensitive`]
/// it is a plain Andersen analysis.
pub struct ContextSensitivePTA<'p, 'a, S: ContextStrategy> {
    pub(crate) program: &'p Program,
    pub(crate) context_sensitivity: ContextSensitivity,
    pub(crate) heap: HeapModel,
    /// Context-sensitive elements and their points-to data.
    pub(crate) csm: CSManager,
    /// Pointer Flow Graph
    pub(crate) pfg: PFG,
    /// Call graph
    pub call_graph: CSCallGraph,
    /// Context-insensitive projection of the call graph.
    pub ci_call_graph: CICallGraph,

    entries: Vec<MethodId>,
    /// Templates of the methods reached so far.
    method_pfgs: HashMap<MethodId, Rc<MethodPFG>>,
    /// Records the methods that have been processed
    processed_methods: HashSet<CSMethodId>,
    /// Cursor over the reachable methods of the call graph.
    rf_cursor: Cursor,

    /// Instance calls keyed by their receiver pointer.
    receiver_calls: HashMap<PointerId, Vec<CSCallSiteId>>,
    initialized_classes: HashSet<TypeId>,
    /// Calls that could not be resolved, with the receiver type tried.
    unresolved_calls: BTreeSet<(CallSiteId, Option<TypeId>)>,

    pending_pts: Vec<(PointerId, CSObjId)>,
    new_direct_edges: Vec<PFGEdgeId>,
    new_call_instances: Vec<(CSCallSiteId, CSObjId)>,

    plugin: &'a mut dyn Plugin,
    ctx_strategy: S,
}

impl<'p, 'a, S: ContextStrategy> Debug for ContextSensitivePTA<'p, 'a, S> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        "ContextSensitivePTA".fmt(f)
    }
}

/// Constructor
impl<'p, 'a, S: ContextStrategy> ContextSensitivePTA<'p, 'a, S> {
    pub fn new(
        program: &'p Program,
        options: &AnalysisOptions,
        entries: Vec<MethodId>,
        ctx_strategy: S,
        plugin: &'a mut dyn Plugin,
    ) -> Result<Self> {
        let heap = HeapModel::new(program, options)?;
        let call_graph = CSCallGraph::new();
        let rf_cursor = call_graph.reach_funcs_cursor();
        Ok(ContextSensitivePTA {
            program,
            context_sensitivity: options.context_sensitivity,
            heap,
            csm: CSManager::new(),
            pfg: PFG::new(),
            call_graph,
            ci_call_graph: CICallGraph::new(),
            entries,
            method_pfgs: HashMap::new(),
            processed_methods: HashSet::new(),
            rf_cursor,
            receiver_calls: HashMap::new(),
            initialized_classes: HashSet::new(),
            unresolved_calls: BTreeSet::new(),
            pending_pts: Vec::new(),
            new_direct_edges: Vec::new(),
            new_call_instances: Vec::new(),
            plugin,
            ctx_strategy,
        })
    }

    #[inline]
    pub fn get_empty_context_id(&self) -> ContextId {
        self.ctx_strategy.get_empty_context_id()
    }

    fn plugin_env(&mut self) -> (PluginEnv<'_>, &mut dyn Plugin) {
        (
            PluginEnv {
                program: self.program,
                heap: &mut self.heap,
                csm: &mut self.csm,
                pending: &mut self.pending_pts,
            },
            &mut *self.plugin,
        )
    }

    /// Initialize the analysis.
    pub fn initialize(&mut self) {
        let (mut env, plugin) = self.plugin_env();
        plugin.on_start(&mut env);

        let empty_cid = self.get_empty_context_id();
        for entry in self.entries.clone() {
            info!("Entry method: {}", self.program.method_signature(entry));
            self.initialize_class(self.program.method(entry).declaring_class);
            let cs_entry = self.csm.cs_method(empty_cid, entry);
            self.call_graph.add_node(cs_entry);
            self.ci_call_graph.add_node(entry);
        }

        self.process_reach_funcs();
    }

    /// Solve the worklist problem using Propagator.
    pub fn propagate(&mut self) {
        // Solve until no new call relationship is found.
        loop {
            let mut propagator = Propagator::new(
                self.program,
                &mut self.heap,
                &mut self.csm,
                &mut self.pfg,
                &self.receiver_calls,
                &mut self.new_call_instances,
                &mut self.pending_pts,
                &mut self.new_direct_edges,
                &mut *self.plugin,
            );
            propagator.solve_worklist();

            if self.new_call_instances.is_empty() {
                break;
            }
            self.process_new_call_instances();
            self.process_reach_funcs();
        }
    }

    /// Runs the analysis to its fixpoint.
    pub fn analyze(&mut self) {
        let now = Instant::now();

        // Initialization for the analysis.
        self.initialize();

        // Solve the worklist problem.
        self.propagate();

        let elapsed = now.elapsed();
        info!("{} PTA completed.", self.context_sensitivity);
        info!("Analysis time: {}", humantime::format_duration(elapsed));
    }

    /// Process statements in reachable methods.
    fn process_reach_funcs(&mut self) {
        while let Some(cs_method) = self.call_graph.next_reach_func(&mut self.rf_cursor) {
            if self.processed_methods.insert(cs_method) {
                self.process_cs_method(cs_method);
            }
        }
    }

    /// Instantiates the template of a method under the context of `cs_method`.
    fn process_cs_method(&mut self, cs_method: CSMethodId) {
        let method_cid = self.csm.get_cs_method(cs_method);
        let (cid, method) = (method_cid.cid, method_cid.method);
        debug!(
            "Processing method {:?} {}, context: {:?}",
            method,
            self.program.method_signature(method),
            self.ctx_strategy.get_context_by_id(cid),
        );

        let mpfg = match self.method_pfgs.get(&method) {
            Some(mpfg) => mpfg.clone(),
            None => {
                let mpfg = Rc::new(build_method_pfg(self.program, method));
                self.method_pfgs.insert(method, mpfg.clone());
                let (mut env, plugin) = self.plugin_env();
                plugin.on_new_method(&mut env, method);
                mpfg
            }
        };
        let (mut env, plugin) = self.plugin_env();
        plugin.on_new_cs_method(&mut env, cs_method);

        for class in &mpfg.initialized_classes {
            self.initialize_class(*class);
        }
        self.add_mpfg_edges(cid, &mpfg);
        self.process_calls_in_mpfg(cs_method, cid, &mpfg);
    }

    /// Adds the flow constraints of a method template to the whole program's PFG.
    fn add_mpfg_edges(&mut self, cid: ContextId, mpfg: &MethodPFG) {
        if !mpfg.allocs.is_empty() {
            let heap_cid = self.ctx_strategy.new_heap_context(cid);
            for (var, site) in &mpfg.allocs {
                let obj = self.heap.get_obj(self.program, *site);
                let cs_obj = self.csm.cs_obj(heap_cid, obj);
                let pointer = self.csm.cs_var_pointer(cid, *var);
                self.pending_pts.push((pointer, cs_obj));
            }
        }

        for (src, dst, kind) in mpfg.internal_edges_iter() {
            let cs_src = self.csm.cs_var_pointer(cid, *src);
            let cs_dst = self.csm.cs_var_pointer(cid, *dst);
            self.add_edge(cs_src, cs_dst, *kind);
        }

        for (field, var) in &mpfg.static_loads {
            let src = self.csm.static_field(*field);
            let dst = self.csm.cs_var_pointer(cid, *var);
            self.add_edge(src, dst, PFGEdgeKind::StaticLoad);
        }
        for (var, field) in &mpfg.static_stores {
            let src = self.csm.cs_var_pointer(cid, *var);
            let dst = self.csm.static_field(*field);
            self.add_edge(src, dst, PFGEdgeKind::StaticStore);
        }
    }

    fn process_calls_in_mpfg(&mut self, cs_method: CSMethodId, cid: ContextId, mpfg: &MethodPFG) {
        // For static callsites, the call target can be resolved directly.
        for callsite in &mpfg.static_callsites {
            let cs_callsite = self.csm.cs_call_site(cid, *callsite);
            self.process_static_call(cs_method, cs_callsite);
        }

        // Instance calls are resolved when objects reach their receivers.
        for (receiver, callsite) in &mpfg.instance_callsites {
            let receiver_ptr = self.csm.cs_var_pointer(cid, *receiver);
            let cs_callsite = self.csm.cs_call_site(cid, *callsite);
            self.receiver_calls.entry(receiver_ptr).or_default().push(cs_callsite);
            for obj in self.csm.points_to(receiver_ptr).iter() {
                self.new_call_instances.push((cs_callsite, obj));
            }
        }
    }

    /// Adds a PFG edge. A new direct edge is queued so that the whole points-to
    /// set of its source flows across it, and a new deferred edge is
    /// materialized for the objects its base already points to.
    fn add_edge(&mut self, src: PointerId, dst: PointerId, kind: PFGEdgeKind) {
        let edge = match self.pfg.add_edge(src, dst, kind) {
            Some(edge) => edge,
            None => return,
        };
        if kind.is_direct() {
            self.new_direct_edges.push(edge);
            return;
        }
        let base = match kind {
            PFGEdgeKind::Load(_) | PFGEdgeKind::LoadArray => src,
            _ => dst,
        };
        for obj in self.csm.points_to(base).iter() {
            if let Some(new_edge) = materialize_deferred_edge(&mut self.csm, &mut self.pfg, edge, obj) {
                self.new_direct_edges.push(new_edge);
            }
        }
    }

    fn process_static_call(&mut self, caller: CSMethodId, cs_callsite: CSCallSiteId) {
        let callsite = self.csm.get_cs_call_site(cs_callsite);
        let call_site = self.program.call_site(callsite.call_site);
        let callee = match call_graph_builder::resolve_static_call(self.program, call_site) {
            Some(callee) => callee,
            None => {
                self.record_unresolved(callsite.call_site, None);
                return;
            }
        };
        self.initialize_class(self.program.method(callee).declaring_class);
        let callee_cid = self
            .ctx_strategy
            .new_static_call_context(callsite.cid, callsite.call_site);
        let cs_callee = self.csm.cs_method(callee_cid, callee);
        self.add_call_edge(caller, cs_callsite, cs_callee, CallKind::Static);
    }

    /// Dispatches the receiver objects that reached instance calls.
    fn process_new_call_instances(&mut self) {
        for (cs_callsite, receiver) in std::mem::take(&mut self.new_call_instances) {
            self.process_new_call_instance(cs_callsite, receiver);
        }
    }

    fn process_new_call_instance(&mut self, cs_callsite: CSCallSiteId, receiver: CSObjId) {
        let callsite = self.csm.get_cs_call_site(cs_callsite);
        let call_site = self.program.call_site(callsite.call_site);
        let recv_obj = self.csm.get_cs_obj(receiver);
        let recv_ty = self.heap.obj_type(self.program, recv_obj.obj);

        let callee = match call_graph_builder::resolve_callee(self.program, call_site, Some(recv_ty)) {
            Some(callee) => callee,
            None => {
                self.record_unresolved(callsite.call_site, Some(recv_ty));
                return;
            }
        };
        let receiver_info = ReceiverInfo {
            heap_context: recv_obj.cid,
            obj: recv_obj.obj,
            ty: recv_ty,
        };
        let callee_cid =
            self.ctx_strategy
                .new_instance_call_context(callsite.cid, callsite.call_site, &receiver_info);
        let cs_callee = self.csm.cs_method(callee_cid, callee);
        let caller = self.csm.cs_method(callsite.cid, call_site.container);
        self.add_call_edge(caller, cs_callsite, cs_callee, call_site.kind);

        // Bind the receiver object to `this` of the callee in its context.
        if let Some(this) = self.program.method(callee).this_var {
            let this_ptr = self.csm.cs_var_pointer(callee_cid, this);
            self.pending_pts.push((this_ptr, receiver));
        }
    }

    fn record_unresolved(&mut self, call_site: CallSiteId, receiver_ty: Option<TypeId>) {
        if self.unresolved_calls.insert((call_site, receiver_ty)) {
            debug!(
                "Unresolved call {} on receiver type {}",
                self.program.call_site_display(call_site),
                receiver_ty.map_or("<none>", |ty| self.program.type_name(ty)),
            );
        }
    }

    fn add_call_edge(&mut self, caller: CSMethodId, cs_callsite: CSCallSiteId, callee: CSMethodId, kind: CallKind) {
        if !self.call_graph.add_edge(cs_callsite, caller, callee, kind) {
            return;
        }
        let callsite = self.csm.get_cs_call_site(cs_callsite);
        let callee_cid = self.csm.get_cs_method(callee);
        let (call_site_id, callee_id) = (callsite.call_site, callee_cid.method);
        let call_site = self.program.call_site(call_site_id);
        self.ci_call_graph
            .add_edge(call_site_id, call_site.container, callee_id, kind);

        if let Some(model) = special_function_handler::native_model(self.program, callee_id) {
            self.apply_native_model(cs_callsite, model);
            return;
        }

        let callee_method = self.program.method(callee_id);
        for (arg, param) in call_site.args.iter().zip(callee_method.params.iter()) {
            let src = self.csm.cs_var_pointer(callsite.cid, *arg);
            let dst = self.csm.cs_var_pointer(callee_cid.cid, *param);
            self.add_edge(src, dst, PFGEdgeKind::ParameterPassing);
        }
        if let Some(result) = call_site.result {
            let dst = self.csm.cs_var_pointer(callsite.cid, result);
            for ret in &callee_method.return_vars {
                let src = self.csm.cs_var_pointer(callee_cid.cid, *ret);
                self.add_edge(src, dst, PFGEdgeKind::Return);
            }
        }
    }

    /// Adds the flow of a modelled native method at one call.
    fn apply_native_model(&mut self, cs_callsite: CSCallSiteId, model: NativeModel) {
        let callsite = self.csm.get_cs_call_site(cs_callsite);
        let call_site = self.program.call_site(callsite.call_site);
        match model {
            NativeModel::ArrayCopy { src, dest } => {
                let (src, dest) = match (call_site.args.get(src), call_site.args.get(dest)) {
                    (Some(src), Some(dest)) => (*src, *dest),
                    _ => {
                        warn!(
                            "Malformed arraycopy call: {}",
                            self.program.call_site_display(callsite.call_site)
                        );
                        return;
                    }
                };
                let temp = self.csm.native_temp(cs_callsite);
                let src_ptr = self.csm.cs_var_pointer(callsite.cid, src);
                let dest_ptr = self.csm.cs_var_pointer(callsite.cid, dest);
                self.add_edge(src_ptr, temp, PFGEdgeKind::LoadArray);
                self.add_edge(temp, dest_ptr, PFGEdgeKind::StoreArray);
            }
        }
    }

    /// Makes the static initializer of `class` and of its superclasses
    /// reachable. Each class is initialized once.
    fn initialize_class(&mut self, class: TypeId) {
        if !self.initialized_classes.insert(class) {
            return;
        }
        if let Some(super_class) = self.program.class(class).super_class {
            self.initialize_class(super_class);
        }
        if let Some(clinit) = self.program.clinit_of(class) {
            debug!("Initializing class {}", self.program.type_name(class));
            let empty_cid = self.get_empty_context_id();
            let cs_clinit = self.csm.cs_method(empty_cid, clinit);
            self.call_graph.add_node(cs_clinit);
            self.ci_call_graph.add_node(clinit);
        }
    }

    /// Finalizes the analysis into its result, notifying the plugin.
    pub fn finalize(self) -> PTAResult<'p> {
        let contexts = (0..self.ctx_strategy.num_contexts())
            .map(|i| {
                self.ctx_strategy
                    .context_elements(ContextId::new(i), self.program, &self.heap)
            })
            .collect();
        let result = PTAResult {
            program: self.program,
            context_sensitivity: self.context_sensitivity,
            heap: self.heap,
            csm: self.csm,
            pfg: self.pfg,
            call_graph: self.call_graph,
            ci_call_graph: self.ci_call_graph,
            receiver_calls: self.receiver_calls,
            unresolved_calls: self.unresolved_calls,
            contexts,
        };
        self.plugin.on_finish(&result);
        result
    }
}
