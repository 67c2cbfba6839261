// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! Lifecycle hooks for analysis extensions.
//!
//! A plugin observes the solver and may contribute points-to facts through
//! [`PluginEnv::add_points_to`]. Facts are queued and propagated like any
//! other, so plugins cannot break monotonicity.

use std::time::Instant;

use log::*;

use super::result::PTAResult;
use crate::cs::{CSManager, CSMethodId, CSObjId, ContextId, Pointer, PointerId, PointsTo};
use crate::heap::{HeapModel, ObjId};
use crate::ir::{MethodId, Program, TypeId, VarId};

/// The view of the solver state handed to plugins.
pub struct PluginEnv<'a> {
    pub(crate) program: &'a Program,
    pub(crate) heap: &'a mut HeapModel,
    pub(crate) csm: &'a mut CSManager,
    pub(crate) pending: &'a mut Vec<(PointerId, CSObjId)>,
}

impl<'a> PluginEnv<'a> {
    #[inline]
    pub fn program(&self) -> &Program {
        self.program
    }

    #[inline]
    pub fn heap(&self) -> &HeapModel {
        self.heap
    }

    /// Adds `obj` to the points-to set of `pointer`.
    pub fn add_points_to(&mut self, pointer: PointerId, obj: CSObjId) {
        self.pending.push((pointer, obj));
    }

    /// Adds `obj` to the points-to set of `var` under context `cid`.
    pub fn add_var_points_to(&mut self, cid: ContextId, var: VarId, obj: CSObjId) {
        let pointer = self.csm.cs_var_pointer(cid, var);
        self.add_points_to(pointer, obj);
    }

    /// Returns the mock object described by `description`.
    pub fn mock_obj(&mut self, description: &str, ty: TypeId) -> ObjId {
        self.heap.mock_obj(description, ty)
    }

    pub fn cs_obj(&mut self, heap_cid: ContextId, obj: ObjId) -> CSObjId {
        self.csm.cs_obj(heap_cid, obj)
    }

    pub fn get_pointer(&self, pointer: PointerId) -> Pointer {
        self.csm.get_pointer(pointer)
    }

    /// The points-to set of `pointer` at this point of the analysis.
    pub fn points_to(&self, pointer: PointerId) -> PointsTo {
        self.csm.points_to(pointer)
    }

    #[inline]
    pub fn csm(&self) -> &CSManager {
        self.csm
    }
}

/// Callbacks fired by the solver. All of them default to doing nothing.
pub trait Plugin {
    /// Called once before the solver is created.
    fn on_preprocess(&mut self, _program: &Program) {}

    /// Called once before any method is processed.
    fn on_start(&mut self, _env: &mut PluginEnv<'_>) {}

    /// Called when `pointer` gains the objects in `diff`.
    fn on_new_points_to_set(&mut self, _env: &mut PluginEnv<'_>, _pointer: PointerId, _diff: &PointsTo) {}

    /// Called the first time a method becomes reachable in any context.
    fn on_new_method(&mut self, _env: &mut PluginEnv<'_>, _method: MethodId) {}

    /// Called when a method becomes reachable in a new context.
    fn on_new_cs_method(&mut self, _env: &mut PluginEnv<'_>, _cs_method: CSMethodId) {}

    /// Called once with the closed result.
    fn on_finish(&mut self, _result: &PTAResult<'_>) {}
}

/// Fans every callback out to its plugins, in insertion order.
#[derive(Default)]
pub struct CompositePlugin {
    plugins: Vec<Box<dyn Plugin>>,
}

impl CompositePlugin {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_plugin(&mut self, plugin: Box<dyn Plugin>) {
        self.plugins.push(plugin);
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}

impl Plugin for CompositePlugin {
    fn on_preprocess(&mut self, program: &Program) {
        for plugin in &mut self.plugins {
            plugin.on_preprocess(program);
        }
    }

    fn on_start(&mut self, env: &mut PluginEnv<'_>) {
        for plugin in &mut self.plugins {
            plugin.on_start(env);
        }
    }

    fn on_new_points_to_set(&mut self, env: &mut PluginEnv<'_>, pointer: PointerId, diff: &PointsTo) {
        for plugin in &mut self.plugins {
            plugin.on_new_points_to_set(env, pointer, diff);
        }
    }

    fn on_new_method(&mut self, env: &mut PluginEnv<'_>, method: MethodId) {
        for plugin in &mut self.plugins {
            plugin.on_new_method(env, method);
        }
    }

    fn on_new_cs_method(&mut self, env: &mut PluginEnv<'_>, cs_method: CSMethodId) {
        for plugin in &mut self.plugins {
            plugin.on_new_cs_method(env, cs_method);
        }
    }

    fn on_finish(&mut self, result: &PTAResult<'_>) {
        for plugin in &mut self.plugins {
            plugin.on_finish(result);
        }
    }
}

/// Logs the time spent between `on_start` and `on_finish`.
#[derive(Debug, Default)]
pub struct AnalysisTimer {
    start: Option<Instant>,
}

impl AnalysisTimer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Plugin for AnalysisTimer {
    fn on_start(&mut self, _env: &mut PluginEnv<'_>) {
        self.start = Some(Instant::now());
    }

    fn on_finish(&mut self, result: &PTAResult<'_>) {
        if let Some(start) = self.start.take() {
            info!(
                "{} pointer analysis finished in {}",
                result.context_sensitivity(),
                humantime::format_duration(start.elapsed())
            );
        }
    }
}
