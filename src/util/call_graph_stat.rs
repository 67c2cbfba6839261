// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

use std::collections::{BTreeMap, HashSet};
use std::io::{Result, Write};

use crate::ir::{CallKind, MethodId};
use crate::pta::result::PTAResult;

/// Counts of call sites and call edges per call kind.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CallGraphStat {
    pub num_reach_funcs: usize,
    pub num_cs_reach_funcs: usize,
    pub num_call_graph_edges: usize,
    pub num_cs_call_graph_edges: usize,
    /// Resolved call sites and their edges, per call kind.
    pub calls_by_kind: BTreeMap<CallKind, (usize, usize)>,
    pub num_unresolved_calls: usize,
}

impl CallGraphStat {
    pub fn new(result: &PTAResult<'_>) -> Self {
        let ci_call_graph = result.ci_call_graph();
        let mut calls_by_kind: BTreeMap<CallKind, (usize, usize)> = BTreeMap::new();
        for (callsite, call_edges) in &ci_call_graph.callsite_to_edges {
            let kind = result.program().call_site(*callsite).kind;
            let entry = calls_by_kind.entry(kind).or_default();
            entry.0 += 1;
            entry.1 += call_edges.len();
        }
        let unresolved: HashSet<_> = result.unresolved_calls().iter().map(|(callsite, _)| *callsite).collect();
        CallGraphStat {
            num_reach_funcs: ci_call_graph.num_nodes(),
            num_cs_reach_funcs: result.call_graph().num_nodes(),
            num_call_graph_edges: ci_call_graph.num_edges(),
            num_cs_call_graph_edges: result.call_graph().num_edges(),
            calls_by_kind,
            num_unresolved_calls: unresolved.len(),
        }
    }

    /// Calls with a single possible target.
    pub fn num_statically_resolved_calls(&self) -> usize {
        self.count(&[CallKind::Static, CallKind::Special]).0
    }

    /// Calls dispatched on the receiver object, and their call edges.
    pub fn num_dynamically_resolved_calls(&self) -> (usize, usize) {
        self.count(&[CallKind::Virtual, CallKind::Interface])
    }

    fn count(&self, kinds: &[CallKind]) -> (usize, usize) {
        kinds
            .iter()
            .filter_map(|kind| self.calls_by_kind.get(kind))
            .fold((0, 0), |acc, (calls, edges)| (acc.0 + calls, acc.1 + edges))
    }
}

pub fn call_graph_stat<W: Write + ?Sized>(result: &PTAResult<'_>, stat_writer: &mut W) -> Result<()> {
    let stat = CallGraphStat::new(result);
    let avg_contexts = if stat.num_reach_funcs == 0 {
        0.0
    } else {
        stat.num_cs_reach_funcs as f64 / stat.num_reach_funcs as f64
    };

    writeln!(stat_writer, "Call Graph Statistics: ")?;
    writeln!(stat_writer, "#Reachable methods: {}", stat.num_reach_funcs)?;
    writeln!(stat_writer, "#Reachable CS methods: {}", stat.num_cs_reach_funcs)?;
    writeln!(stat_writer, "#Avg contexts per method: {:.2}", avg_contexts)?;
    writeln!(stat_writer, "#Call graph edges: {}", stat.num_call_graph_edges)?;
    writeln!(stat_writer, "#CS call graph edges: {}", stat.num_cs_call_graph_edges)?;
    writeln!(stat_writer, "#Statically resolved calls: {}", stat.num_statically_resolved_calls())?;
    let (num_dyn_calls, num_dyn_edges) = stat.num_dynamically_resolved_calls();
    writeln!(
        stat_writer,
        "#Dynamically resolved calls: {}, #call graph edges: {}",
        num_dyn_calls, num_dyn_edges
    )?;
    for (kind, (calls, edges)) in &stat.calls_by_kind {
        writeln!(stat_writer, "\t#{} calls: {}, #call graph edges: {}", kind, calls, edges)?;
    }
    writeln!(stat_writer, "#Unresolved calls: {}", stat.num_unresolved_calls)?;
    Ok(())
}

/// Methods with the most contexts, most first.
pub fn top_context_methods(result: &PTAResult<'_>, limit: usize) -> Vec<(MethodId, usize)> {
    let mut counts: BTreeMap<MethodId, usize> = BTreeMap::new();
    for cs_method in result.reachable_cs_methods() {
        *counts.entry(result.csm().get_cs_method(cs_method).method).or_default() += 1;
    }
    let mut counts: Vec<_> = counts.into_iter().collect();
    counts.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    counts.truncate(limit);
    counts
}
