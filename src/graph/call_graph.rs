// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

use petgraph::dot::{Config, Dot};
use petgraph::graph::{DefaultIx, EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Graph;
use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::fmt::Debug;
use std::hash::Hash;

use crate::cs::{CSCallSiteId, CSMethodId};
use crate::ir::{CallKind, CallSiteId, MethodId};
use crate::util::chunked_queue::{ChunkedQueue, Cursor};

/// Unique identifiers for call graph nodes.
pub type CGNodeId = NodeIndex<DefaultIx>;
/// Unique identifiers for call graph edges.
pub type CGEdgeId = EdgeIndex<DefaultIx>;
/// Context-sensitive call graph.
pub type CSCallGraph = CallGraph<CSMethodId, CSCallSiteId>;
/// Context-insensitive projection of the call graph.
pub type CICallGraph = CallGraph<MethodId, CallSiteId>;

pub trait CGFunction: Copy + Clone + PartialEq + Eq + Hash + Debug {}

impl CGFunction for MethodId {}
impl CGFunction for CSMethodId {}

pub trait CGCallSite: Copy + Clone + PartialEq + Eq + Hash + Debug {}

impl CGCallSite for CallSiteId {}
impl CGCallSite for CSCallSiteId {}

#[derive(Debug)]
pub struct CallGraphNode<F: CGFunction> {
    pub(crate) func: F,
}

impl<F: CGFunction> CallGraphNode<F> {
    pub fn new(func: F) -> Self {
        CallGraphNode { func }
    }
}

#[derive(Debug)]
pub struct CallGraphEdge<S: CGCallSite> {
    pub(crate) callsite: S,
    pub(crate) kind: CallKind,
}

impl<S: CGCallSite> CallGraphEdge<S> {
    pub fn new(callsite: S, kind: CallKind) -> Self {
        CallGraphEdge { callsite, kind }
    }
}

pub struct CallGraph<F: CGFunction, S: CGCallSite> {
    /// The graph structure capturing call relationships.
    pub graph: Graph<CallGraphNode<F>, CallGraphEdge<S>>,
    /// A map from functions to their corresponding call graph nodes.
    pub func_nodes: HashMap<F, CGNodeId>,
    /// A map from call sites to call graph edges.
    pub callsite_to_edges: HashMap<S, HashSet<CGEdgeId>>,
    /// A queue of reachable nodes, in the order they were discovered.
    pub(crate) reach_funcs: ChunkedQueue<F>,
}

impl<F: CGFunction, S: CGCallSite> Default for CallGraph<F, S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: CGFunction, S: CGCallSite> CallGraph<F, S> {
    pub fn new() -> Self {
        CallGraph {
            graph: Graph::<CallGraphNode<F>, CallGraphEdge<S>>::new(),
            func_nodes: HashMap::new(),
            callsite_to_edges: HashMap::new(),
            reach_funcs: ChunkedQueue::new(),
        }
    }

    /// Add a new node to the call graph.
    /// Returns true if the function was not reachable before.
    pub fn add_node(&mut self, func: F) -> bool {
        if let Entry::Vacant(e) = self.func_nodes.entry(func) {
            let node_id = self.graph.add_node(CallGraphNode::new(func));
            e.insert(node_id);
            self.reach_funcs.push(func);
            true
        } else {
            false
        }
    }

    /// Helper function to get a node or insert a new
    /// node if it does not exist in the map.
    fn get_or_insert_node(&mut self, func: F) -> CGNodeId {
        match self.func_nodes.entry(func) {
            Entry::Occupied(o) => o.get().to_owned(),
            Entry::Vacant(v) => {
                self.reach_funcs.push(func);
                let node_id = self.graph.add_node(CallGraphNode::new(func));
                *v.insert(node_id)
            }
        }
    }

    #[inline]
    pub fn contains_node(&self, func: F) -> bool {
        self.func_nodes.contains_key(&func)
    }

    /// Returns all functions called from the callsite.
    pub fn get_callees(&self, callsite: &S) -> HashSet<F> {
        if let Some(edges) = self.callsite_to_edges.get(callsite) {
            edges
                .iter()
                .filter_map(|edge_id| self.graph.edge_endpoints(*edge_id))
                .map(|(_, target)| self.graph[target].func)
                .collect::<HashSet<F>>()
        } else {
            HashSet::new()
        }
    }

    /// Returns true if an edge to the callee already existed for the callsite.
    pub fn has_edge(&self, callsite: &S, callee_id: F) -> bool {
        match (self.callsite_to_edges.get(callsite), self.func_nodes.get(&callee_id)) {
            (Some(edges), Some(callee_node)) => edges.iter().any(|edge_id| {
                matches!(self.graph.edge_endpoints(*edge_id), Some((_, target)) if target == *callee_node)
            }),
            _ => false,
        }
    }

    /// Adds a new edge to the call graph.
    /// The edge is a call from `caller_id` to `callee_id` at `callsite`.
    /// Returns false if the edge already existed, and true otherwise.
    pub fn add_edge(&mut self, callsite: S, caller_id: F, callee_id: F, kind: CallKind) -> bool {
        if self.has_edge(&callsite, callee_id) {
            return false;
        }
        let caller_node = self.get_or_insert_node(caller_id);
        let callee_node = self.get_or_insert_node(callee_id);
        let edge_id = self
            .graph
            .add_edge(caller_node, callee_node, CallGraphEdge::new(callsite, kind));
        self.callsite_to_edges.entry(callsite).or_default().insert(edge_id);
        true
    }

    /// A cursor at the front of the reachable functions queue.
    pub fn reach_funcs_cursor(&self) -> Cursor {
        self.reach_funcs.cursor()
    }

    /// Returns the next reachable function after `cursor`, if any.
    pub fn next_reach_func(&self, cursor: &mut Cursor) -> Option<F> {
        self.reach_funcs.next_from(cursor)
    }

    /// All reachable functions, in discovery order.
    pub fn reach_funcs(&self) -> impl Iterator<Item = F> + '_ {
        self.reach_funcs.iter().copied()
    }

    /// All edges as `(callsite, caller, callee, kind)`.
    pub fn edges(&self) -> impl Iterator<Item = (S, F, F, CallKind)> + '_ {
        self.graph.edge_references().map(move |edge| {
            (
                edge.weight().callsite,
                self.graph[edge.source()].func,
                self.graph[edge.target()].func,
                edge.weight().kind,
            )
        })
    }

    #[inline]
    pub fn num_nodes(&self) -> usize {
        self.graph.node_count()
    }

    #[inline]
    pub fn num_edges(&self) -> usize {
        self.graph.edge_count()
    }

    /// Produce a dot representation of the call graph for displaying with
    /// Graphviz. Edges are labelled by their call kind.
    pub fn to_dot(&self, node_label: impl Fn(F) -> String) -> String {
        let edge_attrs = |_: &_, edge: petgraph::graph::EdgeReference<'_, CallGraphEdge<S>>| {
            format!("label = \"{}\"", edge.weight().kind)
        };
        let node_attrs = |_: &_, (_, node): (CGNodeId, &CallGraphNode<F>)| {
            format!("label = \"{}\"", escape_label(&node_label(node.func)))
        };
        format!(
            "{:?}",
            Dot::with_attr_getters(
                &self.graph,
                &[Config::NodeNoLabel, Config::EdgeNoLabel],
                &edge_attrs,
                &node_attrs,
            )
        )
    }
}

fn escape_label(label: &str) -> String {
    label.replace('\\', "\\\\").replace('"', "\\\"")
}
