// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

use petgraph::graph::{DefaultIx, EdgeIndex, NodeIndex};
use petgraph::Graph;
use std::collections::hash_map::Entry;
use std::collections::{BTreeSet, HashMap};

use crate::cs::PointerId;
use crate::ir::{FieldId, TypeId};

// Unique identifiers for graph node and edges.
pub type PFGNodeId = NodeIndex<DefaultIx>;
pub type PFGEdgeId = EdgeIndex<DefaultIx>;

#[derive(Debug)]
pub struct PFGNode {
    pointer: PointerId,
}

impl PFGNode {
    /// Returns the pointer of the node.
    #[inline]
    pub fn pointer(&self) -> PointerId {
        self.pointer
    }
}

#[derive(Debug)]
pub struct PFGEdge {
    pub kind: PFGEdgeKind,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum PFGEdgeKind {
    /// `x = y`
    Assign,
    /// `x = (T) y`. Only objects whose type is a subtype of `T` flow along it.
    Cast(TypeId),
    /// A materialized load, from the field pointer `o.f` to the loaded variable.
    InstanceLoad,
    /// A materialized store, from the stored variable to the field pointer `o.f`.
    InstanceStore,
    ArrayLoad,
    ArrayStore,
    StaticLoad,
    StaticStore,
    /// From an argument to a parameter of the callee.
    ParameterPassing,
    /// From a return variable of the callee to the call result.
    Return,

    /// Deferred load `x = base.f`, from `base` to `x`.
    Load(FieldId),
    /// Deferred store `base.f = y`, from `y` to `base`.
    Store(FieldId),
    /// Deferred array load `x = base[*]`, from `base` to `x`.
    LoadArray,
    /// Deferred array store `base[*] = y`, from `y` to `base`.
    StoreArray,
}

impl PFGEdgeKind {
    /// Returns true if objects flow along edges of this kind unconditionally,
    /// and false for load/store constraints that are waiting for base objects.
    pub fn is_direct(&self) -> bool {
        !matches!(
            self,
            PFGEdgeKind::Load(_) | PFGEdgeKind::Store(_) | PFGEdgeKind::LoadArray | PFGEdgeKind::StoreArray
        )
    }

    /// The type that filters objects flowing along the edge, if any.
    pub fn filter_type(&self) -> Option<TypeId> {
        match self {
            PFGEdgeKind::Cast(ty) => Some(*ty),
            _ => None,
        }
    }
}

type EdgeMap = HashMap<PointerId, BTreeSet<PFGEdgeId>>;

/// The pointer flow graph of the whole program.
///
/// Direct edges are kept in `direct_out_edges`. Load edges are indexed by their
/// base pointer (the source), store edges by their base pointer (the target),
/// so that growing the points-to set of a base finds all its pending constraints.
#[derive(Default)]
pub struct PFG {
    /// The graph structure capturing flow relations between pointers.
    pub(crate) graph: Graph<PFGNode, PFGEdge>,
    /// A map from pointers to node ids.
    pub(crate) values: HashMap<PointerId, PFGNodeId>,

    pub(crate) direct_in_edges: EdgeMap,
    pub(crate) direct_out_edges: EdgeMap,
    pub(crate) load_out_edges: EdgeMap,
    pub(crate) store_in_edges: EdgeMap,
}

impl PFG {
    /// Constructor
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a reference to the underlying graph.
    #[inline]
    pub fn graph(&self) -> &Graph<PFGNode, PFGEdge> {
        &self.graph
    }

    /// Helper function to get a node or insert a new
    /// node if it does not exist in the map.
    pub fn get_or_insert_node(&mut self, pointer: PointerId) -> PFGNodeId {
        match self.values.entry(pointer) {
            Entry::Occupied(o) => o.get().to_owned(),
            Entry::Vacant(v) => {
                let node_id = self.graph.add_node(PFGNode { pointer });
                *v.insert(node_id)
            }
        }
    }

    #[inline]
    pub fn get_edge_kind(&self, edge_id: PFGEdgeId) -> PFGEdgeKind {
        self.graph[edge_id].kind
    }

    /// Returns the source and target pointers of the edge.
    pub fn edge_endpoints(&self, edge_id: PFGEdgeId) -> Option<(PointerId, PointerId)> {
        let (src, dst) = self.graph.edge_endpoints(edge_id)?;
        Some((self.graph[src].pointer, self.graph[dst].pointer))
    }

    /// Returns true if the edge from `src` to `dst` of the `kind` exists.
    pub fn has_edge(&self, src: PointerId, dst: PointerId, kind: PFGEdgeKind) -> bool {
        match (self.values.get(&src), self.values.get(&dst)) {
            (Some(src_id), Some(dst_id)) => self
                .graph
                .edges_connecting(*src_id, *dst_id)
                .any(|edge| edge.weight().kind == kind),
            _ => false,
        }
    }

    /// Adds an edge from `src` to `dst`.
    /// Returns the edge id if this edge is newly added to the graph.
    pub fn add_edge(&mut self, src: PointerId, dst: PointerId, kind: PFGEdgeKind) -> Option<PFGEdgeId> {
        if self.has_edge(src, dst, kind) {
            return None;
        }
        let src_id = self.get_or_insert_node(src);
        let dst_id = self.get_or_insert_node(dst);
        let edge_id = self.graph.add_edge(src_id, dst_id, PFGEdge { kind });
        match kind {
            PFGEdgeKind::Load(_) | PFGEdgeKind::LoadArray => {
                self.load_out_edges.entry(src).or_default().insert(edge_id);
            }
            PFGEdgeKind::Store(_) | PFGEdgeKind::StoreArray => {
                self.store_in_edges.entry(dst).or_default().insert(edge_id);
            }
            _ => {
                self.direct_out_edges.entry(src).or_default().insert(edge_id);
                self.direct_in_edges.entry(dst).or_default().insert(edge_id);
            }
        }
        Some(edge_id)
    }

    pub fn direct_out_edges(&self, pointer: PointerId) -> impl Iterator<Item = PFGEdgeId> + '_ {
        self.direct_out_edges.get(&pointer).into_iter().flatten().copied()
    }

    pub fn direct_in_edges(&self, pointer: PointerId) -> impl Iterator<Item = PFGEdgeId> + '_ {
        self.direct_in_edges.get(&pointer).into_iter().flatten().copied()
    }

    /// Deferred loads whose base is `pointer`.
    pub fn load_out_edges(&self, pointer: PointerId) -> impl Iterator<Item = PFGEdgeId> + '_ {
        self.load_out_edges.get(&pointer).into_iter().flatten().copied()
    }

    /// Deferred stores whose base is `pointer`.
    pub fn store_in_edges(&self, pointer: PointerId) -> impl Iterator<Item = PFGEdgeId> + '_ {
        self.store_in_edges.get(&pointer).into_iter().flatten().copied()
    }

    /// Returns true if some deferred load or store waits on objects of `pointer`.
    pub fn is_base(&self, pointer: PointerId) -> bool {
        self.load_out_edges.contains_key(&pointer) || self.store_in_edges.contains_key(&pointer)
    }

    /// All edges of the graph with their endpoints.
    pub fn edges(&self) -> impl Iterator<Item = (PointerId, PointerId, PFGEdgeKind)> + '_ {
        self.graph.raw_edges().iter().map(move |edge| {
            (
                self.graph[edge.source()].pointer,
                self.graph[edge.target()].pointer,
                edge.weight.kind,
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
}
