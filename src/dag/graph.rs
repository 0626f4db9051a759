// src/dag/graph.rs

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;

use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};

use crate::errors::{JobdagError, Result};

/// Bounds every job identifier must satisfy.
///
/// Identifiers are opaque to the scheduler: only equality, hashing and
/// cloning are relied upon. `Debug` is used for log fields and error
/// messages.
pub trait JobId: Clone + Eq + Hash + Debug + Send + Sync + 'static {}

impl<T> JobId for T where T: Clone + Eq + Hash + Debug + Send + Sync + 'static {}

/// Internal node structure: stores immediate deps and dependents.
#[derive(Debug, Clone)]
struct JobNode<V> {
    /// Direct predecessors: jobs that must complete before this one starts.
    deps: Vec<V>,
    /// Direct successors: jobs that wait on this one.
    dependents: Vec<V>,
}

impl<V> Default for JobNode<V> {
    fn default() -> Self {
        Self {
            deps: Vec::new(),
            dependents: Vec::new(),
        }
    }
}

/// Immutable dependency graph of jobs.
///
/// An edge `x -> y` means "x must complete before y may start". The graph is
/// never mutated once built; acyclicity is the caller's responsibility (see
/// [`JobGraph::check_acyclic`]).
#[derive(Debug, Clone)]
pub struct JobGraph<V: JobId> {
    nodes: HashMap<V, JobNode<V>>,
    /// Vertices in insertion order; this is the iteration order.
    order: Vec<V>,
    edge_count: usize,
}

impl<V: JobId> JobGraph<V> {
    pub fn builder() -> JobGraphBuilder<V> {
        JobGraphBuilder::new()
    }

    /// Build a graph from `(predecessor, successor)` pairs.
    pub fn from_edges<I>(edges: I) -> Self
    where
        I: IntoIterator<Item = (V, V)>,
    {
        edges
            .into_iter()
            .fold(JobGraphBuilder::new(), |b, (from, to)| b.edge(from, to))
            .build()
    }

    /// All job ids, in insertion order.
    pub fn vertices(&self) -> impl Iterator<Item = &V> {
        self.order.iter()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    pub fn contains(&self, job: &V) -> bool {
        self.nodes.contains_key(job)
    }

    /// Immediate predecessors of a job (the jobs it waits on).
    pub fn predecessors_of(&self, job: &V) -> &[V] {
        self.nodes
            .get(job)
            .map(|n| n.deps.as_slice())
            .unwrap_or(&[])
    }

    /// Immediate successors of a job (the jobs waiting on it).
    pub fn successors_of(&self, job: &V) -> &[V] {
        self.nodes
            .get(job)
            .map(|n| n.dependents.as_slice())
            .unwrap_or(&[])
    }

    pub fn in_degree(&self, job: &V) -> usize {
        self.predecessors_of(job).len()
    }

    /// Jobs with no predecessors.
    pub fn roots(&self) -> impl Iterator<Item = &V> {
        self.order.iter().filter(|v| self.in_degree(v) == 0)
    }

    /// Verify the graph is acyclic, returning one topological order.
    ///
    /// The scheduler never calls this itself; it is offered to callers that
    /// want to reject a cyclic graph up front instead of hitting the
    /// "no job without dependencies" startup error.
    pub fn check_acyclic(&self) -> Result<Vec<V>> {
        let mut graph: DiGraph<usize, ()> = DiGraph::new();
        let indices: HashMap<&V, NodeIndex> = self
            .order
            .iter()
            .enumerate()
            .map(|(pos, v)| (v, graph.add_node(pos)))
            .collect();

        for v in self.order.iter() {
            let Some(idx) = indices.get(v) else { continue };
            for succ in self.successors_of(v) {
                if let Some(succ_idx) = indices.get(succ) {
                    graph.add_edge(*idx, *succ_idx, ());
                }
            }
        }

        match toposort(&graph, None) {
            Ok(sorted) => Ok(sorted
                .into_iter()
                .map(|idx| self.order[graph[idx]].clone())
                .collect()),
            Err(cycle) => {
                let job = &self.order[graph[cycle.node_id()]];
                Err(JobdagError::DagCycle(format!(
                    "cycle detected in job graph involving job {:?}",
                    job
                )))
            }
        }
    }
}

/// Incremental builder for [`JobGraph`].
#[derive(Debug, Clone)]
pub struct JobGraphBuilder<V: JobId> {
    nodes: HashMap<V, JobNode<V>>,
    order: Vec<V>,
    edge_count: usize,
}

impl<V: JobId> JobGraphBuilder<V> {
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
            order: Vec::new(),
            edge_count: 0,
        }
    }

    /// Add a vertex. Adding an existing vertex is a no-op.
    pub fn job(mut self, job: V) -> Self {
        self.ensure_node(&job);
        self
    }

    /// Add the edge `from -> to`, creating both vertices if needed.
    ///
    /// Repeated edges are stored once.
    pub fn edge(mut self, from: V, to: V) -> Self {
        self.ensure_node(&from);
        self.ensure_node(&to);

        let already = self
            .nodes
            .get(&to)
            .is_some_and(|n| n.deps.contains(&from));
        if already {
            return self;
        }

        if let Some(node) = self.nodes.get_mut(&to) {
            node.deps.push(from.clone());
        }
        if let Some(node) = self.nodes.get_mut(&from) {
            node.dependents.push(to);
        }
        self.edge_count += 1;
        self
    }

    pub fn build(self) -> JobGraph<V> {
        JobGraph {
            nodes: self.nodes,
            order: self.order,
            edge_count: self.edge_count,
        }
    }

    fn ensure_node(&mut self, job: &V) {
        if !self.nodes.contains_key(job) {
            self.nodes.insert(job.clone(), JobNode::default());
            self.order.push(job.clone());
        }
    }
}

impl<V: JobId> Default for JobGraphBuilder<V> {
    fn default() -> Self {
        Self::new()
    }
}
