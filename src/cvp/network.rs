//! # `Network` and `MultiCommoNetwork`
//!
//! `Network` is a DiGraph whose edge is `FlowEdge`, together with an external
//! supply of each vertex.
//!
//! `FlowEdge` has
//! * `capacity` Upper limit of the flow
//! * `cost` Base cost per unit flow
//!
//! `MultiCommoNetwork` shares the same arc set among an ordered list of
//! `Commodity`. A flow on it has one variable per (arc, commodity) pair,
//! indexed by `arc * n_commodities + commodity`.
//!
use super::error::{CvpError, Result};
use super::{Cost, FlowRate};
use petgraph::graph::{DiGraph, EdgeIndex, NodeIndex};

/// FlowGraph definition
pub type FlowGraph = DiGraph<(), FlowEdge>;

/// Edge attributes used in FlowGraph.
///
/// `[0, u], c`
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct FlowEdge {
    /// capacity (upper limit of flow) of the edge u(e)
    pub capacity: FlowRate,
    /// base cost per unit flow
    pub cost: Cost,
}

impl FlowEdge {
    pub fn new(capacity: FlowRate, cost: Cost) -> FlowEdge {
        FlowEdge { capacity, cost }
    }
}

impl std::fmt::Display for FlowEdge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[0,{}] {}", self.capacity, self.cost)
    }
}

///
/// Single commodity network
///
/// `supply[v] > 0` is a source, `supply[v] < 0` is a sink, and zero is a
/// transshipment vertex. Supplies are only added in pairs by `add_demand`,
/// so they always sum up to zero.
///
#[derive(Debug, Clone)]
pub struct Network {
    pub graph: FlowGraph,
    supply: Vec<FlowRate>,
}

impl Network {
    /// Network with `n_vertex` vertices (`0..n_vertex`) and no arcs.
    pub fn new(n_vertex: usize) -> Network {
        let mut graph = FlowGraph::new();
        for _ in 0..n_vertex {
            graph.add_node(());
        }
        Network {
            graph,
            supply: vec![0.0; n_vertex],
        }
    }
    /// Add an arc `tail -> head`. Arcs are numbered in the order of addition.
    pub fn add_arc(
        &mut self,
        tail: usize,
        head: usize,
        capacity: FlowRate,
        cost: Cost,
    ) -> Result<EdgeIndex> {
        add_arc_to(&mut self.graph, tail, head, capacity, cost)
    }
    /// Send `amount` units from `origin` to `destination`.
    pub fn add_demand(&mut self, origin: usize, destination: usize, amount: FlowRate) -> Result<()> {
        check_commodity(self.n_vertex(), origin, destination, amount)?;
        self.supply[origin] += amount;
        self.supply[destination] -= amount;
        Ok(())
    }
    pub fn n_vertex(&self) -> usize {
        self.graph.node_count()
    }
    pub fn n_arc(&self) -> usize {
        self.graph.edge_count()
    }
    /// external supply (positive) or demand (negative) of the vertex
    pub fn supply(&self, v: usize) -> FlowRate {
        self.supply[v]
    }
    /// `(tail, head, edge)` of the arc
    pub fn arc(&self, e: EdgeIndex) -> (usize, usize, &FlowEdge) {
        arc_of(&self.graph, e)
    }
}

///
/// Demand of `amount` units from `origin` to `destination`
///
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Commodity {
    pub origin: usize,
    pub destination: usize,
    pub demand: FlowRate,
}

impl Commodity {
    pub fn new(origin: usize, destination: usize, demand: FlowRate) -> Commodity {
        Commodity {
            origin,
            destination,
            demand,
        }
    }
}

///
/// Multi commodity network
///
#[derive(Debug, Clone)]
pub struct MultiCommoNetwork {
    pub graph: FlowGraph,
    pub commodities: Vec<Commodity>,
}

impl MultiCommoNetwork {
    /// Share the arcs of `network`; its single commodity supplies are ignored.
    pub fn from_network(network: &Network) -> MultiCommoNetwork {
        MultiCommoNetwork {
            graph: network.graph.clone(),
            commodities: Vec::new(),
        }
    }
    pub fn new(n_vertex: usize) -> MultiCommoNetwork {
        MultiCommoNetwork::from_network(&Network::new(n_vertex))
    }
    pub fn add_arc(
        &mut self,
        tail: usize,
        head: usize,
        capacity: FlowRate,
        cost: Cost,
    ) -> Result<EdgeIndex> {
        add_arc_to(&mut self.graph, tail, head, capacity, cost)
    }
    pub fn add_commodity(&mut self, origin: usize, destination: usize, demand: FlowRate) -> Result<usize> {
        check_commodity(self.n_vertex(), origin, destination, demand)?;
        self.commodities
            .push(Commodity::new(origin, destination, demand));
        Ok(self.commodities.len() - 1)
    }
    pub fn n_vertex(&self) -> usize {
        self.graph.node_count()
    }
    pub fn n_arc(&self) -> usize {
        self.graph.edge_count()
    }
    pub fn n_commodity(&self) -> usize {
        self.commodities.len()
    }
    /// number of flow variables, `n_arc * n_commodity`
    pub fn n_vars(&self) -> usize {
        self.n_arc() * self.n_commodity()
    }
    /// index of the flow variable of commodity `k` on arc `e`
    pub fn var(&self, e: EdgeIndex, k: usize) -> usize {
        e.index() * self.n_commodity() + k
    }
    /// `(tail, head, edge)` of the arc
    pub fn arc(&self, e: EdgeIndex) -> (usize, usize, &FlowEdge) {
        arc_of(&self.graph, e)
    }
}

/// Add an arc `tail -> head`. Arcs are numbered in the order of addition.
fn add_arc_to(
    graph: &mut FlowGraph,
    tail: usize,
    head: usize,
    capacity: FlowRate,
    cost: Cost,
) -> Result<EdgeIndex> {
    let n = graph.node_count();
    for v in [tail, head] {
        if v >= n {
            return Err(CvpError::validation(
                "arc endpoint",
                format!("vertex < {}", n),
                v,
            ));
        }
    }
    if !(capacity > 0.0) {
        return Err(CvpError::validation("arc capacity", "positive", capacity));
    }
    Ok(graph.add_edge(
        NodeIndex::new(tail),
        NodeIndex::new(head),
        FlowEdge::new(capacity, cost),
    ))
}

fn arc_of(graph: &FlowGraph, e: EdgeIndex) -> (usize, usize, &FlowEdge) {
    let (v, w) = graph.edge_endpoints(e).unwrap();
    (v.index(), w.index(), graph.edge_weight(e).unwrap())
}

fn check_commodity(n_vertex: usize, origin: usize, destination: usize, demand: FlowRate) -> Result<()> {
    for v in [origin, destination] {
        if v >= n_vertex {
            return Err(CvpError::validation(
                "commodity endpoint",
                format!("vertex < {}", n_vertex),
                v,
            ));
        }
    }
    if !(demand >= 0.0) {
        return Err(CvpError::validation("demand", "non-negative", demand));
    }
    Ok(())
}

//
// tests
//
