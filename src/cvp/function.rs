//!
//! Convex cost functions of a flow vector.
//!
//! * `ArcCostFunction`: separable `sum_e c_e(x_e)` with per-arc functions
//! * `QuarticFunction`: congestion cost of a single commodity network
//! * `BprFunction`: BPR link delay of the aggregate flow of a multi commodity network
//! * `KleinrockFunction`: Kleinrock average delay of a multi commodity network
//!
use super::error::{check_len, Result};
use super::network::{MultiCommoNetwork, Network};
use super::{Cost, FlowRate};
use petgraph::graph::{EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;

///
/// Convex and differentiable cost of a flow vector.
///
/// Implementors provide the unchecked `value` and `gradient`, which may assume
/// `x.len() == self.n_vars()`. Callers outside of the engine should use
/// `f` and `g`, which validate the length first.
///
pub trait CostFunction {
    /// number of flow variables
    fn n_vars(&self) -> usize;
    /// objective value at `x`
    fn value(&self, x: &[FlowRate]) -> Cost;
    /// gradient at `x`, same length as `x`
    fn gradient(&self, x: &[FlowRate]) -> Vec<Cost>;

    fn f(&self, x: &[FlowRate]) -> Result<Cost> {
        check_len("flow", self.n_vars(), x.len())?;
        Ok(self.value(x))
    }
    fn g(&self, x: &[FlowRate]) -> Result<Vec<Cost>> {
        check_len("flow", self.n_vars(), x.len())?;
        Ok(self.gradient(x))
    }
}

impl<C: CostFunction + ?Sized> CostFunction for &C {
    fn n_vars(&self) -> usize {
        (**self).n_vars()
    }
    fn value(&self, x: &[FlowRate]) -> Cost {
        (**self).value(x)
    }
    fn gradient(&self, x: &[FlowRate]) -> Vec<Cost> {
        (**self).gradient(x)
    }
}

//
// Separable cost
//

///
/// Convex cost of a single flow variable,
/// given as a function and its derivative.
///
#[derive(Debug, Copy, Clone)]
pub struct ArcCost {
    pub value: fn(FlowRate) -> Cost,
    pub derivative: fn(FlowRate) -> Cost,
}

impl ArcCost {
    pub fn new(value: fn(FlowRate) -> Cost, derivative: fn(FlowRate) -> Cost) -> ArcCost {
        ArcCost { value, derivative }
    }
}

///
/// `f(x) = sum_i c_i(x_i)`
///
#[derive(Debug, Clone)]
pub struct ArcCostFunction {
    costs: Vec<ArcCost>,
}

impl ArcCostFunction {
    pub fn new(costs: Vec<ArcCost>) -> ArcCostFunction {
        ArcCostFunction { costs }
    }
    /// the same cost on all `n` variables
    pub fn uniform(n: usize, cost: ArcCost) -> ArcCostFunction {
        ArcCostFunction::new(vec![cost; n])
    }
}

impl CostFunction for ArcCostFunction {
    fn n_vars(&self) -> usize {
        self.costs.len()
    }
    fn value(&self, x: &[FlowRate]) -> Cost {
        self.costs.iter().zip(x).map(|(c, &xi)| (c.value)(xi)).sum()
    }
    fn gradient(&self, x: &[FlowRate]) -> Vec<Cost> {
        self.costs
            .iter()
            .zip(x)
            .map(|(c, &xi)| (c.derivative)(xi))
            .collect()
    }
}

//
// Quartic cost
//

///
/// Congestion cost on a single commodity network.
///
/// For each arc `e = (v -> w)` with capacity `c_e`,
///
/// ```text
/// 20 sum_{a into v} (x_a / c_a)^4 + 100 (x_e / c_e)^2 + (w + 1) / (v + 1) x_e
/// ```
///
/// so the quartic term of an arc is counted once per arc leaving its head.
///
#[derive(Debug, Clone)]
pub struct QuarticFunction<'a> {
    network: &'a Network,
}

impl<'a> QuarticFunction<'a> {
    pub fn new(network: &'a Network) -> QuarticFunction<'a> {
        QuarticFunction { network }
    }
    fn upstream(&self, v: usize) -> impl Iterator<Item = EdgeIndex> + '_ {
        self.network
            .graph
            .edges_directed(NodeIndex::new(v), Direction::Incoming)
            .map(|er| er.id())
    }
}

impl<'a> CostFunction for QuarticFunction<'a> {
    fn n_vars(&self) -> usize {
        self.network.n_arc()
    }
    fn value(&self, x: &[FlowRate]) -> Cost {
        let mut sum = 0.0;
        for e in self.network.graph.edge_indices() {
            let (tail, head, ew) = self.network.arc(e);
            for a in self.upstream(tail) {
                let r = x[a.index()] / self.network.graph[a].capacity;
                sum += 20.0 * r.powi(4);
            }
            let r = x[e.index()] / ew.capacity;
            sum += 100.0 * r * r;
            sum += head_tail_ratio(tail, head) * x[e.index()];
        }
        sum
    }
    fn gradient(&self, x: &[FlowRate]) -> Vec<Cost> {
        let mut d = vec![0.0; x.len()];
        for e in self.network.graph.edge_indices() {
            let (tail, head, ew) = self.network.arc(e);
            for a in self.upstream(tail) {
                let c = self.network.graph[a].capacity;
                d[a.index()] += 80.0 * x[a.index()].powi(3) / c.powi(4);
            }
            let c = ew.capacity;
            d[e.index()] += 200.0 * x[e.index()] / (c * c);
            d[e.index()] += head_tail_ratio(tail, head);
        }
        d
    }
}

fn head_tail_ratio(tail: usize, head: usize) -> f64 {
    (head as f64 + 1.0) / (tail as f64 + 1.0)
}

//
// Multi commodity costs
//

///
/// Bureau of Public Roads link delay of the aggregate flow `y_e`:
///
/// ```text
/// sum_e t_e y_e (1 + alpha / (beta + 1) (y_e / c_e)^beta)
/// ```
///
/// with base cost `t_e` and capacity `c_e`.
///
#[derive(Debug, Clone)]
pub struct BprFunction<'a> {
    network: &'a MultiCommoNetwork,
    alpha: f64,
    beta: f64,
}

impl<'a> BprFunction<'a> {
    pub fn new(network: &'a MultiCommoNetwork, alpha: f64, beta: f64) -> BprFunction<'a> {
        BprFunction {
            network,
            alpha,
            beta,
        }
    }
    /// The usual parameters `alpha = 0.15, beta = 4`
    pub fn standard(network: &'a MultiCommoNetwork) -> BprFunction<'a> {
        BprFunction::new(network, 0.15, 4.0)
    }
}

impl<'a> CostFunction for BprFunction<'a> {
    fn n_vars(&self) -> usize {
        self.network.n_vars()
    }
    fn value(&self, x: &[FlowRate]) -> Cost {
        aggregate(self.network, x)
            .map(|(y, c, t)| {
                let r = (y / c).max(0.0);
                t * y * (1.0 + self.alpha / (self.beta + 1.0) * r.powf(self.beta))
            })
            .sum()
    }
    fn gradient(&self, x: &[FlowRate]) -> Vec<Cost> {
        let k = self.network.n_commodity();
        aggregate(self.network, x)
            .flat_map(|(y, c, t)| {
                let r = (y / c).max(0.0);
                std::iter::repeat(t + t * self.alpha * r.powf(self.beta)).take(k)
            })
            .collect()
    }
}

///
/// Kleinrock average delay of the aggregate flow `y_e`:
///
/// ```text
/// sum_e y_e / (c_e - y_e)
/// ```
///
/// The delay is infinite on a saturated arc (`y_e >= c_e`).
///
#[derive(Debug, Clone)]
pub struct KleinrockFunction<'a> {
    network: &'a MultiCommoNetwork,
}

impl<'a> KleinrockFunction<'a> {
    pub fn new(network: &'a MultiCommoNetwork) -> KleinrockFunction<'a> {
        KleinrockFunction { network }
    }
}

impl<'a> CostFunction for KleinrockFunction<'a> {
    fn n_vars(&self) -> usize {
        self.network.n_vars()
    }
    fn value(&self, x: &[FlowRate]) -> Cost {
        aggregate(self.network, x)
            .map(|(y, c, _)| if y < c { y / (c - y) } else { f64::INFINITY })
            .sum()
    }
    fn gradient(&self, x: &[FlowRate]) -> Vec<Cost> {
        let k = self.network.n_commodity();
        aggregate(self.network, x)
            .flat_map(|(y, c, _)| {
                let d = if y < c {
                    c / ((c - y) * (c - y))
                } else {
                    f64::INFINITY
                };
                std::iter::repeat(d).take(k)
            })
            .collect()
    }
}

///
/// `(aggregate flow, capacity, base cost)` of each arc
///
fn aggregate<'a>(
    network: &'a MultiCommoNetwork,
    x: &'a [FlowRate],
) -> impl Iterator<Item = (FlowRate, FlowRate, Cost)> + 'a {
    let k = network.n_commodity();
    network.graph.edge_indices().map(move |e| {
        let ew = &network.graph[e];
        let y: FlowRate = x[e.index() * k..(e.index() + 1) * k].iter().sum();
        (y, ew.capacity, ew.cost)
    })
}

//
// tests
//
