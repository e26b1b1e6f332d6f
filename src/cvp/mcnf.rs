//!
//! Convex min-cost flow on a multi commodity network
//!
//! * `all_or_nothing`: route the whole demand of each commodity on its
//!   shortest path under the given marginal costs (ignores capacities)
//! * `CvpMcnf`: engine over `MultiCommodity` constraints, with the hybrid
//!   shortest path / solver loop
//! * `CvpMcnfKl`: Kleinrock delay, solved by shortest paths while they keep
//!   every arc below its capacity, and by a second order cone program otherwise
//!
use super::config::CvpConfig;
use super::constraints::{Kleinrock, MultiCommodity};
use super::engine::{frank_wolfe, linear_proxy, solve_proxy, Cvp};
use super::error::{check_len, CvpError, Result};
use super::function::{CostFunction, KleinrockFunction};
use super::line_search::LineSearch;
use super::network::MultiCommoNetwork;
use super::proxy::ProxyObjective;
use super::solver::ConvexSolver;
use super::{Cost, FlowRate};
use itertools::Itertools;
use petgraph::algo::astar;
use petgraph::graph::{EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;
use std::ops::Range;

///
/// All-or-nothing assignment.
///
/// For each commodity, find the shortest path from its origin to its
/// destination where the length of arc `e` is `marginal[var(e, k)]`
/// (negative lengths are clamped to zero), and put the whole demand on it.
///
pub fn all_or_nothing(network: &MultiCommoNetwork, marginal: &[Cost]) -> Result<Vec<FlowRate>> {
    check_len("marginal costs", network.n_vars(), marginal.len())?;
    let mut flow = vec![0.0; network.n_vars()];
    for (k, commodity) in network.commodities.iter().enumerate() {
        for e in shortest_path(network, k, marginal)? {
            flow[network.var(e, k)] += commodity.demand;
        }
    }
    Ok(flow)
}

///
/// Dijkstra (as A* with zero heuristic) for the commodity `k`.
///
/// Between parallel arcs, the one with the smallest length is used.
///
fn shortest_path(
    network: &MultiCommoNetwork,
    k: usize,
    marginal: &[Cost],
) -> Result<Vec<EdgeIndex>> {
    let length = |e: EdgeIndex| marginal[network.var(e, k)].max(0.0);
    let commodity = &network.commodities[k];
    let source = NodeIndex::new(commodity.origin);
    let target = NodeIndex::new(commodity.destination);

    let (_, nodes) = astar(
        &network.graph,
        source,
        |v| v == target,
        |er| length(er.id()),
        |_| 0.0,
    )
    .ok_or_else(|| {
        CvpError::Infeasible(format!(
            "commodity {}: {} is unreachable from {}",
            k, commodity.destination, commodity.origin
        ))
    })?;

    nodes
        .into_iter()
        .tuple_windows()
        .map(|(v, w)| {
            network
                .graph
                .edges_connecting(v, w)
                .map(|er| er.id())
                .min_by(|&a, &b| length(a).total_cmp(&length(b)))
                .ok_or_else(|| {
                    CvpError::Infeasible(format!("no arc between {:?} and {:?}", v, w))
                })
        })
        .collect()
}

///
/// Frank-Wolfe where every direction is the all-or-nothing assignment under
/// the current gradient, starting from the assignment at zero flow.
///
/// No solver is involved and capacities are ignored, so the result respects
/// flow conservation only.
///
pub fn solve_by_dijkstra_only<C: CostFunction + ?Sized>(
    network: &MultiCommoNetwork,
    cost: &C,
    iterations: usize,
    line_search: LineSearch,
) -> Result<Vec<FlowRate>> {
    check_len("cost function variables", network.n_vars(), cost.n_vars())?;
    let config = CvpConfig {
        phase2_iterations: iterations,
        line_search,
        ..CvpConfig::default()
    };
    let x0 = all_or_nothing(network, &cost.g(&vec![0.0; network.n_vars()])?)?;
    let run = frank_wolfe(cost, x0, &config, |_, g| all_or_nothing(network, g))?;
    log::info!(
        "solve_by_dijkstra_only {:?} after {} steps, f={:?}",
        run.termination,
        run.history.len() - 1,
        run.history.last()
    );
    Ok(run.flow)
}

//
// CvpMcnf
//

///
/// `Cvp` specialized for a `MultiCommoNetwork`.
///
/// Flow variables are indexed by `arc * n_commodity + commodity`.
///
#[derive(Debug)]
pub struct CvpMcnf<'a, F, S> {
    engine: Cvp<F, S, MultiCommodity<'a>>,
}

impl<'a, F: CostFunction, S: ConvexSolver> CvpMcnf<'a, F, S> {
    pub fn new(
        cost: F,
        network: &'a MultiCommoNetwork,
        solver: S,
        config: CvpConfig,
    ) -> Result<Self> {
        let engine = Cvp::new(cost, solver, MultiCommodity::new(network), config)?;
        Ok(CvpMcnf { engine })
    }
    pub fn network(&self) -> &'a MultiCommoNetwork {
        self.engine.strategy().network
    }
    pub fn engine(&self) -> &Cvp<F, S, MultiCommodity<'a>> {
        &self.engine
    }
    pub fn engine_mut(&mut self) -> &mut Cvp<F, S, MultiCommodity<'a>> {
        &mut self.engine
    }
    pub fn phase1(&mut self, init: Option<&[FlowRate]>) -> Result<Vec<FlowRate>> {
        self.engine.phase1(init)
    }
    pub fn phase2(&mut self, init: Option<&[FlowRate]>) -> Result<Vec<FlowRate>> {
        self.engine.phase2(init)
    }
    ///
    /// phase1 from the all-or-nothing assignment, then phase2
    ///
    pub fn optimize(&mut self) -> Result<Vec<FlowRate>> {
        let x0 = self.solve_by_dijkstra()?;
        let x = self.engine.phase1(Some(x0.as_slice()))?;
        self.engine.phase2(Some(x.as_slice()))
    }
    ///
    /// Min-cost multi commodity flow with the base cost of each arc.
    ///
    pub fn solve_linear(&mut self) -> Result<Vec<FlowRate>> {
        let base_costs = self.engine.strategy().base_costs();
        self.engine.solve(&ProxyObjective::linear(base_costs))
    }
    ///
    /// All-or-nothing assignment under the marginal costs at the current
    /// iterate. Capacities are ignored.
    ///
    pub fn solve_by_dijkstra(&self) -> Result<Vec<FlowRate>> {
        let marginal = self.engine.cost().g(self.engine.iterate())?;
        all_or_nothing(self.network(), &marginal)
    }
    ///
    /// Frank-Wolfe whose direction is the all-or-nothing assignment whenever
    /// it fits in the capacities, and the solution of the linear proxy
    /// otherwise.
    ///
    /// The starting point is the all-or-nothing assignment, projected onto
    /// the feasible region by phase1 if it violates a capacity.
    ///
    pub fn solve_by_dijkstra_and_socp(&mut self) -> Result<Vec<FlowRate>> {
        let tolerance = self.engine.config().feasibility_tolerance;
        let network = self.network();

        let x0 = self.solve_by_dijkstra()?;
        let x = if self.engine.constraints().is_feasible(&x0, tolerance) {
            x0
        } else {
            log::debug!("shortest path flow exceeds capacity, projecting");
            self.engine.phase1(Some(x0.as_slice()))?
        };

        self.engine.frank_wolfe(x, |solver, constraints, _, g| {
            let y = all_or_nothing(network, g)?;
            if constraints.is_feasible(&y, tolerance) {
                Ok(y)
            } else {
                solve_proxy(solver, constraints, &linear_proxy(g, constraints))
            }
        })
    }
}

//
// CvpMcnfKl
//

///
/// Multi commodity flow minimizing the Kleinrock delay.
///
#[derive(Debug)]
pub struct CvpMcnfKl<'a, S> {
    engine: Cvp<KleinrockFunction<'a>, S, Kleinrock<'a>>,
    /// delay variables, once the cones are added
    delays: Option<Range<usize>>,
}

impl<'a, S: ConvexSolver> CvpMcnfKl<'a, S> {
    pub fn new(network: &'a MultiCommoNetwork, solver: S, config: CvpConfig) -> Result<Self> {
        let engine = Cvp::new(
            KleinrockFunction::new(network),
            solver,
            Kleinrock::new(network),
            config,
        )?;
        Ok(CvpMcnfKl {
            engine,
            delays: None,
        })
    }
    pub fn network(&self) -> &'a MultiCommoNetwork {
        self.engine.strategy().network()
    }
    pub fn engine(&self) -> &Cvp<KleinrockFunction<'a>, S, Kleinrock<'a>> {
        &self.engine
    }
    pub fn phase1(&mut self, init: Option<&[FlowRate]>) -> Result<Vec<FlowRate>> {
        self.engine.phase1(init)
    }
    pub fn phase2(&mut self, init: Option<&[FlowRate]>) -> Result<Vec<FlowRate>> {
        self.engine.phase2(init)
    }
    pub fn optimize(&mut self) -> Result<Vec<FlowRate>> {
        self.solve_by_dijkstra_and_socp()
    }
    ///
    /// All-or-nothing assignment under the marginal delay at the current
    /// iterate.
    ///
    pub fn solve_by_dijkstra(&self) -> Result<Vec<FlowRate>> {
        let marginal = self.engine.cost().g(self.engine.iterate())?;
        all_or_nothing(self.network(), &marginal)
    }
    ///
    /// If the all-or-nothing assignment keeps every arc below its capacity,
    /// refine it with all-or-nothing Frank-Wolfe steps (the delay is a
    /// barrier, so the iterates stay below the capacities).
    /// Otherwise switch to the capacity constraints and solve the cone
    /// program exactly.
    ///
    pub fn solve_by_dijkstra_and_socp(&mut self) -> Result<Vec<FlowRate>> {
        let x0 = self.solve_by_dijkstra()?;
        let f0 = self.engine.cost().f(&x0)?;
        if f0.is_finite() {
            log::debug!("shortest path flow is below capacity, f={}", f0);
            let network = self.network();
            self.engine
                .frank_wolfe(x0, |_, _, _, g| all_or_nothing(network, g))
        } else {
            log::info!("shortest path flow saturates an arc, solving the delay cone program");
            self.solve_socp()
        }
    }
    ///
    /// Minimize the sum of delay variables over the network constraints and
    /// the capacity cones.
    ///
    pub fn solve_socp(&mut self) -> Result<Vec<FlowRate>> {
        let delays = match &self.delays {
            Some(delays) => delays.clone(),
            None => {
                let strategy = *self.engine.strategy();
                let delays = strategy.cap_constraints(self.engine.constraints_mut())?;
                self.delays = Some(delays.clone());
                delays
            }
        };
        let n = self.engine.n_vars();
        let objective = ProxyObjective::linear(vec![0.0; n]).extend(delays.len(), 1.0);
        let z = self.engine.solve_full(&objective)?;
        let x = z[..n].to_vec();
        log::debug!("delay cone program: sum of delays {}", z[delays].iter().sum::<f64>());
        self.engine.set_iterate(x.clone())?;
        Ok(x)
    }
}
