//!
//! Convex min-cost flow on a single commodity network
//!
use super::config::CvpConfig;
use super::constraints::SingleCommodity;
use super::engine::Cvp;
use super::error::Result;
use super::function::CostFunction;
use super::network::Network;
use super::proxy::{ProxyObjective, ProxyObjectiveStrategy};
use super::solver::ConvexSolver;
use super::FlowRate;

///
/// `Cvp` specialized for a single commodity `Network`.
///
/// Flow variables are indexed by the arc index.
///
#[derive(Debug)]
pub struct CvpNf<'a, F, S> {
    engine: Cvp<F, S, SingleCommodity<'a>>,
}

impl<'a, F: CostFunction, S: ConvexSolver> CvpNf<'a, F, S> {
    pub fn new(cost: F, network: &'a Network, solver: S, config: CvpConfig) -> Result<Self> {
        let engine = Cvp::new(cost, solver, SingleCommodity::new(network), config)?;
        Ok(CvpNf { engine })
    }
    pub fn network(&self) -> &'a Network {
        self.engine.strategy().network
    }
    pub fn engine(&self) -> &Cvp<F, S, SingleCommodity<'a>> {
        &self.engine
    }
    pub fn engine_mut(&mut self) -> &mut Cvp<F, S, SingleCommodity<'a>> {
        &mut self.engine
    }
    pub fn phase1(&mut self, init: Option<&[FlowRate]>) -> Result<Vec<FlowRate>> {
        self.engine.phase1(init)
    }
    pub fn phase2(&mut self, init: Option<&[FlowRate]>) -> Result<Vec<FlowRate>> {
        self.engine.phase2(init)
    }
    pub fn optimize(&mut self) -> Result<Vec<FlowRate>> {
        self.engine.optimize()
    }
    ///
    /// Min-cost flow with the base cost of each arc, ignoring the cost function.
    ///
    pub fn solve_linear(&mut self) -> Result<Vec<FlowRate>> {
        let base_costs = self.engine.strategy().base_costs();
        self.engine.solve(&ProxyObjective::linear(base_costs))
    }
    ///
    /// Feasible flow closest (in euclidean distance) to the initial solution.
    ///
    pub fn solve_quadratic(&mut self) -> Result<Vec<FlowRate>> {
        let y = self.engine.strategy().initial_solution();
        let proxy = self.engine.quad_proxy_obj(&y)?;
        self.engine.solve(&proxy)
    }
}
