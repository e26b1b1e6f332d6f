//!
//! Convex programming (CVP) engine for network flow.
//!
//! * `Cvp`: generic two-phase engine (feasibility restoration, then Frank-Wolfe)
//! * `CvpNf`: single commodity network
//! * `CvpMcnf`: multi commodity network
//! * `CvpMcnfKl`: multi commodity network with Kleinrock delay cost
//!
pub mod config;
pub mod constraints;
pub mod engine;
pub mod error;
pub mod flow;
pub mod function;
pub mod line_search;
pub mod mcnf;
pub mod mocks;
pub mod network;
pub mod nf;
pub mod proxy;
pub mod solver;
pub mod utils;

pub use config::CvpConfig;
pub use constraints::{ConstraintGenerator, ConstraintSystem};
pub use engine::{Cvp, Termination};
pub use error::{CvpError, Result};
pub use function::{ArcCostFunction, BprFunction, CostFunction, KleinrockFunction, QuarticFunction};
pub use line_search::LineSearch;
pub use mcnf::{solve_by_dijkstra_only, CvpMcnf, CvpMcnfKl};
pub use network::{Commodity, FlowEdge, MultiCommoNetwork, Network};
pub use nf::CvpNf;
pub use proxy::{ProxyObjective, ProxyObjectiveStrategy};
pub use solver::{ClarabelSolver, ConvexSolver};

/// type of a cost (objective value, or cost of an arc per unit flow).
pub type Cost = f64;

/// type of a flow amount on a single flow variable.
pub type FlowRate = f64;

//
// public functions
//

///
/// Find the minimum cost flow of a single commodity network
/// with the default engine settings and the clarabel solver.
///
pub fn min_cost_flow<F: CostFunction>(network: &Network, cost: F) -> Result<Vec<FlowRate>> {
    let config = CvpConfig::default();
    let solver = ClarabelSolver::with_tolerance(config.solver_tolerance)?;
    let mut cvp = CvpNf::new(cost, network, solver, config)?;
    cvp.optimize()
}

///
/// Find the minimum cost flow of a multi commodity network
/// with the default engine settings and the clarabel solver.
///
/// Returned vector is indexed by `arc * n_commodities + commodity`.
///
pub fn min_cost_multi_commodity_flow<F: CostFunction>(
    network: &MultiCommoNetwork,
    cost: F,
) -> Result<Vec<FlowRate>> {
    let config = CvpConfig::default();
    let solver = ClarabelSolver::with_tolerance(config.solver_tolerance)?;
    let mut cvp = CvpMcnf::new(cost, network, solver, config)?;
    cvp.optimize()
}
