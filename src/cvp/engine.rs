//!
//! Two phase convex programming engine.
//!
//! * `phase1`: move a (possibly infeasible) flow into the feasible region by
//!   solving the initial proxy of the network
//! * `phase2`: Frank-Wolfe iterations. Minimize the linearization of the cost
//!   at the current iterate over the feasible region, then line search on the
//!   true cost between the iterate and the minimizer.
//! * `optimize`: `phase1` followed by `phase2`
//!
use super::config::CvpConfig;
use super::constraints::{ConstraintGenerator, ConstraintSystem};
use super::error::{check_len, CvpError, Result};
use super::flow::{dot, lerp, sub};
use super::function::CostFunction;
use super::proxy::{ProxyObjective, ProxyObjectiveStrategy};
use super::solver::ConvexSolver;
use super::{Cost, FlowRate};

///
/// Engine state: owns the constraint system generated from the network,
/// the solver session and the current iterate.
///
/// `P` decides the constraints, the starting point and the proxy of phase1
/// for a kind of network.
///
#[derive(Debug)]
pub struct Cvp<F, S, P> {
    cost: F,
    solver: S,
    strategy: P,
    constraints: ConstraintSystem,
    config: CvpConfig,
    iterate: Vec<FlowRate>,
    history: Vec<Cost>,
    termination: Option<Termination>,
}

impl<F, S, P> Cvp<F, S, P>
where
    F: CostFunction,
    S: ConvexSolver,
    P: ProxyObjectiveStrategy + ConstraintGenerator,
{
    pub fn new(cost: F, solver: S, strategy: P, config: CvpConfig) -> Result<Self> {
        check_len("cost function variables", strategy.n_vars(), cost.n_vars())?;
        let constraints = strategy.generate_network_constraints()?;
        let iterate = strategy.initial_solution();
        check_len("initial solution", strategy.n_vars(), iterate.len())?;
        Ok(Cvp {
            cost,
            solver,
            strategy,
            constraints,
            config,
            iterate,
            history: Vec::new(),
            termination: None,
        })
    }
    pub fn cost(&self) -> &F {
        &self.cost
    }
    pub fn strategy(&self) -> &P {
        &self.strategy
    }
    pub fn config(&self) -> &CvpConfig {
        &self.config
    }
    pub fn constraints(&self) -> &ConstraintSystem {
        &self.constraints
    }
    /// For specializations that extend the constraint system before solving.
    pub fn constraints_mut(&mut self) -> &mut ConstraintSystem {
        &mut self.constraints
    }
    pub fn solver(&self) -> &S {
        &self.solver
    }
    /// current iterate
    pub fn iterate(&self) -> &[FlowRate] {
        &self.iterate
    }
    pub fn set_iterate(&mut self, x: Vec<FlowRate>) -> Result<()> {
        check_len("iterate", self.n_vars(), x.len())?;
        self.iterate = x;
        Ok(())
    }
    /// objective value of each accepted iterate of the last Frank-Wolfe run
    pub fn objective_history(&self) -> &[Cost] {
        &self.history
    }
    /// why the last Frank-Wolfe run stopped
    pub fn termination(&self) -> Option<Termination> {
        self.termination
    }
    /// number of flow variables
    pub fn n_vars(&self) -> usize {
        self.constraints.n_vars()
    }

    //
    // proxies
    //

    /// first order Taylor expansion of the cost at `x` (without the constant)
    pub fn linear_proxy_obj(&self, x: &[FlowRate]) -> Result<ProxyObjective> {
        Ok(linear_proxy(&self.cost.g(x)?, &self.constraints))
    }
    /// squared distance from `y`
    pub fn quad_proxy_obj(&self, y: &[FlowRate]) -> Result<ProxyObjective> {
        check_len("quadratic proxy anchor", self.n_vars(), y.len())?;
        Ok(pad(ProxyObjective::distance(y), &self.constraints))
    }

    //
    // solves
    //

    ///
    /// Minimize `objective` over the constraint system.
    /// Returns the flow variables of the minimizer.
    ///
    pub fn solve(&mut self, objective: &ProxyObjective) -> Result<Vec<FlowRate>> {
        solve_proxy(&mut self.solver, &self.constraints, objective)
    }
    ///
    /// Minimize `objective` over the constraint system.
    /// Returns all variables, including the auxiliary ones.
    ///
    pub fn solve_full(&mut self, objective: &ProxyObjective) -> Result<Vec<FlowRate>> {
        check_len("proxy objective", self.constraints.n_total(), objective.len())?;
        let z = self.solver.solve(objective, &self.constraints)?;
        check_len("solver output", self.constraints.n_total(), z.len())?;
        Ok(z)
    }

    //
    // phases
    //

    ///
    /// Feasibility restoration.
    ///
    /// Starting from `init` (or the initial solution of the network), solve
    /// the initial proxy anchored at the current point until the point
    /// satisfies all linear constraints.
    ///
    pub fn phase1(&mut self, init: Option<&[FlowRate]>) -> Result<Vec<FlowRate>> {
        let mut x = match init {
            Some(x) => {
                check_len("initial flow", self.n_vars(), x.len())?;
                x.to_vec()
            }
            None => self.strategy.initial_solution(),
        };
        let tolerance = self.config.feasibility_tolerance;

        let mut n_solves = 0;
        loop {
            let violation = self.constraints.violation(&x);
            log::debug!("phase1 solve={} violation={:e}", n_solves, violation);
            if violation <= tolerance {
                log::info!("phase1 feasible after {} solves", n_solves);
                self.iterate = x.clone();
                return Ok(x);
            }
            if n_solves == self.config.phase1_iterations {
                return Err(CvpError::Infeasible(format!(
                    "constraint violation {:e} remains after {} solves",
                    violation, n_solves
                )));
            }
            let proxy = pad(self.strategy.initial_proxy(&x), &self.constraints);
            x = self.solve(&proxy)?;
            n_solves += 1;
        }
    }

    ///
    /// Frank-Wolfe minimization from `init` (or the current iterate).
    ///
    /// Never fails on non-convergence: after the iteration budget the best
    /// iterate is returned.
    ///
    pub fn phase2(&mut self, init: Option<&[FlowRate]>) -> Result<Vec<FlowRate>> {
        let x0 = match init {
            Some(x) => {
                check_len("initial flow", self.n_vars(), x.len())?;
                x.to_vec()
            }
            None => self.iterate.clone(),
        };
        self.frank_wolfe(x0, |solver, constraints, _x, g| {
            solve_proxy(solver, constraints, &linear_proxy(g, constraints))
        })
    }

    ///
    /// Frank-Wolfe minimization from `x0`, with a custom direction finding
    /// step `direction(solver, constraints, x, g(x))` returning the target flow.
    ///
    pub fn frank_wolfe<D>(&mut self, x0: Vec<FlowRate>, mut direction: D) -> Result<Vec<FlowRate>>
    where
        D: FnMut(&mut S, &ConstraintSystem, &[FlowRate], &[Cost]) -> Result<Vec<FlowRate>>,
    {
        check_len("initial flow", self.n_vars(), x0.len())?;
        let violation = self.constraints.violation(&x0);
        if violation > self.config.feasibility_tolerance {
            log::warn!(
                "phase2 starts from an infeasible flow (violation {:e})",
                violation
            );
        }
        let solver = &mut self.solver;
        let constraints = &self.constraints;
        let run = frank_wolfe(&self.cost, x0, &self.config, |x, g| {
            direction(solver, constraints, x, g)
        })?;
        self.history = run.history;
        self.termination = Some(run.termination);
        self.iterate = run.flow.clone();
        Ok(run.flow)
    }

    ///
    /// phase1 from the initial solution, then phase2
    ///
    pub fn optimize(&mut self) -> Result<Vec<FlowRate>> {
        let x = self.phase1(None)?;
        self.phase2(Some(x.as_slice()))
    }
}

///
/// Minimize `objective` with `solver` and return the flow variables.
///
pub fn solve_proxy<S: ConvexSolver + ?Sized>(
    solver: &mut S,
    constraints: &ConstraintSystem,
    objective: &ProxyObjective,
) -> Result<Vec<FlowRate>> {
    check_len("proxy objective", constraints.n_total(), objective.len())?;
    let mut z = solver.solve(objective, constraints)?;
    check_len("solver output", constraints.n_total(), z.len())?;
    z.truncate(constraints.n_vars());
    Ok(z)
}

///
/// `g^T x` over the flow variables, zero on auxiliary variables
///
pub fn linear_proxy(g: &[Cost], constraints: &ConstraintSystem) -> ProxyObjective {
    pad(ProxyObjective::linear(g.to_vec()), constraints)
}

/// extend a proxy over the flow variables with zeros on auxiliary variables
fn pad(proxy: ProxyObjective, constraints: &ConstraintSystem) -> ProxyObjective {
    if proxy.len() == constraints.n_vars() {
        proxy.extend(constraints.n_aux(), 0.0)
    } else {
        proxy
    }
}

///
/// no descent direction is left if `g(x)·(y - x)` is not below `-tolerance (1 + |f(x)|)`
///
pub fn is_optimal(gap: Cost, fx: Cost, tolerance: f64) -> bool {
    !(gap < -tolerance * (1.0 + fx.abs()))
}

///
/// Why a Frank-Wolfe run stopped
///
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// no descent direction is left
    Converged,
    /// the line search found no point of smaller cost on the segment
    Stalled,
    /// the iteration budget was used up
    IterationLimit,
}

///
/// Result of `frank_wolfe`
///
#[derive(Debug, Clone)]
pub struct FrankWolfeRun {
    /// last iterate
    pub flow: Vec<FlowRate>,
    /// cost of every accepted iterate, starting from the initial flow
    pub history: Vec<Cost>,
    pub termination: Termination,
}

///
/// Frank-Wolfe loop.
///
/// At each iteration `direction(x, g(x))` gives the target `y`, and the next
/// iterate is the best point of the segment `[x, y]` found by the line search.
/// A step is accepted only if it strictly decreases the cost, so the cost of
/// the iterates is non-increasing.
///
/// Stopping on a step without decrease is reported as `Stalled` and logged
/// as a warning, since the gap test has not confirmed optimality.
///
pub fn frank_wolfe<C, D>(
    cost: &C,
    x0: Vec<FlowRate>,
    config: &CvpConfig,
    mut direction: D,
) -> Result<FrankWolfeRun>
where
    C: CostFunction + ?Sized,
    D: FnMut(&[FlowRate], &[Cost]) -> Result<Vec<FlowRate>>,
{
    let mut x = x0;
    let mut fx = cost.f(&x)?;
    let mut history = vec![fx];

    for k in 0..config.phase2_iterations {
        let g = cost.gradient(&x);
        let y = direction(&x, &g)?;
        check_len("direction", x.len(), y.len())?;
        let gap = dot(&g, &sub(&y, &x));
        log::debug!("phase2 iteration={} f={} gap={:e}", k, fx, gap);

        if is_optimal(gap, fx, config.optimality_tolerance) {
            log::info!("phase2 converged after {} iterations, f={}", k, fx);
            return Ok(FrankWolfeRun {
                flow: x,
                history,
                termination: Termination::Converged,
            });
        }

        let beta = config.line_search.search(&x, &y, cost)?;
        let x_next = lerp(&x, &y, beta);
        let f_next = cost.value(&x_next);
        log::trace!("phase2 beta={} f_next={}", beta, f_next);
        if !(f_next < fx) {
            log::warn!(
                "phase2 stalled after {} iterations, f={} gap={:e}",
                k,
                fx,
                gap
            );
            return Ok(FrankWolfeRun {
                flow: x,
                history,
                termination: Termination::Stalled,
            });
        }
        x = x_next;
        fx = f_next;
        history.push(fx);
    }

    log::warn!(
        "phase2 reached the iteration limit {}, f={}",
        config.phase2_iterations,
        fx
    );
    Ok(FrankWolfeRun {
        flow: x,
        history,
        termination: Termination::IterationLimit,
    })
}

//
// tests
//

#[cfg(test)]
mod tests {
    use super::super::constraints::SingleCommodity;
    use super::super::function::{ArcCost, ArcCostFunction, QuarticFunction};
    use super::super::line_search::LineSearch;
    use super::super::mocks::{mock_flow_network, mock_single_arc_network};
    use super::super::solver::ClarabelSolver;
    use super::*;

    fn init_logger() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn square() -> ArcCost {
        ArcCost::new(|x| x * x, |x| 2.0 * x)
    }

    /// A solver which never finds a feasible point
    struct InfeasibleSolver;
    impl ConvexSolver for InfeasibleSolver {
        fn solve(&mut self, _: &ProxyObjective, _: &ConstraintSystem) -> Result<Vec<FlowRate>> {
            Err(CvpError::Infeasible("mock".to_string()))
        }
    }

    /// A solver which returns a vector of a wrong size
    struct ShortSolver;
    impl ConvexSolver for ShortSolver {
        fn solve(&mut self, _: &ProxyObjective, _: &ConstraintSystem) -> Result<Vec<FlowRate>> {
            Ok(vec![])
        }
    }

    #[test]
    fn single_arc_converges_to_demand() {
        init_logger();
        let net = mock_single_arc_network(10.0, 5.0);
        let cost = ArcCostFunction::uniform(1, square());
        let mut cvp = Cvp::new(
            cost,
            ClarabelSolver::new(),
            SingleCommodity::new(&net),
            CvpConfig::default(),
        )
        .unwrap();
        let x = cvp.optimize().unwrap();
        assert_eq!(x.len(), 1);
        assert!((x[0] - 5.0).abs() < 1e-5, "x={:?}", x);
        assert!(x[0] >= -1e-6 && x[0] <= 10.0 + 1e-6);
        assert_eq!(cvp.iterate(), &x[..]);
        assert_eq!(cvp.termination(), Some(Termination::Converged));
    }

    #[test]
    fn coarse_grid_stall_is_reported() {
        init_logger();
        // a coarse grid finds no smaller cost on the segment long before the
        // gap is small enough
        let net = mock_flow_network();
        let mut cvp = Cvp::new(
            QuarticFunction::new(&net),
            ClarabelSolver::new(),
            SingleCommodity::new(&net),
            CvpConfig::default().with_line_search(LineSearch::Grid { probes: 100 }),
        )
        .unwrap();
        assert_eq!(cvp.termination(), None);
        let x = cvp.optimize().unwrap();
        assert_eq!(cvp.termination(), Some(Termination::Stalled));
        let history = cvp.objective_history();
        assert!(history.len() < CvpConfig::default().phase2_iterations);
        assert!(history.windows(2).all(|w| w[1] < w[0]));
        assert_eq!(cvp.cost().f(&x).unwrap(), history[history.len() - 1]);
        assert!(cvp.constraints().is_feasible(&x, 1e-5));
    }

    #[test]
    fn phase2_is_monotone() {
        init_logger();
        let net = mock_flow_network();
        let mut cvp = Cvp::new(
            QuarticFunction::new(&net),
            ClarabelSolver::new(),
            SingleCommodity::new(&net),
            CvpConfig::default().with_line_search(LineSearch::Grid { probes: 50 }),
        )
        .unwrap();
        let x1 = cvp.phase1(None).unwrap();
        assert!(cvp.constraints().is_feasible(&x1, 1e-6));
        let x2 = cvp.phase2(None).unwrap();
        let history = cvp.objective_history();
        assert!(!history.is_empty());
        assert!(history.windows(2).all(|w| w[1] <= w[0]));
        assert!(cvp.cost().f(&x2).unwrap() <= cvp.cost().f(&x1).unwrap());
        assert!(cvp.constraints().is_feasible(&x2, 1e-5));
    }

    #[test]
    fn phase1_reports_infeasibility() {
        let net = mock_single_arc_network(10.0, 5.0);
        let cost = ArcCostFunction::uniform(1, square());
        let mut cvp = Cvp::new(
            cost,
            InfeasibleSolver,
            SingleCommodity::new(&net),
            CvpConfig::default(),
        )
        .unwrap();
        assert!(matches!(cvp.phase1(None), Err(CvpError::Infeasible(_))));
        // an already feasible flow needs no solve
        assert_eq!(cvp.phase1(Some(&[5.0][..])).unwrap(), vec![5.0]);
    }

    #[test]
    fn demand_over_capacity_is_infeasible() {
        let net = mock_single_arc_network(3.0, 5.0);
        let cost = ArcCostFunction::uniform(1, square());
        let mut cvp = Cvp::new(
            cost,
            ClarabelSolver::new(),
            SingleCommodity::new(&net),
            CvpConfig::default(),
        )
        .unwrap();
        assert!(matches!(cvp.optimize(), Err(CvpError::Infeasible(_))));
    }

    #[test]
    fn dimension_mismatch_is_validation_error() {
        let net = mock_single_arc_network(10.0, 5.0);
        // cost over two variables on a single arc network
        let cost = ArcCostFunction::uniform(2, square());
        let r = Cvp::new(
            cost,
            ClarabelSolver::new(),
            SingleCommodity::new(&net),
            CvpConfig::default(),
        );
        assert!(matches!(r, Err(CvpError::Validation { .. })));

        let cost = ArcCostFunction::uniform(1, square());
        let mut cvp = Cvp::new(
            cost,
            ClarabelSolver::new(),
            SingleCommodity::new(&net),
            CvpConfig::default(),
        )
        .unwrap();
        assert!(matches!(
            cvp.phase1(Some(&[1.0, 2.0][..])),
            Err(CvpError::Validation { .. })
        ));
        assert!(matches!(
            cvp.phase2(Some(&[1.0, 2.0][..])),
            Err(CvpError::Validation { .. })
        ));
        assert!(matches!(
            cvp.solve(&ProxyObjective::linear(vec![1.0, 1.0])),
            Err(CvpError::Validation { .. })
        ));
        assert!(cvp.quad_proxy_obj(&[]).is_err());
    }

    #[test]
    fn short_solver_output_is_validation_error() {
        let net = mock_single_arc_network(10.0, 5.0);
        let mut cvp = Cvp::new(
            ArcCostFunction::uniform(1, square()),
            ShortSolver,
            SingleCommodity::new(&net),
            CvpConfig::default(),
        )
        .unwrap();
        assert!(matches!(
            cvp.phase1(None),
            Err(CvpError::Validation { .. })
        ));
    }

    #[test]
    fn iteration_budget_is_not_an_error() {
        let net = mock_flow_network();
        let mut cvp = Cvp::new(
            QuarticFunction::new(&net),
            ClarabelSolver::new(),
            SingleCommodity::new(&net),
            CvpConfig::default().with_phase2_iterations(1),
        )
        .unwrap();
        let x = cvp.optimize().unwrap();
        assert_eq!(x.len(), 3);
        assert!(cvp.objective_history().len() <= 2);
    }

    #[test]
    fn optimality_test() {
        assert!(is_optimal(0.0, 1.0, 1e-7));
        assert!(is_optimal(-1e-9, 1.0, 1e-7));
        assert!(!is_optimal(-1.0, 1.0, 1e-7));
        assert!(is_optimal(f64::NAN, 1.0, 1e-7));
    }
}
