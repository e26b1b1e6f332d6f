//!
//! External convex program solver.
//!
//! `ConvexSolver` is the seam between the engine and a solver: given a proxy
//! objective and a constraint system, return a minimizer over all variables,
//! or `CvpError::Infeasible`.
//!
//! `ClarabelSolver` maps the problem onto [clarabel](https://github.com/oxfordcontrol/Clarabel.rs),
//! an interior point solver for LP, QP and SOCP:
//!
//! ```text
//! minimize    1/2 z^T P z + q^T z
//! subject to  A z + s = b,  s in K
//! ```
//!
//! with `K` the product of a zero cone (equalities), a nonnegative cone
//! (inequalities) and one second order cone per `ConeBlock`.
//!
use super::constraints::{ConstraintSystem, LinearRow};
use super::error::{check_len, CvpError, Result};
use super::proxy::ProxyObjective;
use super::FlowRate;
use clarabel::algebra::CscMatrix;
use clarabel::solver::{
    DefaultSettings, DefaultSettingsBuilder, DefaultSolver, IPSolver, SolverStatus, SupportedConeT,
};

pub trait ConvexSolver {
    ///
    /// Minimize `objective` subject to `constraints`.
    ///
    /// The returned vector has `constraints.n_total()` entries.
    ///
    fn solve(
        &mut self,
        objective: &ProxyObjective,
        constraints: &ConstraintSystem,
    ) -> Result<Vec<FlowRate>>;
}

///
/// Solver session backed by clarabel
///
#[derive(Debug, Clone)]
pub struct ClarabelSolver {
    settings: DefaultSettings<f64>,
    /// number of solves done by this session
    n_solves: usize,
}

impl ClarabelSolver {
    pub fn new() -> ClarabelSolver {
        let settings = DefaultSettings {
            verbose: false,
            ..DefaultSettings::default()
        };
        ClarabelSolver::with_settings(settings)
    }
    pub fn with_settings(settings: DefaultSettings<f64>) -> ClarabelSolver {
        ClarabelSolver {
            settings,
            n_solves: 0,
        }
    }
    ///
    /// Settings with custom feasibility/optimality tolerance
    ///
    pub fn with_tolerance(tolerance: f64) -> Result<ClarabelSolver> {
        let settings = DefaultSettingsBuilder::default()
            .verbose(false)
            .tol_feas(tolerance)
            .tol_gap_abs(tolerance)
            .tol_gap_rel(tolerance)
            .build()
            .map_err(|e| CvpError::Solver(format!("clarabel settings error: {:?}", e)))?;
        Ok(ClarabelSolver::with_settings(settings))
    }
    pub fn n_solves(&self) -> usize {
        self.n_solves
    }
}

impl Default for ClarabelSolver {
    fn default() -> Self {
        ClarabelSolver::new()
    }
}

impl ConvexSolver for ClarabelSolver {
    fn solve(
        &mut self,
        objective: &ProxyObjective,
        constraints: &ConstraintSystem,
    ) -> Result<Vec<FlowRate>> {
        let n = constraints.n_total();
        check_len("proxy objective", n, objective.len())?;
        check_len("proxy objective hessian", n, objective.quadratic.len())?;

        // rows of A in the order of the cones
        let mut rows: Vec<&LinearRow> = Vec::new();
        let mut cones = Vec::new();
        if !constraints.equalities().is_empty() {
            rows.extend(constraints.equalities());
            cones.push(SupportedConeT::ZeroConeT(constraints.equalities().len()));
        }
        if !constraints.inequalities().is_empty() {
            rows.extend(constraints.inequalities());
            cones.push(SupportedConeT::NonnegativeConeT(
                constraints.inequalities().len(),
            ));
        }
        for cone in constraints.cones() {
            rows.extend(cone.rows.iter());
            cones.push(SupportedConeT::SecondOrderConeT(cone.rows.len()));
        }

        let a = to_csc(n, &rows);
        let b: Vec<f64> = rows.iter().map(|row| row.rhs).collect();
        let p = diagonal_csc(&objective.quadratic);

        let mut solver = DefaultSolver::new(
            &p,
            &objective.linear,
            &a,
            &b,
            &cones,
            self.settings.clone(),
        )
        .map_err(|e| CvpError::Solver(format!("clarabel initialization failed: {:?}", e)))?;
        solver.solve();
        self.n_solves += 1;

        let solution = &solver.solution;
        log::trace!(
            "clarabel status={:?} iterations={} proxy={}",
            solution.status,
            solution.iterations,
            objective.eval(&solution.x)
        );
        match solution.status {
            SolverStatus::Solved | SolverStatus::AlmostSolved => Ok(solution.x.clone()),
            SolverStatus::PrimalInfeasible | SolverStatus::AlmostPrimalInfeasible => Err(
                CvpError::Infeasible(format!("solver status {:?}", solution.status)),
            ),
            _ => Err(CvpError::Solver(format!(
                "solver status {:?}",
                solution.status
            ))),
        }
    }
}

///
/// Sparse matrix whose `i`-th row is `rows[i].coefficients`, with `n` columns
///
fn to_csc(n: usize, rows: &[&LinearRow]) -> CscMatrix<f64> {
    // column-wise (row, value), rows are pushed in increasing order
    let mut columns: Vec<Vec<(usize, f64)>> = vec![Vec::new(); n];
    for (r, row) in rows.iter().enumerate() {
        for &(j, a) in row.coefficients.iter() {
            columns[j].push((r, a));
        }
    }
    let mut colptr = Vec::with_capacity(n + 1);
    let mut rowval = Vec::new();
    let mut nzval = Vec::new();
    colptr.push(0);
    for column in columns {
        for (r, a) in column {
            rowval.push(r);
            nzval.push(a);
        }
        colptr.push(rowval.len());
    }
    CscMatrix::new(rows.len(), n, colptr, rowval, nzval)
}

///
/// Upper triangular (diagonal) hessian
///
fn diagonal_csc(diagonal: &[f64]) -> CscMatrix<f64> {
    let n = diagonal.len();
    let mut colptr = Vec::with_capacity(n + 1);
    let mut rowval = Vec::new();
    let mut nzval = Vec::new();
    colptr.push(0);
    for (j, &d) in diagonal.iter().enumerate() {
        if d != 0.0 {
            rowval.push(j);
            nzval.push(d);
        }
        colptr.push(rowval.len());
    }
    CscMatrix::new(n, n, colptr, rowval, nzval)
}

//
// tests
//

#[cfg(test)]
mod tests {
    use super::super::constraints::ConeBlock;
    use super::*;

    /// x0 + x1 = 2, 0 <= x0 <= 1.5, x1 >= 0
    fn simplex() -> ConstraintSystem {
        let mut cs = ConstraintSystem::new(2);
        cs.add_equality(LinearRow::new([(0, 1.0), (1, 1.0)], 2.0))
            .unwrap();
        cs.add_inequality(LinearRow::new([(0, 1.0)], 1.5)).unwrap();
        cs.add_inequality(LinearRow::new([(0, -1.0)], 0.0)).unwrap();
        cs.add_inequality(LinearRow::new([(1, -1.0)], 0.0)).unwrap();
        cs
    }

    #[test]
    fn csc_layout() {
        let r0 = LinearRow::new([(0, 1.0), (2, 2.0)], 0.0);
        let r1 = LinearRow::new([(1, 3.0), (2, 4.0)], 0.0);
        let a = to_csc(3, &[&r0, &r1]);
        assert_eq!(a.colptr, vec![0, 1, 2, 4]);
        assert_eq!(a.rowval, vec![0, 1, 0, 1]);
        assert_eq!(a.nzval, vec![1.0, 3.0, 2.0, 4.0]);
        let p = diagonal_csc(&[2.0, 0.0, 1.0]);
        assert_eq!(p.colptr, vec![0, 1, 1, 2]);
        assert_eq!(p.rowval, vec![0, 2]);
    }

    #[test]
    fn linear_program() {
        let mut solver = ClarabelSolver::new();
        // x1 is cheaper, so x = (0, 2)
        let x = solver
            .solve(&ProxyObjective::linear(vec![2.0, 1.0]), &simplex())
            .unwrap();
        assert!((x[0] - 0.0).abs() < 1e-6);
        assert!((x[1] - 2.0).abs() < 1e-6);
        // x0 is cheaper but bounded by 1.5
        let x = solver
            .solve(&ProxyObjective::linear(vec![1.0, 2.0]), &simplex())
            .unwrap();
        assert!((x[0] - 1.5).abs() < 1e-6);
        assert!((x[1] - 0.5).abs() < 1e-6);
        assert_eq!(solver.n_solves(), 2);
    }

    #[test]
    fn projection() {
        let mut solver = ClarabelSolver::new();
        // projection of (3, 3) onto x0 + x1 = 2 is (1, 1)
        let x = solver
            .solve(&ProxyObjective::distance(&[3.0, 3.0]), &simplex())
            .unwrap();
        assert!((x[0] - 1.0).abs() < 1e-6);
        assert!((x[1] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn infeasible_program() {
        let mut cs = simplex();
        // x0 + x1 <= 1 contradicts x0 + x1 = 2
        cs.add_inequality(LinearRow::new([(0, 1.0), (1, 1.0)], 1.0))
            .unwrap();
        let mut solver = ClarabelSolver::new();
        let r = solver.solve(&ProxyObjective::linear(vec![1.0, 1.0]), &cs);
        assert!(matches!(r, Err(CvpError::Infeasible(_))));
    }

    #[test]
    fn custom_tolerance() {
        let mut solver = ClarabelSolver::with_tolerance(1e-6).unwrap();
        let x = solver
            .solve(&ProxyObjective::linear(vec![1.0, 2.0]), &simplex())
            .unwrap();
        assert!((x[0] - 1.5).abs() < 1e-4);
        assert!((x[1] - 0.5).abs() < 1e-4);
        assert_eq!(solver.n_solves(), 1);
    }

    #[test]
    fn dimension_mismatch() {
        let mut solver = ClarabelSolver::new();
        let r = solver.solve(&ProxyObjective::linear(vec![1.0]), &simplex());
        assert!(matches!(r, Err(CvpError::Validation { .. })));
        assert_eq!(solver.n_solves(), 0);
    }

    #[test]
    fn second_order_cone() {
        // minimize t subject to t >= |x - 3|, x in [0, 2]  ->  x = 2, t = 1
        let mut cs = ConstraintSystem::new(1);
        cs.add_inequality(LinearRow::new([(0, 1.0)], 2.0)).unwrap();
        cs.add_inequality(LinearRow::new([(0, -1.0)], 0.0)).unwrap();
        let t = cs.add_aux(1).start;
        cs.add_cone(ConeBlock {
            rows: vec![
                // s0 = t
                LinearRow::new([(t, -1.0)], 0.0),
                // s1 = x - 3
                LinearRow::new([(0, -1.0)], -3.0),
            ],
        })
        .unwrap();
        let mut solver = ClarabelSolver::new();
        let z = solver
            .solve(&ProxyObjective::linear(vec![0.0]).extend(1, 1.0), &cs)
            .unwrap();
        assert_eq!(z.len(), 2);
        assert!((z[0] - 2.0).abs() < 1e-6);
        assert!((z[1] - 1.0).abs() < 1e-6);
    }
}
