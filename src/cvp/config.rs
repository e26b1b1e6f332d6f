//!
//! Engine settings
//!
use super::line_search::LineSearch;
use serde::{Deserialize, Serialize};

const PHASE1_ITERATIONS: usize = 10;
const PHASE2_ITERATIONS: usize = 200;
const GOLDEN_ITERATIONS: usize = 40;
const OPTIMALITY_TOLERANCE: f64 = 1e-7;
const FEASIBILITY_TOLERANCE: f64 = 1e-6;
const SOLVER_TOLERANCE: f64 = 1e-8;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CvpConfig {
    /// max number of proxy solves to reach the feasible region
    pub phase1_iterations: usize,
    /// max number of Frank-Wolfe iterations
    pub phase2_iterations: usize,
    /// strategy to choose the next iterate on a segment
    pub line_search: LineSearch,
    /// phase2 stops when `g(x)·(y-x) > -optimality_tolerance * (1 + |f(x)|)`
    pub optimality_tolerance: f64,
    /// allowed residual of a linear constraint, scaled by `1 + |rhs|`
    pub feasibility_tolerance: f64,
    /// feasibility and duality gap tolerance of the convex solver
    pub solver_tolerance: f64,
}

impl std::default::Default for CvpConfig {
    fn default() -> Self {
        Self {
            phase1_iterations: PHASE1_ITERATIONS,
            phase2_iterations: PHASE2_ITERATIONS,
            line_search: LineSearch::Golden {
                iterations: GOLDEN_ITERATIONS,
            },
            optimality_tolerance: OPTIMALITY_TOLERANCE,
            feasibility_tolerance: FEASIBILITY_TOLERANCE,
            solver_tolerance: SOLVER_TOLERANCE,
        }
    }
}

impl CvpConfig {
    pub fn with_line_search(mut self, line_search: LineSearch) -> Self {
        self.line_search = line_search;
        self
    }
    pub fn with_phase2_iterations(mut self, phase2_iterations: usize) -> Self {
        self.phase2_iterations = phase2_iterations;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_toml_keeps_defaults() {
        let config: CvpConfig = toml::from_str(
            r#"
            phase2_iterations = 5
            line_search = { Grid = { probes = 50 } }
            "#,
        )
        .unwrap();
        assert_eq!(config.phase2_iterations, 5);
        assert_eq!(config.line_search, LineSearch::Grid { probes: 50 });
        assert_eq!(config.phase1_iterations, PHASE1_ITERATIONS);
        assert_eq!(config.feasibility_tolerance, FEASIBILITY_TOLERANCE);
        assert_eq!(config.solver_tolerance, SOLVER_TOLERANCE);

        let config: CvpConfig = toml::from_str("solver_tolerance = 1e-6").unwrap();
        assert_eq!(config.solver_tolerance, 1e-6);
    }
}
