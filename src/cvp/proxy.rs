//!
//! Proxy objectives handed to the external solver.
//!
use super::{Cost, FlowRate};

///
/// `minimize 1/2 x^T diag(quadratic) x + linear^T x + constant`
///
/// over all variables of a constraint system (flow variables first, then
/// auxiliary variables). Built fresh for each solve.
///
#[derive(Debug, Clone, PartialEq)]
pub struct ProxyObjective {
    pub linear: Vec<Cost>,
    /// diagonal of the hessian. all zero for a linear objective.
    pub quadratic: Vec<Cost>,
    pub constant: Cost,
}

impl ProxyObjective {
    /// linear objective `c^T x`
    pub fn linear(c: Vec<Cost>) -> ProxyObjective {
        let n = c.len();
        ProxyObjective {
            linear: c,
            quadratic: vec![0.0; n],
            constant: 0.0,
        }
    }
    /// `sum_i (x_i - y_i)^2`
    pub fn distance(y: &[FlowRate]) -> ProxyObjective {
        ProxyObjective {
            linear: y.iter().map(|yi| -2.0 * yi).collect(),
            quadratic: vec![2.0; y.len()],
            constant: y.iter().map(|yi| yi * yi).sum(),
        }
    }
    /// number of variables
    pub fn len(&self) -> usize {
        self.linear.len()
    }
    pub fn is_empty(&self) -> bool {
        self.linear.is_empty()
    }
    /// append `n` variables with the given linear coefficient and no curvature
    pub fn extend(mut self, n: usize, coefficient: Cost) -> ProxyObjective {
        self.linear.extend(std::iter::repeat(coefficient).take(n));
        self.quadratic.extend(std::iter::repeat(0.0).take(n));
        self
    }
    /// objective value at `x`
    pub fn eval(&self, x: &[FlowRate]) -> Cost {
        self.constant
            + self
                .linear
                .iter()
                .zip(&self.quadratic)
                .zip(x)
                .map(|((c, q), xi)| c * xi + 0.5 * q * xi * xi)
                .sum::<Cost>()
    }
}

///
/// Network specific choice of the first proxy and the starting point.
///
pub trait ProxyObjectiveStrategy {
    ///
    /// Flow where the engine starts when no initial flow is given.
    ///
    fn initial_solution(&self) -> Vec<FlowRate>;
    ///
    /// Proxy solved by phase1 to move `anchor` into the feasible region.
    ///
    /// Defaults to the squared distance from `anchor`, whose minimizer is the
    /// projection of `anchor` onto the feasible region.
    ///
    fn initial_proxy(&self, anchor: &[FlowRate]) -> ProxyObjective {
        ProxyObjective::distance(anchor)
    }
}
