//!
//! cvpflow solves [minimum cost flow problem](https://en.wikipedia.org/wiki/Minimum-cost_flow_problem)
//! of real-valued flow under a convex, non-linear cost function,
//! for single-commodity and multi-commodity networks.
//!
//! Each iteration minimizes a linear or quadratic proxy of the cost over the
//! flow polytope with an external convex solver, and moves toward the
//! proxy minimizer by a line search on the true cost.
//!
pub mod cvp;
