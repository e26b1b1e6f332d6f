//!
//! One dimensional search on the segment between two flows.
//!
//! Both searches return `beta` in `[0, 1]` that identifies the point
//! `A + beta (B - A)` with the smallest cost found.
//!
use super::error::{check_len, Result};
use super::function::CostFunction;
use super::{Cost, FlowRate};
use serde::{Deserialize, Serialize};

/// inverse of the golden ratio, `(sqrt(5) - 1) / 2`
pub const PHI: f64 = 0.618_033_988_749_894_8;

///
/// Line search strategy used by the engine
///
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum LineSearch {
    /// golden section search with a fixed number of narrowing steps
    Golden { iterations: usize },
    /// uniform grid of `probes` points
    Grid { probes: usize },
}

impl LineSearch {
    pub fn search<C: CostFunction + ?Sized>(&self, a: &[FlowRate], b: &[FlowRate], cost: &C) -> Result<f64> {
        match *self {
            LineSearch::Golden { iterations } => golden_search(a, b, cost, iterations),
            LineSearch::Grid { probes } => line_search(a, b, cost, probes),
        }
    }
}

///
/// A probe point on the segment, with its cost
///
#[derive(Debug, Clone)]
struct Probe {
    x: Vec<FlowRate>,
    f: Cost,
    beta: f64,
}

impl Probe {
    fn new<C: CostFunction + ?Sized>(a: &[FlowRate], b: &[FlowRate], beta: f64, cost: &C) -> Probe {
        let x = super::flow::lerp(a, b, beta);
        let f = cost.value(&x);
        Probe { x, f, beta }
    }
}

///
/// Golden section search between `a` and `b`.
///
/// Two interior probes are kept, e.g.
///
/// ```text
/// A----x1----x2----B
/// ```
///
/// At each step the probe with the larger cost is moved to the golden point
/// on the far side of the other one, so one cost evaluation is done per step.
/// When the two costs are equal, `x2` is the one that moves.
/// `iterations + 1` steps are done in total.
///
/// The narrowing can pass over a point which was better than every later
/// probe, so the best probe over the whole search is returned rather than
/// the last bracket.
///
pub fn golden_search<C: CostFunction + ?Sized>(
    a: &[FlowRate],
    b: &[FlowRate],
    cost: &C,
    iterations: usize,
) -> Result<f64> {
    check_endpoints(a, b, cost)?;

    let mut p1 = Probe::new(a, b, 1.0 - PHI, cost);
    let mut p2 = Probe::new(a, b, PHI, cost);
    let (mut f_min, mut beta_min) = if p2.f < p1.f {
        (p2.f, p2.beta)
    } else {
        (p1.f, p1.beta)
    };

    for count in (0..=iterations).rev() {
        if p1.f > p2.f {
            // x1 <- x2 + PHI (x2 - x1)
            let beta = p2.beta + PHI * (p2.beta - p1.beta);
            p1.x = reflect(&p2.x, &p1.x);
            p1.f = cost.value(&p1.x);
            p1.beta = beta;
            if p1.f < f_min {
                f_min = p1.f;
                beta_min = p1.beta;
            }
        } else {
            // x2 <- x1 + PHI (x1 - x2)
            let beta = p1.beta + PHI * (p1.beta - p2.beta);
            p2.x = reflect(&p1.x, &p2.x);
            p2.f = cost.value(&p2.x);
            p2.beta = beta;
            if p2.f < f_min {
                f_min = p2.f;
                beta_min = p2.beta;
            }
        }
        if count == 0 {
            break;
        }
        // the probe just kept is the outer one of the next step
        std::mem::swap(&mut p1, &mut p2);
    }

    log::trace!("golden_search f_min={} beta={}", f_min, beta_min);
    Ok(beta_min)
}

/// `center + PHI (center - x)`
fn reflect(center: &[FlowRate], x: &[FlowRate]) -> Vec<FlowRate> {
    center
        .iter()
        .zip(x)
        .map(|(c, xi)| c + PHI * (c - xi))
        .collect()
}

///
/// Naive line search between `a` and `b`.
///
/// Evaluates `a` and then `probes` uniformly spaced points towards `b`
/// (the last one is `b` itself), and returns the position of the minimum.
/// Earlier points win ties.
///
pub fn line_search<C: CostFunction + ?Sized>(
    a: &[FlowRate],
    b: &[FlowRate],
    cost: &C,
    probes: usize,
) -> Result<f64> {
    check_endpoints(a, b, cost)?;
    if probes == 0 {
        return Ok(0.0);
    }
    let n = probes as f64;
    let mut f_min = cost.value(a);
    let mut i_min = 0;
    for i in 1..=probes {
        let x = super::flow::lerp(a, b, i as f64 / n);
        let f = cost.value(&x);
        if f < f_min {
            f_min = f;
            i_min = i;
        }
    }
    Ok(i_min as f64 / n)
}

fn check_endpoints<C: CostFunction + ?Sized>(a: &[FlowRate], b: &[FlowRate], cost: &C) -> Result<()> {
    check_len("line search start", cost.n_vars(), a.len())?;
    check_len("line search end", cost.n_vars(), b.len())
}

//
// tests
//
