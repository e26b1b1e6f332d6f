//!
//! utils
//!
use super::FlowRate;
use itertools::Itertools;
use petgraph::dot::Dot;
use petgraph::graph::Graph;
use petgraph::EdgeType;

///
/// check if the function `f` is convex or not
/// in the domain `[x_min, x_max]`
///
/// it samples `n` + 1 uniformly spaced points and checks that the slope
/// between consecutive points is (weakly) increasing, up to `eps`.
///
pub fn is_convex<F: Fn(f64) -> f64>(f: F, x_min: f64, x_max: f64, n: usize) -> bool {
    if n == 0 {
        return true;
    }
    let h = (x_max - x_min) / n as f64;
    let eps = 1e-9;
    (0..=n)
        .map(|i| f(x_min + h * i as f64))
        .tuple_windows()
        .map(|(y0, y1)| (y1 - y0) / h)
        .tuple_windows()
        .all(|(d0, d1)| d1 >= d0 - eps * (1.0 + d0.abs()))
}

///
/// dump the graph in dot format to the log
///
pub fn draw<'a, N: 'a, E: 'a, Ty, Ix>(graph: &'a Graph<N, E, Ty, Ix>)
where
    E: std::fmt::Debug,
    N: std::fmt::Debug,
    Ty: EdgeType,
    Ix: petgraph::graph::IndexType,
{
    log::debug!("{:?}", Dot::with_config(&graph, &[]));
}

///
/// dump the graph in dot format with the flow of each edge to the log
///
/// `flow` is indexed by the edge index.
///
pub fn draw_with_flow<N, E, Ty, Ix>(graph: &Graph<N, E, Ty, Ix>, flow: &[FlowRate])
where
    E: std::fmt::Display,
    Ty: EdgeType,
    Ix: petgraph::graph::IndexType,
{
    let labeled = graph.map(
        |_, _| (),
        |e, ew| match flow.get(e.index()) {
            Some(f) => format!("{} flow={:.4}", ew, f),
            None => format!("{} flow=?", ew),
        },
    );
    log::debug!("{:?}", Dot::with_config(&labeled, &[]));
}

#[cfg(test)]
mod tests {
    use super::super::function::{ArcCost, ArcCostFunction, CostFunction};
    use super::super::mocks::mock_flow_network;
    use super::*;

    #[test]
    fn is_convex_test() {
        assert!(is_convex(|x| (x - 10.0).powi(2), 0.0, 20.0, 20));
        assert!(!is_convex(|x| -(x - 10.0).powi(2), 0.0, 20.0, 20));
        assert!(is_convex(|x| 2.0 * x + 1.0, 0.0, 20.0, 20));
        // kleinrock delay of an arc with capacity 10
        assert!(is_convex(|x| x / (10.0 - x), 0.0, 9.9, 100));
    }

    #[test]
    fn arc_cost_is_convex() {
        let f = ArcCostFunction::uniform(1, ArcCost::new(|x| x.powi(4), |x| 4.0 * x.powi(3)));
        assert!(is_convex(|x| f.value(&[x]), -3.0, 3.0, 60));
    }

    #[test]
    fn draw_does_not_panic() {
        let net = mock_flow_network();
        draw(&net.graph);
        draw_with_flow(&net.graph, &[2.0, 2.0, 3.0]);
        // a short flow is labeled as unknown
        draw_with_flow(&net.graph, &[]);
    }
}
