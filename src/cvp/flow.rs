//! Flow vector helpers
//! - vector arithmetic on `&[FlowRate]`
//! - validity checks of a flow against a `Network` / `MultiCommoNetwork`
//!
//! A flow is a plain `Vec<FlowRate>`, one entry per arc (single commodity)
//! or per (arc, commodity) pair.
use super::network::{MultiCommoNetwork, Network};
use super::FlowRate;
use itertools::Itertools;
use petgraph::visit::EdgeRef; // for EdgeReference.id()
use petgraph::Direction;
use petgraph::graph::NodeIndex;

/// Default absolute tolerance of validity checks
pub const EPS: FlowRate = 1e-6;

/// inner product `x·y`
pub fn dot(x: &[FlowRate], y: &[FlowRate]) -> FlowRate {
    x.iter().zip_eq(y).map(|(a, b)| a * b).sum()
}

/// `y - x`
pub fn sub(y: &[FlowRate], x: &[FlowRate]) -> Vec<FlowRate> {
    y.iter().zip_eq(x).map(|(b, a)| b - a).collect()
}

/// `a + beta (b - a)`
pub fn lerp(a: &[FlowRate], b: &[FlowRate], beta: f64) -> Vec<FlowRate> {
    a.iter()
        .zip_eq(b)
        .map(|(x, y)| x + beta * (y - x))
        .collect()
}

///
/// Check if the flow is valid, i.e. it satisfies
/// - flows of all arcs are defined
/// - `0 <= flow <= capacity` constraint
/// - flow conservation with the supply of each vertex
///
pub fn is_valid_flow(flow: &[FlowRate], network: &Network, eps: FlowRate) -> bool {
    flow.len() == network.n_arc()
        && is_in_capacity(flow, network, eps)
        && is_satisfying_flow_constraint(flow, network, eps)
}

///
/// For each arc, the flow must satisfy `0 <= flow <= capacity`.
///
pub fn is_in_capacity(flow: &[FlowRate], network: &Network, eps: FlowRate) -> bool {
    network.graph.edge_indices().all(|e| {
        let f = flow[e.index()];
        f >= -eps && f <= network.graph[e].capacity + eps
    })
}

///
/// For each vertex,
/// (the sum of out-going flows) - (the sum of in-coming flows) should be equal to its supply.
///
pub fn is_satisfying_flow_constraint(flow: &[FlowRate], network: &Network, eps: FlowRate) -> bool {
    network.graph.node_indices().all(|v| {
        let excess = excess(&network.graph, v, |e| flow[e]);
        (excess - network.supply(v.index())).abs() <= eps
    })
}

///
/// out-flow minus in-flow of the vertex `v`, with the flow of arc `e` given by `flow_of(e)`
///
pub fn excess<N, E, F>(graph: &petgraph::graph::DiGraph<N, E>, v: NodeIndex, flow_of: F) -> FlowRate
where
    F: Fn(usize) -> FlowRate,
{
    let out_flow: FlowRate = graph
        .edges_directed(v, Direction::Outgoing)
        .map(|er| flow_of(er.id().index()))
        .sum();
    let in_flow: FlowRate = graph
        .edges_directed(v, Direction::Incoming)
        .map(|er| flow_of(er.id().index()))
        .sum();
    out_flow - in_flow
}

///
/// Total flow on each arc, summed over commodities
///
pub fn arc_flows(flow: &[FlowRate], network: &MultiCommoNetwork) -> Vec<FlowRate> {
    let k = network.n_commodity();
    if k == 0 {
        return vec![0.0; network.n_arc()];
    }
    flow.chunks(k).map(|c| c.iter().sum()).collect()
}

///
/// Check if the multi commodity flow is valid, i.e. it satisfies
/// - non-negativity of each commodity flow
/// - aggregate capacity of each arc
/// - per-commodity flow conservation
///
pub fn is_valid_multi_commodity_flow(
    flow: &[FlowRate],
    network: &MultiCommoNetwork,
    eps: FlowRate,
) -> bool {
    if flow.len() != network.n_vars() || flow.iter().any(|&f| f < -eps) {
        return false;
    }
    let in_capacity = arc_flows(flow, network)
        .iter()
        .zip(network.graph.edge_weights())
        .all(|(&y, ew)| y <= ew.capacity + eps);
    let conserved = network.commodities.iter().enumerate().all(|(k, c)| {
        network.graph.node_indices().all(|v| {
            let supply = if c.origin == c.destination {
                0.0
            } else if v.index() == c.origin {
                c.demand
            } else if v.index() == c.destination {
                -c.demand
            } else {
                0.0
            };
            let excess = excess(&network.graph, v, |a| flow[a * network.n_commodity() + k]);
            (excess - supply).abs() <= eps
        })
    });
    in_capacity && conserved
}

//
// tests
//
#[cfg(test)]
mod tests {
    use super::super::mocks::{mock_bottleneck_network, mock_flow_network};
    use super::*;

    #[test]
    fn vector_ops() {
        assert_eq!(dot(&[1.0, 2.0], &[3.0, 4.0]), 11.0);
        assert_eq!(sub(&[3.0, 4.0], &[1.0, 1.0]), vec![2.0, 3.0]);
        assert_eq!(lerp(&[0.0, 10.0], &[10.0, 0.0], 0.25), vec![2.5, 7.5]);
    }

    #[test]
    fn flow_valid_tests() {
        // 0 -> 1 -> 2 and 0 -> 2, 5 units from 0 to 2
        let net = mock_flow_network();

        // this is valid flow
        let f1 = vec![2.0, 2.0, 3.0];
        assert!(is_in_capacity(&f1, &net, EPS));
        assert!(is_satisfying_flow_constraint(&f1, &net, EPS));
        assert!(is_valid_flow(&f1, &net, EPS));

        // this flow overs the capacity
        let f2 = vec![100.0, 100.0, -95.0];
        assert!(!is_in_capacity(&f2, &net, EPS));
        assert!(is_satisfying_flow_constraint(&f2, &net, EPS));
        assert!(!is_valid_flow(&f2, &net, EPS));

        // this is a flow which not satisfies the flow constraint
        let f3 = vec![1.0, 2.0, 3.0];
        assert!(is_in_capacity(&f3, &net, EPS));
        assert!(!is_satisfying_flow_constraint(&f3, &net, EPS));
        assert!(!is_valid_flow(&f3, &net, EPS));

        // this is a partial flow
        assert!(!is_valid_flow(&[1.0], &net, EPS));
    }

    #[test]
    fn multi_commodity_flow_valid_tests() {
        let net = mock_bottleneck_network();
        let k = net.n_commodity();
        // every commodity takes its detour
        let mut flow = vec![0.0; net.n_vars()];
        flow[4 * k] = 6.0;
        flow[5 * k + 1] = 6.0;
        assert!(is_valid_multi_commodity_flow(&flow, &net, EPS));
        assert_eq!(arc_flows(&flow, &net)[2], 0.0);

        // both commodities through the bottleneck of capacity 8
        let mut flow = vec![0.0; net.n_vars()];
        flow[0] = 6.0;
        flow[k + 1] = 6.0;
        for a in [2, 3] {
            flow[a * k] = 6.0;
            flow[a * k + 1] = 6.0;
        }
        assert_eq!(arc_flows(&flow, &net)[2], 12.0);
        assert!(!is_valid_multi_commodity_flow(&flow, &net, EPS));
    }
}
