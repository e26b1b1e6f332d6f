//!
//! Mock networks for tests and the demo binary.
//!
use super::network::{MultiCommoNetwork, Network};

/// mock network generation functions
///
/// ```text
/// 0 --e0--> 1 --e1--> 2
///  \-------e2-------->/
/// ```
///
/// every arc has capacity 10, and 5 units are sent from 0 to 2.
pub fn mock_flow_network() -> Network {
    build_network(
        3,
        &[(0, 1, 10.0, 1.0), (1, 2, 10.0, 1.0), (0, 2, 10.0, 3.0)],
        (0, 2, 5.0),
    )
}

/// single arc `0 -> 1` of capacity `capacity` carrying `demand` units
pub fn mock_single_arc_network(capacity: f64, demand: f64) -> Network {
    build_network(2, &[(0, 1, capacity, 1.0)], (0, 1, demand))
}

///
/// Two commodities sharing a bottleneck arc e2 of capacity 8.
///
/// ```text
/// 0 --e0--\              /--e4 (detour, cost 10)--> 4
///          2 --e2--> 3 --e3--> 4
/// 1 --e1--/              \--e5 (detour, cost 10)--> 4 (from 1)
/// ```
///
/// arcs (tail, head, capacity, cost):
/// e0 (0,2,100,1) e1 (1,2,100,1) e2 (2,3,8,1) e3 (3,4,100,1)
/// e4 (0,4,100,10) e5 (1,4,100,10)
///
/// commodities: 6 units 0 -> 4, and 6 units 1 -> 4.
/// Both shortest paths use the bottleneck.
///
pub fn mock_bottleneck_network() -> MultiCommoNetwork {
    let mut net = MultiCommoNetwork::new(5);
    for &(tail, head, capacity, cost) in &[
        (0, 2, 100.0, 1.0),
        (1, 2, 100.0, 1.0),
        (2, 3, 8.0, 1.0),
        (3, 4, 100.0, 1.0),
        (0, 4, 100.0, 10.0),
        (1, 4, 100.0, 10.0),
    ] {
        net.add_arc(tail, head, capacity, cost)
            .expect("mock arc is valid");
    }
    net.add_commodity(0, 4, 6.0).expect("mock commodity is valid");
    net.add_commodity(1, 4, 6.0).expect("mock commodity is valid");
    net
}

///
/// Two parallel arcs `0 -> 1` of capacity 8 (e0) and 4 (e1),
/// one commodity of 10 units.
///
/// Under Kleinrock delay the shortest path at zero flow is e0, and routing
/// everything on it saturates the arc.
///
pub fn mock_parallel_network() -> MultiCommoNetwork {
    let mut net = MultiCommoNetwork::new(2);
    net.add_arc(0, 1, 8.0, 1.0).expect("mock arc is valid");
    net.add_arc(0, 1, 4.0, 1.0).expect("mock arc is valid");
    net.add_commodity(0, 1, 10.0)
        .expect("mock commodity is valid");
    net
}

fn build_network(
    n_vertex: usize,
    arcs: &[(usize, usize, f64, f64)],
    demand: (usize, usize, f64),
) -> Network {
    let mut net = Network::new(n_vertex);
    for &(tail, head, capacity, cost) in arcs {
        net.add_arc(tail, head, capacity, cost)
            .expect("mock arc is valid");
    }
    let (origin, destination, amount) = demand;
    net.add_demand(origin, destination, amount)
        .expect("mock demand is valid");
    net
}
