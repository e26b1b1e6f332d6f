//!
//! Constraint system of the proxy problems, and its generators from networks.
//!
//! * `SingleCommodity`: flow conservation of each vertex, `0 <= x_e <= u_e`
//! * `MultiCommodity`: flow conservation of each (vertex, commodity),
//!   `x_ek >= 0` and `sum_k x_ek <= u_e`
//! * `Kleinrock`: `MultiCommodity`, plus the second order cones linking the
//!   aggregate flow to the delay of each arc
//!
use super::error::{CvpError, Result};
use super::network::{MultiCommoNetwork, Network};
use super::proxy::{ProxyObjective, ProxyObjectiveStrategy};
use super::{Cost, FlowRate};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use std::collections::BTreeMap;
use std::ops::Range;

///
/// `coefficients · z (=|<=) rhs`, or a component `rhs - coefficients · z` of a cone.
///
#[derive(Debug, Clone, PartialEq)]
pub struct LinearRow {
    /// sparse `(variable, coefficient)`, sorted by variable
    pub coefficients: Vec<(usize, f64)>,
    pub rhs: f64,
}

impl LinearRow {
    /// Merge duplicated variables and drop zero coefficients.
    pub fn new<I: IntoIterator<Item = (usize, f64)>>(terms: I, rhs: f64) -> LinearRow {
        let mut merged: BTreeMap<usize, f64> = BTreeMap::new();
        for (i, a) in terms {
            *merged.entry(i).or_insert(0.0) += a;
        }
        LinearRow {
            coefficients: merged.into_iter().filter(|&(_, a)| a != 0.0).collect(),
            rhs,
        }
    }
    /// `coefficients · z`. Variables beyond `z.len()` count as zero.
    pub fn activity(&self, z: &[f64]) -> f64 {
        self.coefficients
            .iter()
            .map(|&(i, a)| a * z.get(i).copied().unwrap_or(0.0))
            .sum()
    }
    fn max_var(&self) -> Option<usize> {
        self.coefficients.last().map(|&(i, _)| i)
    }
}

///
/// Second order cone `s_0 >= ||(s_1, .., s_m)||` with `s_i = rows[i].rhs - rows[i].coefficients · z`
///
#[derive(Debug, Clone, PartialEq)]
pub struct ConeBlock {
    pub rows: Vec<LinearRow>,
}

///
/// Linear equalities, linear inequalities and second order cones over
/// `n_vars` flow variables followed by `n_aux` auxiliary variables.
///
/// Generated once from a network and then only read by the solver,
/// except that auxiliary variables and cones can be appended.
///
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConstraintSystem {
    n_vars: usize,
    n_aux: usize,
    equalities: Vec<LinearRow>,
    inequalities: Vec<LinearRow>,
    cones: Vec<ConeBlock>,
}

impl ConstraintSystem {
    pub fn new(n_vars: usize) -> ConstraintSystem {
        ConstraintSystem {
            n_vars,
            ..Default::default()
        }
    }
    /// number of flow variables
    pub fn n_vars(&self) -> usize {
        self.n_vars
    }
    /// number of auxiliary variables
    pub fn n_aux(&self) -> usize {
        self.n_aux
    }
    /// number of all variables
    pub fn n_total(&self) -> usize {
        self.n_vars + self.n_aux
    }
    /// Append `n` auxiliary variables and return their indices.
    pub fn add_aux(&mut self, n: usize) -> Range<usize> {
        let start = self.n_total();
        self.n_aux += n;
        start..self.n_total()
    }
    /// `row · z = rhs`
    pub fn add_equality(&mut self, row: LinearRow) -> Result<()> {
        self.check_row(&row)?;
        self.equalities.push(row);
        Ok(())
    }
    /// `row · z <= rhs`
    pub fn add_inequality(&mut self, row: LinearRow) -> Result<()> {
        self.check_row(&row)?;
        self.inequalities.push(row);
        Ok(())
    }
    pub fn add_cone(&mut self, cone: ConeBlock) -> Result<()> {
        if cone.rows.len() < 2 {
            return Err(CvpError::validation(
                "cone dimension",
                "at least 2",
                cone.rows.len(),
            ));
        }
        for row in cone.rows.iter() {
            self.check_row(row)?;
        }
        self.cones.push(cone);
        Ok(())
    }
    pub fn equalities(&self) -> &[LinearRow] {
        &self.equalities
    }
    pub fn inequalities(&self) -> &[LinearRow] {
        &self.inequalities
    }
    pub fn cones(&self) -> &[ConeBlock] {
        &self.cones
    }
    ///
    /// Largest violation of the linear constraints by `x`,
    /// each scaled by `1 + |rhs|`. Cones are not checked.
    ///
    pub fn violation(&self, x: &[FlowRate]) -> f64 {
        let eq = self
            .equalities
            .iter()
            .map(|row| (row.activity(x) - row.rhs).abs() / (1.0 + row.rhs.abs()));
        let ineq = self
            .inequalities
            .iter()
            .map(|row| (row.activity(x) - row.rhs).max(0.0) / (1.0 + row.rhs.abs()));
        eq.chain(ineq).fold(0.0, f64::max)
    }
    pub fn is_feasible(&self, x: &[FlowRate], tolerance: f64) -> bool {
        self.violation(x) <= tolerance
    }
    fn check_row(&self, row: &LinearRow) -> Result<()> {
        match row.max_var() {
            Some(i) if i >= self.n_total() => Err(CvpError::validation(
                "constraint variable",
                format!("index < {}", self.n_total()),
                i,
            )),
            _ => Ok(()),
        }
    }
}

///
/// Translates a network topology into a constraint system.
///
pub trait ConstraintGenerator {
    /// number of flow variables
    fn n_vars(&self) -> usize;
    fn generate_network_constraints(&self) -> Result<ConstraintSystem>;
}

//
// Single commodity
//

///
/// Single commodity network as a convex program
///
#[derive(Debug, Clone, Copy)]
pub struct SingleCommodity<'a> {
    pub network: &'a Network,
}

impl<'a> SingleCommodity<'a> {
    pub fn new(network: &'a Network) -> SingleCommodity<'a> {
        SingleCommodity { network }
    }
    /// base cost of each arc
    pub fn base_costs(&self) -> Vec<Cost> {
        self.network.graph.edge_weights().map(|ew| ew.cost).collect()
    }
}

impl<'a> ConstraintGenerator for SingleCommodity<'a> {
    fn n_vars(&self) -> usize {
        self.network.n_arc()
    }
    fn generate_network_constraints(&self) -> Result<ConstraintSystem> {
        let graph = &self.network.graph;
        let mut cs = ConstraintSystem::new(self.n_vars());

        // out-flow - in-flow = supply
        for v in graph.node_indices() {
            let out_terms = graph
                .edges_directed(v, Direction::Outgoing)
                .map(|er| (er.id().index(), 1.0));
            let in_terms = graph
                .edges_directed(v, Direction::Incoming)
                .map(|er| (er.id().index(), -1.0));
            cs.add_equality(LinearRow::new(
                out_terms.chain(in_terms),
                self.network.supply(v.index()),
            ))?;
        }

        // 0 <= x_e <= u_e
        for e in graph.edge_indices() {
            cs.add_inequality(LinearRow::new([(e.index(), 1.0)], graph[e].capacity))?;
            cs.add_inequality(LinearRow::new([(e.index(), -1.0)], 0.0))?;
        }

        Ok(cs)
    }
}

impl<'a> ProxyObjectiveStrategy for SingleCommodity<'a> {
    fn initial_solution(&self) -> Vec<FlowRate> {
        vec![0.0; self.n_vars()]
    }
    ///
    /// The base cost of each arc, i.e. a (linear) min-cost-flow problem.
    ///
    fn initial_proxy(&self, _anchor: &[FlowRate]) -> ProxyObjective {
        ProxyObjective::linear(self.base_costs())
    }
}

//
// Multi commodity
//

///
/// Multi commodity network as a convex program
///
#[derive(Debug, Clone, Copy)]
pub struct MultiCommodity<'a> {
    pub network: &'a MultiCommoNetwork,
}

impl<'a> MultiCommodity<'a> {
    pub fn new(network: &'a MultiCommoNetwork) -> MultiCommodity<'a> {
        MultiCommodity { network }
    }
    /// base cost of each arc, repeated for each commodity
    pub fn base_costs(&self) -> Vec<Cost> {
        let k = self.network.n_commodity();
        self.network
            .graph
            .edge_weights()
            .flat_map(|ew| std::iter::repeat(ew.cost).take(k))
            .collect()
    }
    /// supply of the vertex `v` in the commodity `k`
    fn supply(&self, v: usize, k: usize) -> FlowRate {
        let c = &self.network.commodities[k];
        if c.origin == c.destination {
            0.0
        } else if v == c.origin {
            c.demand
        } else if v == c.destination {
            -c.demand
        } else {
            0.0
        }
    }
}

impl<'a> ConstraintGenerator for MultiCommodity<'a> {
    fn n_vars(&self) -> usize {
        self.network.n_vars()
    }
    fn generate_network_constraints(&self) -> Result<ConstraintSystem> {
        let net = self.network;
        let graph = &net.graph;
        let mut cs = ConstraintSystem::new(self.n_vars());

        // per commodity: out-flow - in-flow = supply
        for k in 0..net.n_commodity() {
            for v in graph.node_indices() {
                let out_terms = graph
                    .edges_directed(v, Direction::Outgoing)
                    .map(|er| (net.var(er.id(), k), 1.0));
                let in_terms = graph
                    .edges_directed(v, Direction::Incoming)
                    .map(|er| (net.var(er.id(), k), -1.0));
                cs.add_equality(LinearRow::new(
                    out_terms.chain(in_terms),
                    self.supply(v.index(), k),
                ))?;
            }
        }

        // x_ek >= 0
        for i in 0..self.n_vars() {
            cs.add_inequality(LinearRow::new([(i, -1.0)], 0.0))?;
        }

        // sum_k x_ek <= u_e couples the commodities
        for e in graph.edge_indices() {
            let terms = (0..net.n_commodity()).map(|k| (net.var(e, k), 1.0));
            cs.add_inequality(LinearRow::new(terms, graph[e].capacity))?;
        }

        Ok(cs)
    }
}

impl<'a> ProxyObjectiveStrategy for MultiCommodity<'a> {
    fn initial_solution(&self) -> Vec<FlowRate> {
        vec![0.0; self.n_vars()]
    }
}

//
// Kleinrock
//

///
/// Multi commodity network with Kleinrock delay `sum_e y_e / (u_e - y_e)`.
///
/// The network constraints are the ones of `MultiCommodity`. The delay is
/// expressed by `cap_constraints`, which adds a delay variable `t_e` for each
/// arc and the cone
///
/// ```text
/// (t_e + 1 + s_e, t_e + 1 - s_e, 2 sqrt(u_e)) in SOC,  s_e = u_e - y_e
/// ```
///
/// equivalent to `(t_e + 1) s_e >= u_e` with `s_e > 0`, i.e. `t_e >= y_e / (u_e - y_e)`.
///
#[derive(Debug, Clone, Copy)]
pub struct Kleinrock<'a> {
    inner: MultiCommodity<'a>,
}

impl<'a> Kleinrock<'a> {
    pub fn new(network: &'a MultiCommoNetwork) -> Kleinrock<'a> {
        Kleinrock {
            inner: MultiCommodity::new(network),
        }
    }
    pub fn network(&self) -> &'a MultiCommoNetwork {
        self.inner.network
    }
    ///
    /// Append the delay variables and cones to `cs`.
    /// Returns the indices of the delay variables, one per arc.
    ///
    pub fn cap_constraints(&self, cs: &mut ConstraintSystem) -> Result<Range<usize>> {
        let net = self.inner.network;
        let delays = cs.add_aux(net.n_arc());
        for (e, t) in net.graph.edge_indices().zip(delays.clone()) {
            let u = net.graph[e].capacity;
            let flows: Vec<usize> = (0..net.n_commodity()).map(|k| net.var(e, k)).collect();
            // rhs - a·z = t + 1 + (u - y)
            let first = LinearRow::new(
                std::iter::once((t, -1.0)).chain(flows.iter().map(|&i| (i, 1.0))),
                1.0 + u,
            );
            // rhs - a·z = t + 1 - (u - y)
            let second = LinearRow::new(
                std::iter::once((t, -1.0)).chain(flows.iter().map(|&i| (i, -1.0))),
                1.0 - u,
            );
            let third = LinearRow::new([], 2.0 * u.sqrt());
            cs.add_cone(ConeBlock {
                rows: vec![first, second, third],
            })?;
        }
        Ok(delays)
    }
}

impl<'a> ConstraintGenerator for Kleinrock<'a> {
    fn n_vars(&self) -> usize {
        self.inner.n_vars()
    }
    fn generate_network_constraints(&self) -> Result<ConstraintSystem> {
        self.inner.generate_network_constraints()
    }
}

impl<'a> ProxyObjectiveStrategy for Kleinrock<'a> {
    fn initial_solution(&self) -> Vec<FlowRate> {
        self.inner.initial_solution()
    }
    fn initial_proxy(&self, anchor: &[FlowRate]) -> ProxyObjective {
        self.inner.initial_proxy(anchor)
    }
}

//
// tests
//

#[cfg(test)]
mod tests {
    use super::super::mocks::{mock_bottleneck_network, mock_flow_network};
    use super::*;

    #[test]
    fn linear_row_merges_terms() {
        let row = LinearRow::new([(2, 1.0), (0, 1.0), (2, -1.0), (1, 3.0)], 4.0);
        assert_eq!(row.coefficients, vec![(0, 1.0), (1, 3.0)]);
        assert_eq!(row.activity(&[1.0, 1.0]), 4.0);
    }

    #[test]
    fn rows_must_refer_to_known_variables() {
        let mut cs = ConstraintSystem::new(2);
        assert!(cs.add_equality(LinearRow::new([(2, 1.0)], 0.0)).is_err());
        let aux = cs.add_aux(1);
        assert_eq!(aux, 2..3);
        assert!(cs.add_equality(LinearRow::new([(2, 1.0)], 0.0)).is_ok());
        assert!(cs
            .add_cone(ConeBlock {
                rows: vec![LinearRow::new([], 1.0)]
            })
            .is_err());
    }

    #[test]
    fn single_commodity_constraints() {
        let net = mock_flow_network();
        let cs = SingleCommodity::new(&net)
            .generate_network_constraints()
            .unwrap();
        assert_eq!(cs.n_vars(), 3);
        assert_eq!(cs.equalities().len(), net.n_vertex());
        assert_eq!(cs.inequalities().len(), 2 * net.n_arc());
        // flow is conserved globally
        let total: f64 = cs.equalities().iter().map(|row| row.rhs).sum();
        assert_eq!(total, 0.0);

        assert!(cs.is_feasible(&[2.0, 2.0, 3.0], 1e-9));
        assert!(!cs.is_feasible(&[1.0, 2.0, 3.0], 1e-9));
        assert!(!cs.is_feasible(&[-1.0, -1.0, 6.0], 1e-9));
        assert!((cs.violation(&[0.0, 0.0, 11.0]) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn multi_commodity_constraints() {
        let net = mock_bottleneck_network();
        let cs = MultiCommodity::new(&net)
            .generate_network_constraints()
            .unwrap();
        assert_eq!(cs.n_vars(), net.n_vars());
        assert_eq!(
            cs.equalities().len(),
            net.n_vertex() * net.n_commodity()
        );
        assert_eq!(cs.inequalities().len(), net.n_vars() + net.n_arc());
        let total: f64 = cs.equalities().iter().map(|row| row.rhs).sum();
        assert_eq!(total, 0.0);
        // aggregate capacity row of the bottleneck
        let row = &cs.inequalities()[net.n_vars() + 2];
        assert_eq!(row.coefficients, vec![(4, 1.0), (5, 1.0)]);
        assert_eq!(row.rhs, 8.0);
    }

    #[test]
    fn kleinrock_cones() {
        let net = mock_bottleneck_network();
        let kl = Kleinrock::new(&net);
        let mut cs = kl.generate_network_constraints().unwrap();
        assert_eq!(cs, MultiCommodity::new(&net).generate_network_constraints().unwrap());
        let delays = kl.cap_constraints(&mut cs).unwrap();
        assert_eq!(delays, net.n_vars()..net.n_vars() + net.n_arc());
        assert_eq!(cs.cones().len(), net.n_arc());

        // y = 4 on the bottleneck (u = 8), t = y / (u - y) = 1 is on the cone boundary
        let mut z = vec![0.0; cs.n_total()];
        z[4] = 2.0;
        z[5] = 2.0;
        z[delays.start + 2] = 1.0;
        let s: Vec<f64> = cs.cones()[2]
            .rows
            .iter()
            .map(|row| row.rhs - row.activity(&z))
            .collect();
        assert!((s[0] * s[0] - s[1] * s[1] - s[2] * s[2]).abs() < 1e-9);
        assert!(s[0] > 0.0);
    }
}
