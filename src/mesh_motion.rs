//! Arbitrary Lagrangian–Eulerian mesh motion driven by the interface displacement.
//!
//! Both strategies solve a linear, symmetric positive-definite problem on the
//! reference mesh: interface nodes follow the prescribed displacement, fixed
//! nodes stay in place and the remaining nodes are smoothed in between. The
//! operators are assembled and factorized once; every call to
//! [`MeshMotion::move_mesh`] is a pair of triangular solves.

use nalgebra::linalg::Cholesky;
use nalgebra::{DMatrix, DVector, Dyn, Point, SMatrix, SVector};
use serde::Serialize;

use crate::error::{FsiError, Result};

/// Node graph of the fluid mesh with its boundary classification.
#[derive(Clone, Debug)]
pub struct MeshGraph<const D: usize> {
    nodes: Vec<Point<f64, D>>,
    edges: Vec<(usize, usize)>,
    interface_nodes: Vec<usize>,
    fixed_nodes: Vec<usize>,
}

impl<const D: usize> MeshGraph<D> {
    /// Validates node indices and edge lengths.
    pub fn new(
        nodes: Vec<Point<f64, D>>,
        edges: Vec<(usize, usize)>,
        interface_nodes: Vec<usize>,
        fixed_nodes: Vec<usize>,
    ) -> Result<Self> {
        let n = nodes.len();
        let mut role = vec![NodeRole::Free; n];
        for (list, kind) in [
            (&interface_nodes, NodeRole::Interface),
            (&fixed_nodes, NodeRole::Fixed),
        ] {
            for &node in list.iter() {
                if node >= n {
                    return Err(FsiError::dimension_mismatch("boundary node index", n, node));
                }
                if role[node] != NodeRole::Free {
                    return Err(FsiError::configuration(
                        "mesh boundary",
                        format!("node {node} is listed twice"),
                    ));
                }
                role[node] = kind;
            }
        }
        for &(a, b) in &edges {
            if a >= n || b >= n {
                return Err(FsiError::dimension_mismatch("edge node index", n, a.max(b)));
            }
            if (nodes[b] - nodes[a]).norm() == 0.0 {
                return Err(FsiError::configuration(
                    "mesh edges",
                    format!("edge ({a}, {b}) has zero length"),
                ));
            }
        }
        Ok(Self {
            nodes,
            edges,
            interface_nodes,
            fixed_nodes,
        })
    }

    /// Reference node coordinates.
    pub fn nodes(&self) -> &[Point<f64, D>] {
        &self.nodes
    }

    /// Nodes following the interface displacement, in interface field order.
    pub fn interface_nodes(&self) -> &[usize] {
        &self.interface_nodes
    }

    /// Coordinates of the interface nodes, in interface field order.
    pub fn interface_points(&self) -> Vec<Point<f64, D>> {
        self.interface_nodes.iter().map(|&i| self.nodes[i]).collect()
    }

    fn roles(&self) -> Vec<NodeRole> {
        let mut role = vec![NodeRole::Free; self.nodes.len()];
        for &node in &self.interface_nodes {
            role[node] = NodeRole::Interface;
        }
        for &node in &self.fixed_nodes {
            role[node] = NodeRole::Fixed;
        }
        role
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum NodeRole {
    Free,
    Interface,
    Fixed,
}

/// Displacement and deformed coordinates of every mesh node.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MeshState<const D: usize> {
    /// Node displacements, `D` components per node.
    pub displacement: DVector<f64>,
    /// Deformed node coordinates.
    pub positions: Vec<Point<f64, D>>,
}

/// Mesh motion strategy.
#[derive(Clone, Debug)]
pub enum MeshMotion<const D: usize> {
    Poisson(PoissonMotion<D>),
    Elasticity(ElasticityMotion<D>),
}

impl<const D: usize> MeshMotion<D> {
    /// Deforms the mesh so that interface nodes follow `interface_displacement`.
    pub fn move_mesh(&self, interface_displacement: &DVector<f64>) -> Result<MeshState<D>> {
        match self {
            MeshMotion::Poisson(motion) => motion.operator.solve(interface_displacement),
            MeshMotion::Elasticity(motion) => motion.operator.solve(interface_displacement),
        }
    }

    /// Underlying mesh graph.
    pub fn graph(&self) -> &MeshGraph<D> {
        match self {
            MeshMotion::Poisson(motion) => &motion.operator.graph,
            MeshMotion::Elasticity(motion) => &motion.operator.graph,
        }
    }
}

/// Component-wise Laplace smoothing with edge weights `1 / length`.
#[derive(Clone, Debug)]
pub struct PoissonMotion<const D: usize> {
    operator: MotionOperator<D>,
}

impl<const D: usize> PoissonMotion<D> {
    pub fn new(graph: MeshGraph<D>) -> Result<Self> {
        let operator = MotionOperator::new(graph, |_, length| {
            SMatrix::<f64, D, D>::identity() / length
        })?;
        Ok(Self { operator })
    }
}

/// Linear elastic spring network parameterized by Young's modulus and Poisson's ratio.
///
/// An edge of direction `n` and length `l` contributes `(mu I + (lambda + mu) n n^T) / l`.
#[derive(Clone, Debug)]
pub struct ElasticityMotion<const D: usize> {
    operator: MotionOperator<D>,
    lambda: f64,
    mu: f64,
}

impl<const D: usize> ElasticityMotion<D> {
    pub fn new(graph: MeshGraph<D>, youngs_modulus: f64, poisson_ratio: f64) -> Result<Self> {
        if !(youngs_modulus > 0.0) {
            return Err(FsiError::configuration(
                "youngs_modulus",
                format!("must be positive, found {youngs_modulus}"),
            ));
        }
        if !(poisson_ratio > -1.0 && poisson_ratio < 0.5) {
            return Err(FsiError::configuration(
                "poisson_ratio",
                format!("must lie in (-1, 0.5), found {poisson_ratio}"),
            ));
        }
        let mu = youngs_modulus / (2.0 * (1.0 + poisson_ratio));
        let lambda =
            youngs_modulus * poisson_ratio / ((1.0 + poisson_ratio) * (1.0 - 2.0 * poisson_ratio));
        let operator = MotionOperator::new(graph, |direction, length| {
            (SMatrix::<f64, D, D>::identity() * mu
                + direction * direction.transpose() * (lambda + mu))
                / length
        })?;
        Ok(Self {
            operator,
            lambda,
            mu,
        })
    }

    /// Lamé parameters `(lambda, mu)`.
    pub fn lame_parameters(&self) -> (f64, f64) {
        (self.lambda, self.mu)
    }
}

#[derive(Clone, Debug)]
struct MotionOperator<const D: usize> {
    graph: MeshGraph<D>,
    free_dofs: Vec<usize>,
    interface_dofs: Vec<usize>,
    free_free: Option<Cholesky<f64, Dyn>>,
    free_interface: DMatrix<f64>,
}

impl<const D: usize> MotionOperator<D> {
    fn new<B>(graph: MeshGraph<D>, edge_block: B) -> Result<Self>
    where
        B: Fn(&SVector<f64, D>, f64) -> SMatrix<f64, D, D>,
    {
        let n_dofs = graph.nodes.len() * D;
        let mut stiffness = DMatrix::zeros(n_dofs, n_dofs);
        for &(a, b) in &graph.edges {
            let edge = graph.nodes[b] - graph.nodes[a];
            let length = edge.norm();
            let block = edge_block(&(edge / length), length);
            for row in 0..D {
                for col in 0..D {
                    let value = block[(row, col)];
                    stiffness[(a * D + row, a * D + col)] += value;
                    stiffness[(b * D + row, b * D + col)] += value;
                    stiffness[(a * D + row, b * D + col)] -= value;
                    stiffness[(b * D + row, a * D + col)] -= value;
                }
            }
        }

        let roles = graph.roles();
        let free_dofs: Vec<usize> = (0..n_dofs)
            .filter(|dof| roles[dof / D] == NodeRole::Free)
            .collect();
        let interface_dofs: Vec<usize> = graph
            .interface_nodes
            .iter()
            .flat_map(|&node| (0..D).map(move |component| node * D + component))
            .collect();

        let free_free = if free_dofs.is_empty() {
            None
        } else {
            let block = stiffness.select_rows(&free_dofs).select_columns(&free_dofs);
            // A free node without edges leaves a zero pivot.
            if block.diagonal().iter().any(|&pivot| !(pivot > 0.0)) {
                return Err(FsiError::singular("mesh motion operator"));
            }
            Some(Cholesky::new(block).ok_or_else(|| FsiError::singular("mesh motion operator"))?)
        };
        let free_interface = stiffness
            .select_rows(&free_dofs)
            .select_columns(&interface_dofs);

        Ok(Self {
            graph,
            free_dofs,
            interface_dofs,
            free_free,
            free_interface,
        })
    }

    fn solve(&self, interface_displacement: &DVector<f64>) -> Result<MeshState<D>> {
        if interface_displacement.len() != self.interface_dofs.len() {
            return Err(FsiError::dimension_mismatch(
                "mesh interface displacement",
                self.interface_dofs.len(),
                interface_displacement.len(),
            ));
        }

        let mut displacement = DVector::zeros(self.graph.nodes.len() * D);
        for (value, &dof) in interface_displacement.iter().zip(&self.interface_dofs) {
            displacement[dof] = *value;
        }
        if let Some(factor) = &self.free_free {
            let rhs = -(&self.free_interface * interface_displacement);
            let interior = factor.solve(&rhs);
            for (value, &dof) in interior.iter().zip(&self.free_dofs) {
                displacement[dof] = *value;
            }
        }

        let positions = self
            .graph
            .nodes
            .iter()
            .enumerate()
            .map(|(node, point)| {
                let offset = SVector::<f64, D>::from_fn(|component, _| {
                    displacement[node * D + component]
                });
                point + offset
            })
            .collect();

        Ok(MeshState {
            displacement,
            positions,
        })
    }
}
