//! Fluid solver adapter that moves the fluid mesh before every flow solve.

use nalgebra::DVector;

use crate::error::{FsiError, Result};
use crate::interface::InterfaceCoupling;
use crate::mesh_motion::{MeshMotion, MeshState};
use crate::solvers::FluidSolver;

/// Flow solve on an already deformed mesh.
pub trait FlowSolver<const D: usize> {
    /// Solves the flow on `mesh` at `time` and returns the interface traction.
    fn solve_on_mesh(&mut self, mesh: &MeshState<D>, time: f64) -> Result<DVector<f64>>;

    /// Commits the converged state of the time step.
    fn finish_time_step(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Composes interface transfer, mesh motion and a flow solver into a [`FluidSolver`].
#[derive(Clone, Debug)]
pub struct AleFluid<F, const D: usize> {
    mesh_motion: MeshMotion<D>,
    structure_to_ale: InterfaceCoupling<D>,
    flow: F,
    mesh: Option<MeshState<D>>,
}

impl<F: FlowSolver<D>, const D: usize> AleFluid<F, D> {
    /// Builds the adapter; `structure_to_ale` must target the mesh interface nodes.
    pub fn new(
        mesh_motion: MeshMotion<D>,
        structure_to_ale: InterfaceCoupling<D>,
        flow: F,
    ) -> Result<Self> {
        let interface_nodes = mesh_motion.graph().interface_nodes().len();
        if structure_to_ale.target_len() != interface_nodes {
            return Err(FsiError::dimension_mismatch(
                "ALE interface nodes",
                interface_nodes,
                structure_to_ale.target_len(),
            ));
        }
        Ok(Self {
            mesh_motion,
            structure_to_ale,
            flow,
            mesh: None,
        })
    }

    /// Mesh state of the most recent fluid solve.
    pub fn mesh(&self) -> Option<&MeshState<D>> {
        self.mesh.as_ref()
    }

    /// Access to the wrapped flow solver.
    pub fn flow(&self) -> &F {
        &self.flow
    }
}

impl<F: FlowSolver<D>, const D: usize> FluidSolver<DVector<f64>> for AleFluid<F, D> {
    fn solve(&mut self, displacement: &DVector<f64>, time: f64) -> Result<DVector<f64>> {
        let ale_displacement = self.structure_to_ale.transfer(displacement)?;
        let mesh = self.mesh_motion.move_mesh(&ale_displacement)?;
        let traction = self.flow.solve_on_mesh(&mesh, time)?;
        self.mesh = Some(mesh);
        Ok(traction)
    }

    fn finish_time_step(&mut self) -> Result<()> {
        self.flow.finish_time_step()
    }
}
