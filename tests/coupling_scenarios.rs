use approx::assert_relative_eq;
use fsirs::ale::{AleFluid, FlowSolver};
use fsirs::interface::InterfaceCoupling;
use fsirs::mesh_motion::{MeshGraph, MeshMotion, MeshState, PoissonMotion};
use fsirs::{
    AccelerationMethod, CouplingConfig, CouplingDriver, CouplingState, FluidSolver, FsiError,
    StructureSolver, TimeStepping,
};
use nalgebra::{DMatrix, DVector, Point2};

/// Traction `A d + f (1 + rate * t)`; records every displacement it is handed.
struct LinearFluid {
    operator: DMatrix<f64>,
    load: DVector<f64>,
    load_rate: f64,
    inputs: Vec<(f64, DVector<f64>)>,
}

impl LinearFluid {
    fn new(operator: DMatrix<f64>, load: DVector<f64>, load_rate: f64) -> Self {
        Self {
            operator,
            load,
            load_rate,
            inputs: Vec::new(),
        }
    }

    fn inputs_at(&self, time: f64) -> Vec<&DVector<f64>> {
        self.inputs
            .iter()
            .filter(|(t, _)| *t == time)
            .map(|(_, d)| d)
            .collect()
    }
}

impl FluidSolver<DVector<f64>> for LinearFluid {
    fn solve(&mut self, displacement: &DVector<f64>, time: f64) -> fsirs::Result<DVector<f64>> {
        self.inputs.push((time, displacement.clone()));
        Ok(&self.operator * displacement + &self.load * (1.0 + self.load_rate * time))
    }
}

/// Displacement `C t`, predicted from a fixed list per time step (zero afterwards).
struct LinearStructure {
    compliance: DMatrix<f64>,
    predictions: Vec<DVector<f64>>,
    solves: usize,
    committed: Vec<DVector<f64>>,
}

impl LinearStructure {
    fn new(compliance: DMatrix<f64>) -> Self {
        Self {
            compliance,
            predictions: Vec::new(),
            solves: 0,
            committed: Vec::new(),
        }
    }

    fn with_predictions(mut self, predictions: Vec<DVector<f64>>) -> Self {
        self.predictions = predictions;
        self
    }
}

impl StructureSolver<DVector<f64>> for LinearStructure {
    fn predict_displacement(&mut self, _time: f64) -> fsirs::Result<DVector<f64>> {
        Ok(self
            .predictions
            .get(self.committed.len())
            .cloned()
            .unwrap_or_else(|| DVector::zeros(self.compliance.nrows())))
    }

    fn solve(&mut self, traction: &DVector<f64>, _time: f64) -> fsirs::Result<DVector<f64>> {
        self.solves += 1;
        Ok(&self.compliance * traction)
    }

    fn finish_time_step(&mut self, displacement: &DVector<f64>) -> fsirs::Result<()> {
        self.committed.push(displacement.clone());
        Ok(())
    }
}

type LinearDriver = CouplingDriver<DVector<f64>, LinearFluid, LinearStructure>;

/// Fixed-Jacobian map of dimension 5 with spectral radius below one.
fn tridiagonal_jacobian() -> DMatrix<f64> {
    let diagonal = [0.6, -0.4, 0.3, -0.7, 0.5];
    DMatrix::from_fn(5, 5, |i, j| {
        if i == j {
            diagonal[i]
        } else if j == i + 1 {
            0.1
        } else if i == j + 1 {
            -0.05
        } else {
            0.0
        }
    })
}

fn tridiagonal_driver(config: CouplingConfig) -> LinearDriver {
    let fluid = LinearFluid::new(
        tridiagonal_jacobian(),
        DVector::from_vec(vec![1.0, -0.5, 0.25, 2.0, -1.0]),
        1.0,
    );
    let structure = LinearStructure::new(DMatrix::identity(5, 5));
    CouplingDriver::new(config, fluid, structure).unwrap()
}

#[test]
fn iqn_ils_solves_linear_map_within_its_dimension() {
    let dimension = 5;
    let config = CouplingConfig::default()
        .with_tolerances(1e-10, 1e-10)
        .with_omega_init(0.5);

    let mut iqn = tridiagonal_driver(config.clone().with_method(AccelerationMethod::IqnIls));
    let iqn_summary = iqn.solve_time_step(0.1).unwrap();

    let mut aitken = tridiagonal_driver(config.with_method(AccelerationMethod::Aitken));
    let aitken_summary = aitken.solve_time_step(0.1).unwrap();

    // One relaxed iteration, `dimension` secant iterations and the final check.
    assert!(iqn_summary.iterations as usize <= dimension + 2);
    assert!(iqn_summary.iterations <= aitken_summary.iterations);

    let exact = (DMatrix::identity(5, 5) - tridiagonal_jacobian())
        .lu()
        .solve(&(DVector::from_vec(vec![1.0, -0.5, 0.25, 2.0, -1.0]) * 1.1))
        .unwrap();
    assert_relative_eq!(iqn.structure().committed[0], exact, epsilon = 1e-9);
    assert_relative_eq!(aitken.structure().committed[0], exact, epsilon = 1e-9);
}

#[test]
fn mass_spring_reaches_analytic_fixed_point() {
    // K d = f0 - M_a d  =>  (K + M_a) d = f0  =>  d = (10/29, 15/58)
    let stiffness = DMatrix::from_row_slice(2, 2, &[2.0, -1.0, -1.0, 2.0]);
    let added_mass = DMatrix::from_row_slice(2, 2, &[1.5, 0.2, 0.2, 1.0]);
    let compliance = stiffness.try_inverse().unwrap();
    let fluid = LinearFluid::new(-added_mass, DVector::from_vec(vec![1.0, 0.5]), 0.0);
    let structure = LinearStructure::new(compliance);
    let config = CouplingConfig::default()
        .with_method(AccelerationMethod::IqnIls)
        .with_tolerances(1e-12, 1e-10)
        .with_omega_init(0.5);
    let mut driver = CouplingDriver::new(config, fluid, structure).unwrap();

    let summary = driver.solve_time_step(0.01).unwrap();
    // Relaxed start, two secant iterations, convergence check.
    assert_eq!(summary.iterations, 4);
    let expected = DVector::from_vec(vec![10.0 / 29.0, 15.0 / 58.0]);
    assert_relative_eq!(driver.structure().committed[0], expected, epsilon = 1e-10);
    let inputs = driver.fluid().inputs_at(0.01);
    assert_relative_eq!(*inputs[3], expected, epsilon = 1e-10);
}

#[test]
fn map_without_fixed_point_fails_after_exactly_max_plus_one_evaluations() {
    for method in [AccelerationMethod::Aitken, AccelerationMethod::IqnIls] {
        // d_tilde = d + 1
        let fluid = LinearFluid::new(DMatrix::identity(1, 1), DVector::from_element(1, 1.0), 0.0);
        let structure = LinearStructure::new(DMatrix::identity(1, 1));
        let config = CouplingConfig::default()
            .with_method(method)
            .with_partitioned_iter_max(7);
        let mut driver = CouplingDriver::new(config, fluid, structure).unwrap();

        match driver.solve_time_step(0.5) {
            Err(FsiError::ConvergenceFailure {
                time_step,
                iterations,
                absolute,
                ..
            }) => {
                assert_eq!(time_step, 0);
                assert_eq!(iterations, 8);
                assert_relative_eq!(absolute, 1.0, epsilon = 1e-12);
            }
            other => panic!("{method}: expected convergence failure, got {other:?}"),
        }
        assert_eq!(driver.state(), CouplingState::Failed);
        assert_eq!(driver.structure().solves, 8);
        assert_eq!(driver.fluid().inputs.len(), 8);
        assert_eq!(driver.stats().total_iterations(), 8);
        assert_eq!(driver.stats().time_steps(), 0);
        assert!(driver.structure().committed.is_empty());
    }
}

#[test]
fn without_reuse_second_step_ignores_how_first_step_went() {
    let jacobian = tridiagonal_jacobian();
    let load = DVector::from_vec(vec![1.0, -0.5, 0.25, 2.0, -1.0]);
    let (t1, t2) = (0.1, 0.2);
    let first_fixed_point = (DMatrix::identity(5, 5) - &jacobian)
        .lu()
        .solve(&(&load * (1.0 + t1)))
        .unwrap();
    let second_prediction = DVector::from_element(5, 0.25);
    let config = CouplingConfig::default()
        .with_method(AccelerationMethod::IqnIls)
        .with_tolerances(1e-10, 1e-10)
        .with_omega_init(0.5)
        .with_reused_time_steps(0);

    let run = |first_prediction: DVector<f64>| {
        let fluid = LinearFluid::new(jacobian.clone(), load.clone(), 1.0);
        let structure = LinearStructure::new(DMatrix::identity(5, 5))
            .with_predictions(vec![first_prediction, second_prediction.clone()]);
        let mut driver = CouplingDriver::new(config.clone(), fluid, structure).unwrap();
        let first = driver.solve_time_step(t1).unwrap();
        assert!(driver.history().is_empty());
        let second = driver.solve_time_step(t2).unwrap();
        (first, second, driver)
    };

    let (fast_first, fast_second, fast) = run(first_fixed_point);
    let (slow_first, slow_second, slow) = run(DVector::from_element(5, 10.0));
    assert!(fast_first.iterations < slow_first.iterations);

    let fast_inputs = fast.fluid().inputs_at(t2);
    let slow_inputs = slow.fluid().inputs_at(t2);
    assert_eq!(fast_inputs[0], slow_inputs[0]);
    assert_eq!(fast_inputs[1], slow_inputs[1]);
    assert_eq!(fast_second.iterations, slow_second.iterations);
}

#[test]
fn reused_history_shortens_later_time_steps() {
    let config = CouplingConfig::default()
        .with_method(AccelerationMethod::IqnIls)
        .with_tolerances(1e-10, 1e-10)
        .with_omega_init(0.5);
    let stepping = TimeStepping::new(0.0, 0.4, 0.1).unwrap();

    let mut forgetful = tridiagonal_driver(config.clone().with_reused_time_steps(0));
    let fresh_summaries = forgetful.run(&stepping).unwrap();
    let mut reusing = tridiagonal_driver(config.with_reused_time_steps(1));
    let summaries = reusing.run(&stepping).unwrap();

    assert_eq!(summaries.len(), 4);
    assert_eq!(reusing.history().len(), 1);
    assert_eq!(reusing.history().layer_bound(), 2);
    assert!(forgetful.history().is_empty());
    for (reused, fresh) in summaries.iter().zip(&fresh_summaries).skip(1) {
        assert!(reused.iterations <= 2);
        assert!(reused.iterations < fresh.iterations);
    }
    assert_eq!(
        reusing.stats().total_iterations(),
        summaries.iter().map(|s| u64::from(s.iterations)).sum::<u64>()
    );
}

/// Pressure load `1 - 0.5 u`, where `u` is the mesh displacement of the node next to the interface.
struct SpringBackedFlow;

impl FlowSolver<2> for SpringBackedFlow {
    fn solve_on_mesh(&mut self, mesh: &MeshState<2>, _time: f64) -> fsirs::Result<DVector<f64>> {
        Ok(DVector::from_vec(vec![1.0 - 0.5 * mesh.displacement[2], 0.0]))
    }
}

#[test]
fn ale_fluid_couples_through_mesh_motion() {
    let nodes = (0..3).map(|i| Point2::new(i as f64, 0.0)).collect();
    let graph = MeshGraph::new(nodes, vec![(0, 1), (1, 2)], vec![2], vec![0]).unwrap();
    let ale_points = graph.interface_points();
    let motion = MeshMotion::Poisson(PoissonMotion::new(graph).unwrap());
    let structure_points = vec![Point2::new(2.0, 0.0)];
    let coupling = InterfaceCoupling::new(&structure_points, &ale_points, 1e-10).unwrap();
    let fluid = AleFluid::new(motion, coupling, SpringBackedFlow).unwrap();
    let structure = LinearStructure::new(DMatrix::identity(2, 2));

    let config = CouplingConfig::default()
        .with_method(AccelerationMethod::IqnIls)
        .with_tolerances(1e-10, 1e-10)
        .with_omega_init(0.5);
    let mut driver = CouplingDriver::new(config, fluid, structure).unwrap();
    driver.solve_time_step(0.1).unwrap();

    // u = d / 2, d = 1 - 0.25 d  =>  d = 0.8
    let committed = &driver.structure().committed[0];
    assert_relative_eq!(committed[0], 0.8, epsilon = 1e-9);
    assert_relative_eq!(committed[1], 0.0, epsilon = 1e-12);
    let mesh = driver.fluid().mesh().unwrap();
    assert_relative_eq!(mesh.positions[1].x, 1.4, epsilon = 1e-9);
    assert_relative_eq!(mesh.positions[2].x, 2.8, epsilon = 1e-9);
}
