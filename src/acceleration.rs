//! Acceleration of the interface fixed-point iteration.
//!
//! An [`Accelerator`] lives for exactly one time step. It turns the current
//! iterate `d`, the structure response `d_tilde` and the residual
//! `r = d_tilde - d` into the next iterate, and at the end of the step retires
//! its secant information into the driver's [`HistoryStore`].

use log::{debug, warn};

use crate::error::Result;
use crate::history::{inv_jacobian_times_residual, HistoryEntry, HistoryStore};
use crate::options::{AccelerationMethod, CouplingConfig};
use crate::qr::{compute_qr_decomposition, DEFAULT_DEFLATION_THRESHOLD};
use crate::substitution::{backward_substitution, backward_substitution_multiple_rhs};
use crate::vector::InterfaceVector;

/// Kind of update performed by one acceleration step.
#[derive(Clone, Debug, PartialEq)]
pub enum AccelerationStep {
    /// `d <- d + omega * r`
    Relaxed { omega: f64 },
    /// Least-squares quasi-Newton update.
    QuasiNewton {
        /// Secant columns collected in the current time step.
        columns: usize,
        /// Columns dropped as linearly dependent.
        deflated: usize,
        /// Retained past time steps that contributed.
        reused_layers: usize,
    },
}

/// Per-time-step accelerator, one variant per configured method.
#[derive(Clone, Debug)]
pub enum Accelerator<V> {
    Aitken(AitkenRelaxation<V>),
    IqnIls(IqnIls<V>),
}

impl<V: InterfaceVector> Accelerator<V> {
    /// Fresh accelerator for a new time step.
    pub fn new(config: &CouplingConfig) -> Self {
        match config.method {
            AccelerationMethod::Aitken => {
                Accelerator::Aitken(AitkenRelaxation::new(config.omega_init))
            }
            AccelerationMethod::IqnIls => Accelerator::IqnIls(IqnIls::new(config.omega_init)),
        }
    }

    /// Overwrites `d` with the next iterate.
    pub fn accelerate(
        &mut self,
        d: &mut V,
        d_tilde: &V,
        residual: &V,
        history: &HistoryStore<V>,
    ) -> Result<AccelerationStep> {
        match self {
            Accelerator::Aitken(aitken) => Ok(aitken.update(d, residual)),
            Accelerator::IqnIls(iqn) => iqn.update(d, d_tilde, residual, history),
        }
    }

    /// Completes the time step, pushing IQN-ILS secant information into `history`.
    pub fn finish(self, history: &mut HistoryStore<V>) -> Result<()> {
        match self {
            Accelerator::Aitken(_) => Ok(()),
            Accelerator::IqnIls(iqn) => iqn.finish(history),
        }
    }
}

/// Aitken dynamic relaxation.
#[derive(Clone, Debug)]
pub struct AitkenRelaxation<V> {
    omega_init: f64,
    omega: f64,
    r_old: Option<V>,
}

impl<V: InterfaceVector> AitkenRelaxation<V> {
    /// Starts with `omega = omega_init`.
    pub fn new(omega_init: f64) -> Self {
        Self {
            omega_init,
            omega: omega_init,
            r_old: None,
        }
    }

    /// Current relaxation factor.
    pub fn omega(&self) -> f64 {
        self.omega
    }

    /// Updates `omega` from the last two residuals and relaxes `d`.
    pub fn update(&mut self, d: &mut V, residual: &V) -> AccelerationStep {
        self.omega = match &self.r_old {
            None => self.omega_init,
            Some(r_old) => {
                let delta_r = residual.difference(r_old);
                let norm_sqr = delta_r.dot(&delta_r);
                let candidate = -self.omega * r_old.dot(&delta_r) / norm_sqr;
                if norm_sqr > 0.0 && candidate.is_finite() {
                    candidate
                } else {
                    warn!(
                        "Aitken update undefined (|r - r_old|^2 = {norm_sqr:e}), keeping omega = {}",
                        self.omega
                    );
                    self.omega
                }
            }
        };
        self.r_old = Some(residual.clone());
        d.add_scaled(self.omega, residual);
        AccelerationStep::Relaxed { omega: self.omega }
    }
}

/// Interface quasi-Newton with least squares (IQN-ILS).
///
/// Collects, from the second iteration on, increments of the structure
/// response (`D`) and of the residual (`R`). The least-squares combination of
/// the current increments explains as much of the residual as possible; the
/// part they leave unexplained is passed through the retained history layers.
#[derive(Clone, Debug)]
pub struct IqnIls<V> {
    omega_init: f64,
    d: Vec<V>,
    r: Vec<V>,
    d_tilde_old: Option<V>,
    r_old: Option<V>,
}

impl<V: InterfaceVector> IqnIls<V> {
    /// Creates an accelerator with no secant columns.
    pub fn new(omega_init: f64) -> Self {
        Self {
            omega_init,
            d: Vec::new(),
            r: Vec::new(),
            d_tilde_old: None,
            r_old: None,
        }
    }

    /// Number of secant columns collected in this time step.
    pub fn columns(&self) -> usize {
        self.r.len()
    }

    /// Appends the newest increments and overwrites `d` with the next iterate.
    pub fn update(
        &mut self,
        d: &mut V,
        d_tilde: &V,
        residual: &V,
        history: &HistoryStore<V>,
    ) -> Result<AccelerationStep> {
        if let (Some(d_tilde_old), Some(r_old)) = (&self.d_tilde_old, &self.r_old) {
            self.d.push(d_tilde.difference(d_tilde_old));
            self.r.push(residual.difference(r_old));
        }
        self.d_tilde_old = Some(d_tilde.clone());
        self.r_old = Some(residual.clone());

        if self.r.is_empty() && history.is_empty() {
            d.add_scaled(self.omega_init, residual);
            return Ok(AccelerationStep::Relaxed {
                omega: self.omega_init,
            });
        }

        // `explained` accumulates D * alpha, `unexplained` the residual left over.
        let mut explained = residual.zeros_like();
        let mut unexplained = residual.clone();
        let mut deflated = 0;
        if !self.r.is_empty() {
            let mut q = self.r.clone();
            let factors = compute_qr_decomposition(&mut q, DEFAULT_DEFLATION_THRESHOLD)?;
            deflated = factors.deflated.len();
            let rhs: Vec<f64> = q.iter().map(|column| column.dot(residual)).collect();
            let alpha = backward_substitution(&factors.r, &rhs)?;
            for ((alpha_i, d_i), r_i) in alpha.iter().zip(&self.d).zip(&self.r) {
                explained.add_scaled(*alpha_i, d_i);
                unexplained.add_scaled(-*alpha_i, r_i);
            }
        }
        let reused = inv_jacobian_times_residual(&unexplained, history);
        explained.add_scaled(1.0, &reused);

        // d <- d + r + b with correction b = -(D alpha + history contribution)
        d.add_scaled(1.0, residual);
        d.add_scaled(-1.0, &explained);

        Ok(AccelerationStep::QuasiNewton {
            columns: self.r.len(),
            deflated,
            reused_layers: history.len(),
        })
    }

    /// Factorizes the collected increments one last time and pushes the step's entry.
    pub fn finish(self, history: &mut HistoryStore<V>) -> Result<()> {
        if self.r.is_empty() || history.capacity() == 0 {
            return Ok(());
        }
        let mut q = self.r.clone();
        let factors = compute_qr_decomposition(&mut q, DEFAULT_DEFLATION_THRESHOLD)?;
        let z = backward_substitution_multiple_rhs(&factors.r, &q)?;
        debug!(
            "retiring {} secant columns (rank {}) into history",
            self.r.len(),
            factors.rank()
        );
        history.push(HistoryEntry::new(self.d, self.r, z)?);
        Ok(())
    }
}
