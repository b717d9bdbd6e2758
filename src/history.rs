//! Secant history retained across time steps and the multi-secant inverse Jacobian action.

use std::collections::VecDeque;

use log::trace;

use crate::error::{FsiError, Result};
use crate::vector::InterfaceVector;

/// Secant information of one completed time step.
///
/// `d` holds displacement increments, `r` the matching residual increments and
/// `z` the least-squares weight vectors obtained by back substitution against
/// the orthonormalized residual increments.
#[derive(Clone, Debug)]
pub struct HistoryEntry<V> {
    d: Vec<V>,
    r: Vec<V>,
    z: Vec<V>,
}

impl<V: InterfaceVector> HistoryEntry<V> {
    /// Creates an entry after checking that all three sequences have equal length.
    pub fn new(d: Vec<V>, r: Vec<V>, z: Vec<V>) -> Result<Self> {
        if r.len() != d.len() {
            return Err(FsiError::dimension_mismatch(
                "history residual increments",
                d.len(),
                r.len(),
            ));
        }
        if z.len() != d.len() {
            return Err(FsiError::dimension_mismatch(
                "history weight vectors",
                d.len(),
                z.len(),
            ));
        }
        Ok(Self { d, r, z })
    }

    /// Number of secant columns `k`.
    pub fn len(&self) -> usize {
        self.d.len()
    }

    /// Returns `true` if the entry holds no columns.
    pub fn is_empty(&self) -> bool {
        self.d.is_empty()
    }

    /// Displacement increments.
    pub fn d(&self) -> &[V] {
        &self.d
    }

    /// Residual increments.
    pub fn r(&self) -> &[V] {
        &self.r
    }

    /// Least-squares weight vectors.
    pub fn z(&self) -> &[V] {
        &self.z
    }

    /// Applies this layer to the running pair `(a, b)`.
    ///
    /// Computes `p_i = <z_i, a>`, then `b += sum p_i d_i` and `a -= sum p_i r_i`.
    pub fn apply(&self, a: &mut V, b: &mut V) {
        let projections: Vec<f64> = self.z.iter().map(|z| z.dot(a)).collect();
        for (p, d) in projections.iter().zip(&self.d) {
            b.add_scaled(*p, d);
        }
        for (p, r) in projections.iter().zip(&self.r) {
            a.add_scaled(-*p, r);
        }
    }
}

/// Bounded sequence of [`HistoryEntry`] values, oldest first.
///
/// Together with the in-progress time step at most `reused_time_steps + 1`
/// layers contribute to a correction, so the store itself retains at most
/// `reused_time_steps` completed steps.
#[derive(Clone, Debug)]
pub struct HistoryStore<V> {
    entries: VecDeque<HistoryEntry<V>>,
    reused_time_steps: usize,
}

impl<V: InterfaceVector> HistoryStore<V> {
    /// Creates an empty store reusing up to `reused_time_steps` past steps.
    pub fn new(reused_time_steps: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            reused_time_steps,
        }
    }

    /// Appends the newest entry and evicts the oldest ones beyond the bound.
    pub fn push(&mut self, entry: HistoryEntry<V>) {
        self.entries.push_back(entry);
        while self.entries.len() > self.reused_time_steps {
            self.entries.pop_front();
            trace!(
                "evicted oldest history entry, {} retained",
                self.entries.len()
            );
        }
    }

    /// Number of retained entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no past time step is retained.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of completed time steps the store may retain.
    pub fn capacity(&self) -> usize {
        self.reused_time_steps
    }

    /// Maximum number of layers (retained plus current) used by one correction.
    pub fn layer_bound(&self) -> usize {
        self.reused_time_steps.saturating_add(1)
    }

    /// Iterates entries from oldest to newest.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &HistoryEntry<V>> {
        self.entries.iter()
    }

    /// Total number of secant columns across all retained entries.
    pub fn column_count(&self) -> usize {
        self.entries.iter().map(HistoryEntry::len).sum()
    }

    /// Drops every retained entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Approximates the action of the accelerated-update operator on `residual`.
///
/// Layers are applied newest to oldest: each entry projects the running
/// residual onto its weight vectors, accumulates the matching displacement
/// increments into the result and removes the explained part from the
/// residual before the next (older) layer sees it.
pub fn inv_jacobian_times_residual<V: InterfaceVector>(
    residual: &V,
    history: &HistoryStore<V>,
) -> V {
    let mut a = residual.clone();
    let mut b = residual.zeros_like();
    for entry in history.iter().rev() {
        entry.apply(&mut a, &mut b);
    }
    b
}
