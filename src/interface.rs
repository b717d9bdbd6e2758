//! Transfer of vector-valued interface fields between non-matching point sets.

use nalgebra::{DVector, Point};
use rayon::prelude::*;

use crate::error::{FsiError, Result};

/// Maps every target point to a source point within the geometric tolerance.
///
/// Fields are stored point-major with `D` components per point.
#[derive(Clone, Debug)]
pub struct InterfaceCoupling<const D: usize> {
    source_len: usize,
    target_to_source: Vec<usize>,
}

impl<const D: usize> InterfaceCoupling<D> {
    /// Matches `target` points against `source` points.
    ///
    /// Fails with [`FsiError::GeometricMatch`] for the first target point whose
    /// nearest source point lies farther away than `geometric_tolerance`.
    pub fn new(
        source: &[Point<f64, D>],
        target: &[Point<f64, D>],
        geometric_tolerance: f64,
    ) -> Result<Self> {
        if !(geometric_tolerance > 0.0) {
            return Err(FsiError::configuration(
                "geometric_tolerance",
                format!("must be positive, found {geometric_tolerance}"),
            ));
        }

        let nearest_sources: Vec<(usize, f64)> = target
            .par_iter()
            .map(|point| nearest(source, point))
            .collect();

        let mut target_to_source = Vec::with_capacity(target.len());
        for (point, (index, distance)) in target.iter().zip(nearest_sources) {
            if distance > geometric_tolerance {
                return Err(FsiError::GeometricMatch {
                    point: point.coords.iter().copied().collect(),
                    distance,
                    tolerance: geometric_tolerance,
                });
            }
            target_to_source.push(index);
        }

        Ok(Self {
            source_len: source.len(),
            target_to_source,
        })
    }

    /// Number of source points.
    pub fn source_len(&self) -> usize {
        self.source_len
    }

    /// Number of target points.
    pub fn target_len(&self) -> usize {
        self.target_to_source.len()
    }

    /// Copies `field` from the source points onto the target points.
    pub fn transfer(&self, field: &DVector<f64>) -> Result<DVector<f64>> {
        if field.len() != self.source_len * D {
            return Err(FsiError::dimension_mismatch(
                "interface field length",
                self.source_len * D,
                field.len(),
            ));
        }
        let mut mapped = DVector::zeros(self.target_to_source.len() * D);
        for (target, source) in self.target_to_source.iter().enumerate() {
            for component in 0..D {
                mapped[target * D + component] = field[source * D + component];
            }
        }
        Ok(mapped)
    }
}

fn nearest<const D: usize>(source: &[Point<f64, D>], point: &Point<f64, D>) -> (usize, f64) {
    source
        .iter()
        .enumerate()
        .map(|(index, candidate)| (index, nalgebra::distance(candidate, point)))
        .fold((0, f64::INFINITY), |best, current| {
            if current.1 < best.1 {
                current
            } else {
                best
            }
        })
}
