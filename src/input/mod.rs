//! # Model inputs
//!
//! Defines a light-weight container for design matrices, count outcomes,
//! and the observation ids used to join predictions back to rows.
//!
//! # Examples
//!
//! ```
//! use faer::Mat;
//! use zero_inflated_models::ModelInput;
//!
//! fn idx_to_f64(idx: usize) -> f64 {
//!     f64::from(u32::try_from(idx).unwrap_or(u32::MAX))
//! }
//!
//! let design_matrix = Mat::from_fn(2, 2, |i, j| if j == 0 { 1.0 } else { idx_to_f64(i) });
//! let outcome = Mat::from_fn(2, 1, |i, _| idx_to_f64(i));
//! let input = ModelInput::new(design_matrix, outcome);
//!
//! assert!(input.validate().is_ok());
//! assert_eq!(input.observation_ids(), &[0, 1]);
//! ```
//!
//! ```
//! use faer::Mat;
//! use zero_inflated_models::ModelInput;
//!
//! let design_matrix = Mat::from_fn(2, 1, |_, _| 1.0);
//! let outcome = Mat::from_fn(2, 1, |i, _| if i == 0 { 0.5 } else { 1.0 });
//! let input = ModelInput::new(design_matrix, outcome);
//!
//! assert!(input.validate().is_err());
//! ```

use std::collections::HashSet;

use faer::Mat;
use thiserror::Error;

use crate::models::matrix_ops::{select_rows, select_values};
use crate::simulation::ObservationTable;
use crate::utils::{f64_to_count, matrix_is_finite, u64_to_f64};

/// Errors returned when validating model inputs.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InputError {
    #[error("design matrix must have at least one column")]
    EmptyDesign,
    #[error("outcome must be a single column matrix")]
    InvalidOutcomeShape,
    #[error("design matrix rows ({rows}) must match outcome rows ({len})")]
    DimensionMismatch { rows: usize, len: usize },
    #[error("observation ids length ({ids}) must match outcome rows ({rows})")]
    InvalidObservationIdLength { ids: usize, rows: usize },
    #[error("observation id {0} appears more than once")]
    DuplicateObservationId(u64),
    #[error("design matrix contains non-finite values")]
    NonFiniteDesign,
    #[error("outcome contains non-finite values")]
    NonFiniteOutcome,
    #[error("outcome contains negative values")]
    NegativeOutcome,
    #[error("outcome contains non-integer values")]
    NonIntegerOutcome,
}

/// How to build a design matrix from an observation table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DesignOptions {
    /// Add one dummy column per group beyond the first, approximating the
    /// random intercept with fixed group intercepts.
    pub group_intercepts: bool,
}

#[derive(Debug, Clone)]
pub struct ModelInput {
    pub design_matrix: Mat<f64>,
    pub outcome: Mat<f64>,
    pub observation_ids: Vec<u64>,
}

impl ModelInput {
    /// Wrap a design matrix and outcome; rows receive ids `0..n`.
    #[must_use]
    pub fn new(design_matrix: Mat<f64>, outcome: Mat<f64>) -> Self {
        let observation_ids = (0..outcome.nrows())
            .map(|i| u64::try_from(i).unwrap_or(u64::MAX))
            .collect();
        Self {
            design_matrix,
            outcome,
            observation_ids,
        }
    }

    #[must_use]
    pub fn with_observation_ids(self, observation_ids: Vec<u64>) -> Self {
        Self {
            observation_ids,
            ..self
        }
    }

    /// Build `[1, x]` (plus optional group dummies) and the count outcome
    /// from a simulated table, carrying the table's observation ids.
    #[must_use]
    pub fn from_table(table: &ObservationTable, options: DesignOptions) -> Self {
        let observations = table.observations();
        let n_groups = if options.group_intercepts {
            table.group_effects().len()
        } else {
            0
        };
        let extra = n_groups.saturating_sub(1);
        let design_matrix = Mat::from_fn(observations.len(), 2 + extra, |i, j| match j {
            0 => 1.0,
            1 => observations[i].x,
            _ => {
                let dummy_group = u64::try_from(j - 1).unwrap_or(u64::MAX);
                if observations[i].group == dummy_group {
                    1.0
                } else {
                    0.0
                }
            }
        });
        let outcome = Mat::from_fn(observations.len(), 1, |i, _| {
            u64_to_f64(observations[i].response)
        });
        Self {
            design_matrix,
            outcome,
            observation_ids: table.ids(),
        }
    }

    #[must_use]
    pub const fn design_matrix(&self) -> &Mat<f64> {
        &self.design_matrix
    }

    #[must_use]
    pub const fn outcome(&self) -> &Mat<f64> {
        &self.outcome
    }

    #[must_use]
    pub fn observation_ids(&self) -> &[u64] {
        &self.observation_ids
    }

    #[must_use]
    pub fn nrows(&self) -> usize {
        self.outcome.nrows()
    }

    /// Restrict to the given row indices, keeping their observation ids.
    #[must_use]
    pub fn subset(&self, rows: &[usize]) -> Self {
        Self {
            design_matrix: select_rows(&self.design_matrix, rows),
            outcome: select_values(&self.outcome, rows),
            observation_ids: rows.iter().map(|&row| self.observation_ids[row]).collect(),
        }
    }

    /// Row indices with a strictly positive outcome.
    #[must_use]
    pub fn positive_rows(&self) -> Vec<usize> {
        (0..self.outcome.nrows())
            .filter(|&i| self.outcome[(i, 0)] > 0.0)
            .collect()
    }

    /// Presence indicator `1{y > 0}` as a column.
    #[must_use]
    pub fn presence_indicator(&self) -> Mat<f64> {
        Mat::from_fn(self.outcome.nrows(), 1, |i, _| {
            if self.outcome[(i, 0)] > 0.0 { 1.0 } else { 0.0 }
        })
    }

    /// Validate shapes, finiteness, count support, and id uniqueness.
    ///
    /// # Errors
    ///
    /// Returns `InputError` if inputs are malformed.
    pub fn validate(&self) -> Result<(), InputError> {
        if self.design_matrix.ncols() == 0 {
            return Err(InputError::EmptyDesign);
        }
        if self.outcome.ncols() != 1 {
            return Err(InputError::InvalidOutcomeShape);
        }
        if self.design_matrix.nrows() != self.outcome.nrows() {
            return Err(InputError::DimensionMismatch {
                rows: self.design_matrix.nrows(),
                len: self.outcome.nrows(),
            });
        }
        if self.observation_ids.len() != self.outcome.nrows() {
            return Err(InputError::InvalidObservationIdLength {
                ids: self.observation_ids.len(),
                rows: self.outcome.nrows(),
            });
        }
        if !matrix_is_finite(&self.design_matrix) {
            return Err(InputError::NonFiniteDesign);
        }
        if !matrix_is_finite(&self.outcome) {
            return Err(InputError::NonFiniteOutcome);
        }
        if (0..self.outcome.nrows()).any(|i| self.outcome[(i, 0)] < 0.0) {
            return Err(InputError::NegativeOutcome);
        }
        if (0..self.outcome.nrows()).any(|i| f64_to_count(self.outcome[(i, 0)]).is_none()) {
            return Err(InputError::NonIntegerOutcome);
        }
        let mut seen = HashSet::with_capacity(self.observation_ids.len());
        for &id in &self.observation_ids {
            if !seen.insert(id) {
                return Err(InputError::DuplicateObservationId(id));
            }
        }
        Ok(())
    }
}
