//! Bounded rolling window with population mean / std and z-score.

use std::collections::VecDeque;

use super::{mean, population_std};

#[derive(Debug, Clone, PartialEq)]
pub struct RollingWindow {
    capacity: usize,
    values: VecDeque<f64>,
}

impl RollingWindow {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            values: VecDeque::with_capacity(capacity),
        }
    }

    /// Append, evicting the oldest value once full.
    pub fn push(&mut self, value: f64) {
        if self.values.len() == self.capacity {
            self.values.pop_front();
        }
        self.values.push_back(value);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.values.len() == self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn last(&self) -> Option<f64> {
        self.values.back().copied()
    }

    /// Oldest first.
    pub fn values(&self) -> Vec<f64> {
        self.values.iter().copied().collect()
    }

    pub fn mean(&self) -> f64 {
        mean(&self.values())
    }

    pub fn std(&self) -> f64 {
        population_std(&self.values())
    }

    /// z-score of the latest value against the whole window, latest included.
    ///
    /// `None` until `min_periods` values are held, or when the window has
    /// (numerically) zero variance.
    pub fn zscore(&self, min_periods: usize) -> Option<f64> {
        if self.values.len() < min_periods.max(2) {
            return None;
        }
        let last = self.last()?;
        let values = self.values();
        let m = mean(&values);
        let sd = population_std(&values);
        if !sd.is_finite() || sd <= 1e-12 * m.abs().max(1.0) {
            return None;
        }
        Some((last - m) / sd)
    }
}
