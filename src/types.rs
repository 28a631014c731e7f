//! Core data types for DataMon-RS
//!
//! This module contains the fundamental data structures passed through the
//! signal graph and produced by the samplers.
//!
//! # Main Types
//!
//! - [`Sample`] - A single timestamp with one or more values
//! - [`Matrix`] - Dense row-major `f64` matrix used for snapshots and exports
//!
//! # Matrix Orientation
//!
//! Buffer snapshots are *field-major*: row 0 holds timestamps and each
//! following row holds one value component, with one column per sample.
//! Exported tables are the transpose of that: one row per sample slot and
//! one column per field (`Time, name_1, name_2, ...`).

use serde::{Deserialize, Serialize};
use std::fmt;

/// A timestamped sample carrying one or more values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Time in seconds (relative to the session origin)
    pub timestamp: f64,
    /// Value components; scalar signals carry exactly one
    pub values: Vec<f64>,
}

impl Sample {
    /// Create a sample from a timestamp and a value vector
    pub fn new(timestamp: f64, values: Vec<f64>) -> Self {
        Self { timestamp, values }
    }

    /// Create a scalar sample
    pub fn scalar(timestamp: f64, value: f64) -> Self {
        Self {
            timestamp,
            values: vec![value],
        }
    }

    /// A sample whose timestamp and `width` values are all NaN
    pub fn nan(width: usize) -> Self {
        Self {
            timestamp: f64::NAN,
            values: vec![f64::NAN; width],
        }
    }

    /// Number of value components
    pub fn width(&self) -> usize {
        self.values.len()
    }

    /// First value component (NaN for an empty sample)
    pub fn value(&self) -> f64 {
        self.values.first().copied().unwrap_or(f64::NAN)
    }
}

impl From<(f64, f64)> for Sample {
    fn from((timestamp, value): (f64, f64)) -> Self {
        Sample::scalar(timestamp, value)
    }
}

/// Dense row-major matrix of `f64`.
#[derive(Clone, PartialEq, Default)]
pub struct Matrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl Matrix {
    /// Create a `rows × cols` matrix with every cell set to `value`
    pub fn filled(rows: usize, cols: usize, value: f64) -> Self {
        Self {
            rows,
            cols,
            data: vec![value; rows * cols],
        }
    }

    /// Create a `rows × cols` matrix filled with NaN
    pub fn nan(rows: usize, cols: usize) -> Self {
        Self::filled(rows, cols, f64::NAN)
    }

    /// Build a matrix from row vectors. Returns `None` when rows have
    /// different lengths.
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Option<Self> {
        let cols = rows.first().map(Vec::len).unwrap_or(0);
        if rows.iter().any(|r| r.len() != cols) {
            return None;
        }
        let n_rows = rows.len();
        let data = rows.into_iter().flatten().collect();
        Some(Self {
            rows: n_rows,
            cols,
            data,
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// `(rows, cols)`
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        assert!(row < self.rows && col < self.cols, "matrix index out of range");
        self.data[row * self.cols + col]
    }

    #[inline]
    pub fn set(&mut self, row: usize, col: usize, value: f64) {
        assert!(row < self.rows && col < self.cols, "matrix index out of range");
        self.data[row * self.cols + col] = value;
    }

    /// Borrow one row
    pub fn row(&self, row: usize) -> &[f64] {
        let start = row * self.cols;
        &self.data[start..start + self.cols]
    }

    /// Iterate over rows
    pub fn iter_rows(&self) -> impl Iterator<Item = &[f64]> {
        // chunks(0) panics, so an empty-column matrix yields empty rows explicitly
        let cols = self.cols.max(1);
        let empty_rows = if self.cols == 0 { self.rows } else { 0 };
        self.data
            .chunks(cols)
            .chain(std::iter::repeat::<&[f64]>(&[]).take(empty_rows))
    }

    /// Copy `values` into `row` starting at column `col`
    pub fn write_row_segment(&mut self, row: usize, col: usize, values: &[f64]) {
        assert!(col + values.len() <= self.cols, "segment exceeds matrix width");
        let start = row * self.cols + col;
        self.data[start..start + values.len()].copy_from_slice(values);
    }

    /// Return the transposed matrix
    pub fn transpose(&self) -> Self {
        let mut out = Matrix::filled(self.cols, self.rows, 0.0);
        for r in 0..self.rows {
            for c in 0..self.cols {
                out.data[c * self.rows + r] = self.data[r * self.cols + c];
            }
        }
        out
    }

    /// Raw row-major data
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }
}

impl fmt::Debug for Matrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Matrix {}x{} [", self.rows, self.cols)?;
        for row in self.iter_rows() {
            writeln!(f, "  {:?}", row)?;
        }
        write!(f, "]")
    }
}
