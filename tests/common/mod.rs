//! Common test utilities and helpers

#![allow(dead_code)] // Test utilities may not all be used in every test file

pub mod builders;
pub mod mock_helpers;

use datamon_rs::Matrix;
use std::time::Duration;

/// Create a test timeout duration
pub fn test_timeout() -> Duration {
    Duration::from_secs(5)
}

/// Assert two floats are approximately equal
pub fn assert_float_eq(a: f64, b: f64, epsilon: f64) {
    assert!(
        (a - b).abs() < epsilon,
        "Expected {} to be approximately equal to {} (epsilon: {})",
        a,
        b,
        epsilon
    );
}

/// Assert two floats are equal, treating NaN as equal to NaN
pub fn assert_same_f64(a: f64, b: f64) {
    assert!(
        a == b || (a.is_nan() && b.is_nan()),
        "Expected {} to equal {}",
        a,
        b
    );
}

/// Assert two matrices match cell by cell, NaN included
pub fn assert_matrix_eq(a: &Matrix, b: &Matrix) {
    assert_eq!(a.shape(), b.shape(), "matrix shapes differ");
    for (x, y) in a.as_slice().iter().zip(b.as_slice()) {
        assert_same_f64(*x, *y);
    }
}
