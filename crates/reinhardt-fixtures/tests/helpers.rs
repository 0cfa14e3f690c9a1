//! Test helpers for reinhardt-fixtures tests.
//!
//! This module provides utility functions for locating test data
//! and common test operations.

#[path = "helpers/test_data.rs"]
pub mod test_data;
