//! Helpers for tests that need a real database. Only compiled for tests or with the `test_utils` feature.
pub mod fixtures;
pub mod prepare_env;
