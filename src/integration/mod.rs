//! Integration tests and shared test fixtures

pub mod fixtures;

#[cfg(unix)]
mod e2e;
