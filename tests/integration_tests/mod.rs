//! Integration tests module
//!
//! End-to-end tests for the scheduler over in-memory bus and index:
//! - Discovered URL → decision → schedule request pipeline
//! - Concurrent consumption and shutdown drain
//! - Error handling and redelivery scenarios

pub mod consumer_test;
pub mod error_scenarios;
pub mod fixtures;
pub mod pipeline_test;
