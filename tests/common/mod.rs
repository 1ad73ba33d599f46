//! Common test utilities and helpers
//!
//! Shared fixtures for the integration tests: a local bare "remote" built
//! with git2, pointer files, store construction and tree assertions.

#![allow(dead_code)]

pub mod assertion_helpers;
pub mod mock_services;
pub mod test_fixtures;
pub mod test_helpers;
