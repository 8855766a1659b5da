//! End-to-end conformance suite for the Kablamo banking API and web UI.

pub mod api;
pub mod browser;
pub mod config;
pub mod expect;
pub mod report;
pub mod runner;
pub mod suites;

pub use config::RunnerConfig;
pub use runner::{RunSummary, Runner, TestCase, TestContext, TestError, TestStatus};
