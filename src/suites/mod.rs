//! The test cases run against the bank

pub mod api;
pub mod ui;

use crate::runner::TestCase;

/// Every test, API group first
pub fn all() -> Vec<TestCase> {
    let mut cases = api::cases();
    cases.extend(ui::cases());
    cases
}
