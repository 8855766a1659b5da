//! Front end tests against the accounts page

use std::time::Duration;

use tracing::warn;

use crate::browser::{Locator, Page, PageSession};
use crate::config::RunnerConfig;
use crate::expect::{expect_strictly_increasing, expect_true, parse_float};
use crate::runner::{TestCase, TestContext, TestError};

pub const GROUP: &str = "Front end tests";

pub const ACCOUNTS_PATH: &str = "/accounts";
/// Time the page gets to settle before the layout is inspected
pub const SETTLE_DELAY: Duration = Duration::from_millis(1000);
/// Transaction value column
pub const SORT_COLUMN: usize = 3;
pub const CHECKED_ROWS: usize = 3;

pub fn header_cells() -> Locator {
    Locator::css("[role=header]")
}

pub fn table_rows() -> Locator {
    Locator::xpath("//div[@row]")
}

pub fn row_columns() -> Locator {
    Locator::xpath("./div[@role='column']")
}

pub fn cases() -> Vec<TestCase> {
    vec![
        TestCase::new(GROUP, "Check layout", |ctx| async move {
            with_page(&ctx, Scenario::Layout).await
        }),
        TestCase::new(
            GROUP,
            "Sort transaction table in ascending order",
            |ctx| async move { with_page(&ctx, Scenario::Sort).await },
        ),
    ]
}

enum Scenario {
    Layout,
    Sort,
}

/// Open a page, run the scenario, close the session afterwards.
/// If the test is aborted on timeout, dropping the session closes it.
async fn with_page(ctx: &TestContext, scenario: Scenario) -> Result<(), TestError> {
    let mut session = PageSession::open(ctx.pages.as_ref()).await?;
    let page = session.page()?;
    let result = match scenario {
        Scenario::Layout => check_layout(page, &ctx.config).await,
        Scenario::Sort => sort_ascending(page, &ctx.config).await,
    };
    if let Err(e) = session.close().await {
        warn!("Browser session did not close cleanly: {}", e);
    }
    result
}

/// The table marker for the configured environment is visible.
/// Environments without a marker are reported as skipped.
pub async fn check_layout(page: &mut dyn Page, config: &RunnerConfig) -> Result<(), TestError> {
    page.goto(&config.ui_url(ACCOUNTS_PATH)).await?;
    tokio::time::sleep(SETTLE_DELAY).await;

    let Some(marker) = config.environment.layout_marker() else {
        return Err(TestError::Skipped(format!(
            "no layout marker for ENVIRONMENT={}",
            config.environment
        )));
    };

    let visible = page.is_visible(&Locator::test_id(marker)).await?;
    expect_true(visible, &format!("[data-testid='{}'] should be visible", marker))?;
    Ok(())
}

/// Clicking the transaction value header sorts the table ascending
pub async fn sort_ascending(page: &mut dyn Page, config: &RunnerConfig) -> Result<(), TestError> {
    page.goto(&config.ui_url(ACCOUNTS_PATH)).await?;
    page.click_nth(&header_cells(), SORT_COLUMN).await?;

    let mut values = Vec::with_capacity(CHECKED_ROWS);
    for row in 0..CHECKED_ROWS {
        let text = page
            .nested_text(&table_rows(), row, &row_columns(), SORT_COLUMN)
            .await?;
        values.push(parse_float(&text)?);
    }

    expect_strictly_increasing(&values, "transaction values")?;
    Ok(())
}
