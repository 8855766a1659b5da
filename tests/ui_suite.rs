//! UI suite against an in-memory accounts page

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use kablamo_e2e::browser::{BrowserError, Locator, Page, PageFactory};
use kablamo_e2e::config::Environment;
use kablamo_e2e::expect::CheckError;
use kablamo_e2e::suites::ui;
use kablamo_e2e::{Runner, RunnerConfig, TestError, TestStatus};

/// Accounts page: a table whose rows get sorted when header 3 is clicked
#[derive(Clone)]
struct FakeAccountsPage {
    visible: HashSet<String>,
    headers: usize,
    rows: Vec<Vec<String>>,
    sorts_on_click: bool,
    log: Arc<Mutex<Vec<String>>>,
}

impl FakeAccountsPage {
    fn new(visible: &[&str], values: &[&str]) -> Self {
        Self {
            visible: visible.iter().map(|id| id.to_string()).collect(),
            headers: 5,
            rows: values
                .iter()
                .enumerate()
                .map(|(i, value)| {
                    vec![
                        format!("acc-{}", i),
                        "Savings".to_string(),
                        "2024-01-01".to_string(),
                        value.to_string(),
                        "AUD".to_string(),
                    ]
                })
                .collect(),
            sorts_on_click: true,
            log: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn record(&self, entry: String) {
        self.log.lock().unwrap().push(entry);
    }
}

#[async_trait]
impl Page for FakeAccountsPage {
    async fn goto(&mut self, url: &str) -> Result<(), BrowserError> {
        self.record(format!("goto {}", url));
        Ok(())
    }

    async fn is_visible(&mut self, locator: &Locator) -> Result<bool, BrowserError> {
        let Locator::Css(selector) = locator else {
            return Ok(false);
        };
        Ok(self
            .visible
            .iter()
            .any(|id| *selector == format!("[data-testid='{}']", id)))
    }

    async fn click_nth(&mut self, locator: &Locator, index: usize) -> Result<(), BrowserError> {
        if index >= self.headers {
            return Err(BrowserError::NotFound {
                locator: locator.to_string(),
                index,
            });
        }
        self.record(format!("click {} {}", locator, index));
        if self.sorts_on_click {
            let column = index;
            self.rows.sort_by(|a, b| {
                let a: f64 = a[column].trim().parse().unwrap_or(f64::MAX);
                let b: f64 = b[column].trim().parse().unwrap_or(f64::MAX);
                a.total_cmp(&b)
            });
        }
        Ok(())
    }

    async fn nested_text(
        &mut self,
        row: &Locator,
        row_index: usize,
        cell: &Locator,
        cell_index: usize,
    ) -> Result<String, BrowserError> {
        let cells = self.rows.get(row_index).ok_or_else(|| BrowserError::NotFound {
            locator: row.to_string(),
            index: row_index,
        })?;
        cells
            .get(cell_index)
            .cloned()
            .ok_or_else(|| BrowserError::NotFound {
                locator: cell.to_string(),
                index: cell_index,
            })
    }

    async fn close(&mut self) -> Result<(), BrowserError> {
        self.record("close".to_string());
        Ok(())
    }
}

struct FakeBrowser {
    page: FakeAccountsPage,
}

#[async_trait]
impl PageFactory for FakeBrowser {
    async fn open(&self) -> Result<Box<dyn Page>, BrowserError> {
        Ok(Box::new(self.page.clone()))
    }
}

fn config(environment: Environment) -> RunnerConfig {
    RunnerConfig {
        environment,
        report_dir: std::env::temp_dir().join(format!("kablamo-ui-{}", uuid::Uuid::new_v4())),
        ..RunnerConfig::default()
    }
}

#[tokio::test]
async fn layout_dev_table_visible() {
    let mut page = FakeAccountsPage::new(&["dev-table"], &[]);
    ui::check_layout(&mut page, &config(Environment::Dev))
        .await
        .unwrap();

    let log = page.log.lock().unwrap().clone();
    assert_eq!(log, vec!["goto https://kablamo.bank/accounts".to_string()]);
}

#[tokio::test]
async fn layout_uat_table_missing_fails() {
    let mut page = FakeAccountsPage::new(&["dev-table"], &[]);
    let err = ui::check_layout(&mut page, &config(Environment::Uat))
        .await
        .unwrap_err();
    assert!(matches!(err, TestError::Check(CheckError::Failed(_))));
    assert!(err.to_string().contains("uat-table"));
}

#[tokio::test]
async fn layout_without_environment_is_skipped() {
    let mut page = FakeAccountsPage::new(&["dev-table", "uat-table"], &[]);
    let err = ui::check_layout(&mut page, &config(Environment::Other("prod".to_string())))
        .await
        .unwrap_err();
    assert!(matches!(err, TestError::Skipped(_)));
}

#[tokio::test]
async fn sort_orders_transaction_values() {
    let mut page = FakeAccountsPage::new(&[], &["30.25", " 4.5 ", "12", "100"]);
    ui::sort_ascending(&mut page, &config(Environment::Dev))
        .await
        .unwrap();

    let log = page.log.lock().unwrap().clone();
    assert_eq!(log[1], "click css=[role=header] 3");
}

#[tokio::test]
async fn unsorted_table_fails() {
    let mut page = FakeAccountsPage::new(&[], &["30", "4", "12"]);
    page.sorts_on_click = false;
    let err = ui::sort_ascending(&mut page, &config(Environment::Dev))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("transaction values"), "{}", err);
}

#[tokio::test]
async fn duplicate_values_are_not_strictly_increasing() {
    let mut page = FakeAccountsPage::new(&[], &["5", "5", "7"]);
    assert!(ui::sort_ascending(&mut page, &config(Environment::Dev))
        .await
        .is_err());
}

#[tokio::test]
async fn short_table_is_a_browser_error() {
    let mut page = FakeAccountsPage::new(&[], &["1", "2"]);
    let err = ui::sort_ascending(&mut page, &config(Environment::Dev))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        TestError::Browser(BrowserError::NotFound { index: 2, .. })
    ));
}

#[tokio::test]
async fn runner_closes_pages_and_reports_ui_group() {
    let page = FakeAccountsPage::new(&["uat-table"], &["1.5", "2.5", "3.5"]);
    let log = Arc::clone(&page.log);

    let mut runner = Runner::new(config(Environment::Uat), Arc::new(FakeBrowser { page }));
    runner.register(ui::cases());
    let summary = runner.run().await.unwrap();

    assert_eq!(summary.count(TestStatus::Passed), 2);
    assert!(summary.success());
    let closes = log.lock().unwrap().iter().filter(|e| *e == "close").count();
    assert_eq!(closes, 2);
}

/// Page whose navigation never finishes
struct StuckPage {
    closes: Arc<Mutex<usize>>,
}

#[async_trait]
impl Page for StuckPage {
    async fn goto(&mut self, _url: &str) -> Result<(), BrowserError> {
        tokio::time::sleep(std::time::Duration::from_secs(30)).await;
        Ok(())
    }

    async fn is_visible(&mut self, _locator: &Locator) -> Result<bool, BrowserError> {
        Ok(false)
    }

    async fn click_nth(&mut self, _locator: &Locator, _index: usize) -> Result<(), BrowserError> {
        Ok(())
    }

    async fn nested_text(
        &mut self,
        _row: &Locator,
        _row_index: usize,
        _cell: &Locator,
        _cell_index: usize,
    ) -> Result<String, BrowserError> {
        Ok(String::new())
    }

    async fn close(&mut self) -> Result<(), BrowserError> {
        *self.closes.lock().unwrap() += 1;
        Ok(())
    }
}

struct StuckBrowser {
    closes: Arc<Mutex<usize>>,
}

#[async_trait]
impl PageFactory for StuckBrowser {
    async fn open(&self) -> Result<Box<dyn Page>, BrowserError> {
        Ok(Box::new(StuckPage {
            closes: Arc::clone(&self.closes),
        }))
    }
}

#[tokio::test]
async fn timed_out_ui_tests_still_close_their_pages() {
    let closes = Arc::new(Mutex::new(0));
    let config = RunnerConfig {
        timeout: std::time::Duration::from_millis(100),
        ..config(Environment::Dev)
    };

    let mut runner = Runner::new(
        config,
        Arc::new(StuckBrowser {
            closes: Arc::clone(&closes),
        }),
    );
    runner.register(ui::cases());
    let summary = runner.run().await.unwrap();
    assert_eq!(summary.count(TestStatus::TimedOut), 2);

    // closing happens on a task spawned when the aborted test drops its page
    for _ in 0..50 {
        if *closes.lock().unwrap() == 2 {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }
    assert_eq!(*closes.lock().unwrap(), 2);
}
