//! Test registry and parallel runner
//!
//! Tests are independent async bodies. Up to `effective_workers()` of them run at
//! once, each bounded by the per-test timeout. Results come back in
//! registration order.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::api::bank::{ApiError, BankClient};
use crate::browser::{BrowserError, PageFactory};
use crate::config::{ConfigError, RunnerConfig};
use crate::expect::CheckError;

/// Why a test did not pass
#[derive(Debug, Error)]
pub enum TestError {
    #[error(transparent)]
    Check(#[from] CheckError),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Browser(#[from] BrowserError),
    #[error("skipped: {0}")]
    Skipped(String),
}

#[derive(Debug, Error)]
pub enum SetupError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("could not prepare report directory: {0}")]
    Io(#[from] std::io::Error),
}

/// Shared handles every test body receives
#[derive(Clone)]
pub struct TestContext {
    pub config: Arc<RunnerConfig>,
    pub bank: BankClient,
    pub pages: Arc<dyn PageFactory>,
}

pub type TestFuture = Pin<Box<dyn Future<Output = Result<(), TestError>> + Send>>;
type TestBody = Arc<dyn Fn(TestContext) -> TestFuture + Send + Sync>;

pub struct TestCase {
    pub group: &'static str,
    pub title: &'static str,
    body: TestBody,
}

impl TestCase {
    pub fn new<F, Fut>(group: &'static str, title: &'static str, body: F) -> Self
    where
        F: Fn(TestContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), TestError>> + Send + 'static,
    {
        Self {
            group,
            title,
            body: Arc::new(move |ctx| Box::pin(body(ctx))),
        }
    }

    pub fn full_title(&self) -> String {
        format!("{} {}", self.group, self.title)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TestStatus {
    Passed,
    Failed,
    TimedOut,
    Skipped,
}

impl TestStatus {
    pub fn label(&self) -> &'static str {
        match self {
            TestStatus::Passed => "passed",
            TestStatus::Failed => "failed",
            TestStatus::TimedOut => "timed out",
            TestStatus::Skipped => "skipped",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TestOutcome {
    pub group: String,
    pub title: String,
    pub status: TestStatus,
    pub duration_ms: u128,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u128,
    pub environment: String,
    pub workers: usize,
    pub outcomes: Vec<TestOutcome>,
}

impl RunSummary {
    pub fn count(&self, status: TestStatus) -> usize {
        self.outcomes.iter().filter(|o| o.status == status).count()
    }

    /// No failures and no timeouts
    pub fn success(&self) -> bool {
        self.count(TestStatus::Failed) == 0 && self.count(TestStatus::TimedOut) == 0
    }
}

/// Runs once before any test. A failure here aborts the run.
pub async fn global_setup(config: &RunnerConfig) -> Result<(), SetupError> {
    config.validate()?;
    tokio::fs::create_dir_all(&config.report_dir).await?;

    info!("API target: {}", config.api_base_url);
    info!("UI target: {} (ENVIRONMENT={})", config.ui_base_url, config.environment);
    info!(
        "{} worker(s), {} ms per test, {} ms per action",
        config.effective_workers(),
        config.timeout.as_millis(),
        config.action_timeout.as_millis()
    );
    Ok(())
}

pub struct Runner {
    context: TestContext,
    cases: Vec<TestCase>,
}

impl Runner {
    pub fn new(config: RunnerConfig, pages: Arc<dyn PageFactory>) -> Self {
        let bank = BankClient::new(&config.api_base_url, &config.api_token, config.action_timeout);
        Self {
            context: TestContext {
                config: Arc::new(config),
                bank,
                pages,
            },
            cases: Vec::new(),
        }
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.context.config
    }

    pub fn register(&mut self, cases: impl IntoIterator<Item = TestCase>) {
        self.cases.extend(cases);
    }

    /// Tests that survive the `grep` filter, in registration order
    pub fn selected(&self) -> Vec<&TestCase> {
        match &self.context.config.grep {
            Some(pattern) => self
                .cases
                .iter()
                .filter(|case| case.full_title().contains(pattern.as_str()))
                .collect(),
            None => self.cases.iter().collect(),
        }
    }

    pub async fn run(&self) -> Result<RunSummary, SetupError> {
        global_setup(&self.context.config).await?;

        let started_at = Utc::now();
        let clock = Instant::now();
        let workers = self.context.config.effective_workers();
        let timeout = self.context.config.timeout;
        let selected = self.selected();

        info!("Running {} test(s) using {} worker(s)", selected.len(), workers);

        let semaphore = Arc::new(Semaphore::new(workers));
        let mut set = JoinSet::new();

        for (index, case) in selected.iter().enumerate() {
            let semaphore = Arc::clone(&semaphore);
            let body = Arc::clone(&case.body);
            let ctx = self.context.clone();
            let group = case.group;
            let title = case.title;

            set.spawn(async move {
                let outcome = match semaphore.acquire_owned().await {
                    Ok(_permit) => run_one(group, title, body, ctx, timeout).await,
                    Err(e) => TestOutcome {
                        group: group.to_string(),
                        title: title.to_string(),
                        status: TestStatus::Failed,
                        duration_ms: 0,
                        message: Some(format!("worker pool unavailable: {}", e)),
                    },
                };
                (index, outcome)
            });
        }

        let mut slots: Vec<Option<TestOutcome>> = vec![None; selected.len()];
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((index, outcome)) => slots[index] = Some(outcome),
                Err(e) => error!("Test task failed to join: {}", e),
            }
        }

        Ok(RunSummary {
            run_id: Uuid::new_v4(),
            started_at,
            duration_ms: clock.elapsed().as_millis(),
            environment: self.context.config.environment.to_string(),
            workers,
            outcomes: slots.into_iter().flatten().collect(),
        })
    }
}

async fn run_one(
    group: &'static str,
    title: &'static str,
    body: TestBody,
    ctx: TestContext,
    timeout: Duration,
) -> TestOutcome {
    debug!("▶ {} › {}", group, title);
    let clock = Instant::now();

    // own task so a panic in the body is contained and a timeout can abort it
    let mut handle = tokio::spawn(body(ctx));
    let (status, message) = match tokio::time::timeout(timeout, &mut handle).await {
        Err(_) => {
            handle.abort();
            (
                TestStatus::TimedOut,
                Some(format!("Test timeout of {}ms exceeded", timeout.as_millis())),
            )
        }
        Ok(Err(join_error)) => (
            TestStatus::Failed,
            Some(format!("test panicked: {}", join_error)),
        ),
        Ok(Ok(Ok(()))) => (TestStatus::Passed, None),
        Ok(Ok(Err(TestError::Skipped(reason)))) => (TestStatus::Skipped, Some(reason)),
        Ok(Ok(Err(e))) => (TestStatus::Failed, Some(e.to_string())),
    };

    TestOutcome {
        group: group.to_string(),
        title: title.to_string(),
        status,
        duration_ms: clock.elapsed().as_millis(),
        message,
    }
}
