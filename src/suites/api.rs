//! API tests
//!
//! GET /accounts
//! * `active` : boolean, returns active accounts. Mandatory.
//! * `search` : string, filters accounts by the given text. Optional.
//!
//! PUT /transfer
//! * `from` : account number to transfer from
//! * `to` : account number to transfer to
//! * `amount` : total money amount

use tracing::{debug, info};

use crate::api::bank::{AccountQuery, BankClient, TransferRequest};
use crate::expect::{expect_contains, expect_eq, expect_gt, expect_not_ok, expect_ok};
use crate::runner::{TestCase, TestError};

pub const GROUP: &str = "API tests";

pub const SOURCE_ACCOUNT: u64 = 123;
pub const DESTINATION_ACCOUNT: u64 = 321;
pub const SEARCH_TERM: &str = "savings";

pub fn cases() -> Vec<TestCase> {
    vec![
        TestCase::new(GROUP, "A user will always have an account", |ctx| async move {
            user_has_account(&ctx.bank).await
        }),
        TestCase::new(GROUP, "Mandatory field testing", |ctx| async move {
            mandatory_fields(&ctx.bank).await
        }),
        TestCase::new(GROUP, "Successful money transfer scenario", |ctx| async move {
            transfer_half_balance(&ctx.bank).await
        }),
    ]
}

/// Only the body is checked here, the status is covered by `mandatory_fields`
pub async fn user_has_account(bank: &BankClient) -> Result<(), TestError> {
    let (status, accounts) = bank.list_accounts_raw(&AccountQuery::default()).await?;
    debug!("GET /accounts answered {} with {} account(s)", status, accounts.len());
    expect_gt(accounts.len(), 0, "number of accounts")?;
    Ok(())
}

/// Only queries carrying `active` are accepted
pub async fn mandatory_fields(bank: &BankClient) -> Result<(), TestError> {
    let no_params = bank.list_accounts(&AccountQuery::default()).await;
    let active_only = bank.list_accounts(&AccountQuery::active()).await;
    let search_only = bank.list_accounts(&AccountQuery::search(SEARCH_TERM)).await;
    let both = bank
        .list_accounts(&AccountQuery::active().with_search(SEARCH_TERM))
        .await;

    expect_not_ok(no_params, "No parameters are accepted")?;
    expect_ok(active_only)?;
    expect_not_ok(search_only, "Error is returned")?;
    expect_ok(both)?;
    Ok(())
}

/// Transfer half of the available money and check the receipt and the new balance
pub async fn transfer_half_balance(bank: &BankClient) -> Result<(), TestError> {
    let current_balance =
        expect_ok(bank.account_balance(&AccountQuery::active(), SOURCE_ACCOUNT).await)?;
    let half = current_balance / 2.0;

    let receipt = expect_ok(
        bank.transfer(&TransferRequest {
            from: SOURCE_ACCOUNT,
            to: DESTINATION_ACCOUNT,
            amount: half,
        })
        .await,
    )?;
    info!(
        "Transfer {} moved {} from {} to {}",
        receipt.data.transaction_id, receipt.data.amount, SOURCE_ACCOUNT, DESTINATION_ACCOUNT
    );

    expect_contains(&receipt.data.transaction_id, "ID", "transaction id")?;
    expect_eq(receipt.data.amount, half, "transferred amount")?;

    let new_balance =
        expect_ok(bank.account_balance(&AccountQuery::active(), SOURCE_ACCOUNT).await)?;
    expect_eq(new_balance, half, "balance after transfer")?;
    Ok(())
}
