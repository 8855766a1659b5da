pub mod client;
pub mod models;

pub use client::BankClient;
pub use models::{
    Account, AccountQuery, AccountsData, AccountsEnvelope, ApiError, TransferReceipt,
    TransferRequest,
};
