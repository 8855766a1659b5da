//! Clients for the HTTP services under test

pub mod bank;
