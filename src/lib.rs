//! Fatura - credit-card statement line interpreter
//!
//! This library turns the page texts of an Itaú-style credit-card statement
//! into a ledger of transactions attributed to card holders, then reconciles
//! that ledger against the total the statement declares.

pub mod category;
pub mod config;
pub mod engine;
pub mod error;
pub mod export;
pub mod models;
pub mod source;
pub mod stats;
