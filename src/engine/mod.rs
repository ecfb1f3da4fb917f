//! Statement-line interpretation engine.
//!
//! `StatementProcessor` is the entry point: a pure function of a document's
//! page texts to its header, ledger and validation result.

pub mod block;
pub mod generic;
pub mod header;
pub mod matcher;
pub mod money;
pub mod processor;
pub mod reconcile;
pub mod section;
pub mod text;
pub mod validate;

pub use money::parse_money;
pub use processor::StatementProcessor;
