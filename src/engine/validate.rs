use rust_decimal::Decimal;
use tracing::warn;

use crate::models::{StatementHeader, Transaction, ValidationResult, ValidationStatus};

/// Compare the extracted sum with the declared total. `difference` is
/// extracted minus declared.
pub fn validate(
    transactions: &[Transaction],
    header: &StatementHeader,
    tolerance: Decimal,
) -> ValidationResult {
    let extracted: Decimal = transactions.iter().map(|t| t.amount).sum();
    let difference = extracted - header.declared_total;

    let status = if transactions.is_empty() {
        ValidationStatus::Empty
    } else if difference.abs() <= tolerance {
        ValidationStatus::Ok
    } else {
        warn!(
            "Validation discrepancy: declared={} extracted={} diff={}",
            header.declared_total, extracted, difference
        );
        ValidationStatus::Discrepant
    };

    ValidationResult {
        status,
        declared_total: header.declared_total,
        extracted_total: extracted,
        difference,
    }
}
