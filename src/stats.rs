//! Spending aggregates over a processed statement

use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;

use crate::models::{ExtractionMethod, Transaction};

const FEE_KEYWORDS: [&str; 4] = ["MULTA", "JUROS", "ENCARGOS", "ANUIDADE"];
const TOP_LIMIT: usize = 5;

/// Which extraction path produced the ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExtractionMode {
    Primary,
    Generic,
}

impl ExtractionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExtractionMode::Primary => "Primary",
            ExtractionMode::Generic => "Generic",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopTransaction {
    pub description: String,
    pub cardholder: String,
    pub amount: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatementStats {
    pub transaction_count: usize,
    pub total: Decimal,
    /// Everything except fees and IOF
    pub purchases: Decimal,
    pub iof: Decimal,
    pub international: Decimal,
    pub fees: Decimal,
    pub installments: Decimal,
    /// Sorted by amount, largest first
    pub by_category: Vec<(String, Decimal)>,
    pub by_cardholder: Vec<(String, Decimal)>,
    pub top: Vec<TopTransaction>,
    pub mode: ExtractionMode,
}

impl StatementStats {
    pub fn from_transactions(transactions: &[Transaction]) -> Self {
        let mut by_category: HashMap<&str, Decimal> = HashMap::new();
        let mut by_cardholder: HashMap<&str, Decimal> = HashMap::new();
        let mut total = Decimal::ZERO;
        let mut purchases = Decimal::ZERO;
        let mut iof = Decimal::ZERO;
        let mut international = Decimal::ZERO;
        let mut fees = Decimal::ZERO;
        let mut installments = Decimal::ZERO;

        for tx in transactions {
            let description = tx.description.to_uppercase();
            let is_iof = description.contains("IOF");
            let is_fee = FEE_KEYWORDS.iter().any(|k| description.contains(k));

            total += tx.amount;
            if is_iof {
                iof += tx.amount;
            }
            if is_fee {
                fees += tx.amount;
            }
            if !is_iof && !is_fee {
                purchases += tx.amount;
            }
            if tx.is_international {
                international += tx.amount;
            }
            if tx.installment.is_some() {
                installments += tx.amount;
            }

            *by_category.entry(tx.category.as_str()).or_default() += tx.amount;
            *by_cardholder.entry(tx.cardholder.as_str()).or_default() += tx.amount;
        }

        let mut top: Vec<&Transaction> = transactions.iter().collect();
        top.sort_by(|a, b| b.amount.cmp(&a.amount));
        let top = top
            .into_iter()
            .take(TOP_LIMIT)
            .map(|tx| TopTransaction {
                description: tx.description.clone(),
                cardholder: tx.cardholder.clone(),
                amount: tx.amount,
            })
            .collect();

        let mode = if transactions
            .iter()
            .any(|t| t.extraction_method == ExtractionMethod::Generic)
        {
            ExtractionMode::Generic
        } else {
            ExtractionMode::Primary
        };

        Self {
            transaction_count: transactions.len(),
            total,
            purchases,
            iof,
            international,
            fees,
            installments,
            by_category: sorted_desc(by_category),
            by_cardholder: sorted_desc(by_cardholder),
            top,
            mode,
        }
    }
}

/// Largest first; ties broken by name so output is stable
fn sorted_desc(totals: HashMap<&str, Decimal>) -> Vec<(String, Decimal)> {
    let mut entries: Vec<(String, Decimal)> = totals
        .into_iter()
        .map(|(name, value)| (name.to_string(), value))
        .collect();
    entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    entries
}
