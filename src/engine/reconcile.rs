//! Statement-level reconciliation.
//!
//! When the extracted sum misses the declared total, the summary pages are
//! searched for labeled charges (undershoot) or credits (overshoot) that
//! explain the gap. Matching figures are appended as synthetic transactions.
//! Whatever cannot be explained is left for the validator to report.

use anyhow::Result;
use itertools::Itertools;
use regex::Regex;
use rust_decimal::Decimal;
use tracing::{info, warn};

use super::generic::MASKED_LAST4;
use super::money::parse_money;
use crate::config::EngineConfig;
use crate::models::{ExtractionMethod, StatementHeader, Transaction, TransactionDate};

pub const RECONCILIATION_PREFIX: &str = "RECONCILIATION - ";
const RECONCILIATION_CATEGORY: &str = "Financeiro";
const UNKNOWN_HOLDER: &str = "Unknown";

const CHARGE_PATTERNS: [(&str, &str); 5] = [
    (r"(?i)Encargos\s*(?:R\$)?\s*([\d\.,]+)", "Encargos de Financiamento"),
    (r"(?i)IOF\s*(?:R\$)?\s*([\d\.,]+)", "IOF de Financiamento"),
    (r"(?i)Juros\s*(?:R\$)?\s*([\d\.,]+)", "Juros"),
    (r"(?i)Multa\s*(?:R\$)?\s*([\d\.,]+)", "Multa"),
    (r"(?i)Tarifa\s*(?:R\$)?\s*([\d\.,]+)", "Tarifa"),
];

const CREDIT_PATTERNS: [(&str, &str); 4] = [
    (
        r"(?i)Saldo\s*(?:Financiado|Anterior)\s*(?:R\$)?\s*(-?[\d\.,]+)",
        "Saldo Anterior",
    ),
    (r"(?i)Crédito\s*(?:R\$)?\s*(-?[\d\.,]+)", "Crédito Fatura"),
    (r"(?i)Desconto\s*(?:R\$)?\s*(-?[\d\.,]+)", "Desconto"),
    (
        r"(?i)Pagamento\s*(?:a\s*maior)?\s*(?:R\$)?\s*(-?[\d\.,]+)",
        "Pagamento Antecipado",
    ),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Nothing to do: empty ledger, unknown total, or gap within tolerance
    NotNeeded,
    Resolved { added: Vec<String> },
    Unresolved { difference: Decimal },
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Candidate {
    label: &'static str,
    value: Decimal,
}

pub struct Reconciler {
    charges: Vec<(Regex, &'static str)>,
    credits: Vec<(Regex, &'static str)>,
    tolerance: Decimal,
    duplicate_tolerance: Decimal,
    summary_pages: usize,
    max_candidates: usize,
    max_subset_size: usize,
}

impl Reconciler {
    pub fn new(config: &EngineConfig) -> Result<Self> {
        Ok(Self {
            charges: compile_patterns(&CHARGE_PATTERNS)?,
            credits: compile_patterns(&CREDIT_PATTERNS)?,
            tolerance: config.reconcile_tolerance,
            duplicate_tolerance: config.duplicate_tolerance,
            summary_pages: config.summary_pages,
            max_candidates: config.max_candidates,
            max_subset_size: config.max_subset_size,
        })
    }

    pub fn reconcile(
        &self,
        transactions: &mut Vec<Transaction>,
        header: &StatementHeader,
        pages: &[String],
        source_file: &str,
    ) -> ReconcileOutcome {
        if transactions.is_empty() || !header.has_declared_total() {
            return ReconcileOutcome::NotNeeded;
        }
        let extracted: Decimal = transactions.iter().map(|t| t.amount).sum();
        let diff = header.declared_total - extracted;
        if diff.abs() < self.tolerance {
            return ReconcileOutcome::NotNeeded;
        }

        info!(
            "Discrepancy detected: declared={} extracted={} diff={}, attempting reconciliation",
            header.declared_total, extracted, diff
        );
        let summary = pages
            .iter()
            .take(self.summary_pages)
            .map(String::as_str)
            .join("\n");

        let accepted = if diff > Decimal::ZERO {
            self.find_charges(&summary, diff, transactions)
        } else {
            self.find_credit(&summary, diff.abs(), transactions)
        };

        match accepted {
            Some(found) => {
                let added = found
                    .into_iter()
                    .map(|c| {
                        transactions.push(synthetic_transaction(header, source_file, &c));
                        c.label.to_string()
                    })
                    .collect();
                ReconcileOutcome::Resolved { added }
            }
            None => {
                warn!("Reconciliation failed. Remaining diff: {}", diff);
                ReconcileOutcome::Unresolved { difference: diff }
            }
        }
    }

    /// A single charge matching the gap, else the first subset (size 2 and
    /// up, within the configured bounds) of distinct charges whose sum does.
    fn find_charges(
        &self,
        summary: &str,
        diff: Decimal,
        transactions: &[Transaction],
    ) -> Option<Vec<Candidate>> {
        let candidates: Vec<Candidate> = scan(&self.charges, summary)
            .filter(|c| c.value > Decimal::ZERO)
            .collect();

        if let Some(single) = candidates.iter().find(|c| {
            (diff - c.value).abs() < self.tolerance && !self.is_duplicate(transactions, c)
        }) {
            info!("Reconciliation: found missing {} of {}", single.label, single.value);
            return Some(vec![single.clone()]);
        }

        let distinct: Vec<Candidate> = candidates
            .into_iter()
            .unique_by(|c| (c.label, c.value.normalize()))
            .take(self.max_candidates)
            .collect();
        let largest = self.max_subset_size.min(distinct.len());

        for size in 2..=largest {
            let combo = distinct.iter().combinations(size).find(|combo| {
                let sum: Decimal = combo.iter().map(|c| c.value).sum();
                (diff - sum).abs() < self.tolerance
            });
            if let Some(combo) = combo {
                info!("Reconciliation: found combination of {} items matching {}", size, diff);
                return Some(
                    combo
                        .into_iter()
                        .filter(|c| !self.is_duplicate(transactions, c))
                        .cloned()
                        .collect(),
                );
            }
        }
        None
    }

    /// First credit whose absolute value matches the overshoot, booked negative
    fn find_credit(
        &self,
        summary: &str,
        target: Decimal,
        transactions: &[Transaction],
    ) -> Option<Vec<Candidate>> {
        scan(&self.credits, summary)
            .filter(|c| (c.value.abs() - target).abs() < self.tolerance)
            .map(|c| Candidate {
                label: c.label,
                value: -c.value.abs(),
            })
            .find(|c| !self.is_duplicate(transactions, c))
            .map(|c| {
                info!("Reconciliation: found missing credit {} of {}", c.label, c.value);
                vec![c]
            })
    }

    fn is_duplicate(&self, transactions: &[Transaction], candidate: &Candidate) -> bool {
        let label = candidate.label.to_lowercase();
        transactions.iter().any(|t| {
            (t.amount - candidate.value).abs() < self.duplicate_tolerance
                && (t.description.to_lowercase().contains(&label)
                    || t.category.to_lowercase().contains(&label))
        })
    }
}

fn compile_patterns(patterns: &[(&str, &'static str)]) -> Result<Vec<(Regex, &'static str)>> {
    let mut compiled = Vec::with_capacity(patterns.len());
    for (pattern, label) in patterns {
        compiled.push((Regex::new(pattern)?, *label));
    }
    Ok(compiled)
}

fn scan<'a>(
    patterns: &'a [(Regex, &'static str)],
    text: &'a str,
) -> impl Iterator<Item = Candidate> + 'a {
    patterns.iter().flat_map(move |(re, label)| {
        re.captures_iter(text).filter_map(move |caps| {
            Some(Candidate {
                label: *label,
                value: parse_money(caps.get(1)?.as_str()),
            })
        })
    })
}

fn synthetic_transaction(
    header: &StatementHeader,
    source_file: &str,
    candidate: &Candidate,
) -> Transaction {
    Transaction {
        source_file: source_file.to_string(),
        issue_date: header.issue_date,
        due_date: header.due_date,
        declared_total: header.declared_total,
        client_name: header.client_name.clone(),
        primary_card: header.primary_card.clone(),
        cardholder: header
            .client_name
            .clone()
            .unwrap_or_else(|| UNKNOWN_HOLDER.to_string()),
        card_last4: MASKED_LAST4.to_string(),
        is_international: false,
        transaction_date: header.issue_date.map(TransactionDate::Resolved),
        description: format!("{}{}", RECONCILIATION_PREFIX, candidate.label),
        category: RECONCILIATION_CATEGORY.to_string(),
        installment: None,
        amount: candidate.value,
        extraction_method: ExtractionMethod::Reconciliation,
    }
}
