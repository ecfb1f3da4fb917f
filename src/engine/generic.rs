//! Best-effort extraction for layouts the issuer path does not recognize.
//!
//! Two loose line shapes are tried, `date description amount` first and then
//! `description date amount`. Every record is tagged `Generic`.

use anyhow::Result;
use chrono::{Datelike, Local, NaiveDate};
use regex::Regex;
use tracing::debug;

use super::money::{parse_day_month, parse_money};
use crate::category::Categorizer;
use crate::models::{ExtractionMethod, StatementHeader, Transaction, TransactionDate};

pub const GENERIC_CARD: &str = "GENERIC";
pub const MASKED_LAST4: &str = "XXXX";
const UNKNOWN_HOLDER: &str = "Unknown";

pub struct GenericExtractor {
    date_first: Regex,
    date_middle: Regex,
    skip: Regex,
}

impl GenericExtractor {
    pub fn new() -> Result<Self> {
        let amount = r"-?(?:\d{1,3}(?:\.\d{3})*|\d+),\d{2}";
        Ok(Self {
            date_first: Regex::new(&format!(r"(\d{{2}}/\d{{2}})\s+(.+?)\s+({})", amount))?,
            date_middle: Regex::new(&format!(r"(.+?)\s+(\d{{2}}/\d{{2}})\s+({})", amount))?,
            skip: Regex::new(r"(?i)total|saldo|pagamento|vencimento")?,
        })
    }

    pub fn extract(
        &self,
        pages: &[String],
        source_file: &str,
        header: &StatementHeader,
        categorizer: &Categorizer,
    ) -> Vec<Transaction> {
        let year = header
            .due_date
            .map(|d| d.year())
            .unwrap_or_else(|| Local::now().year());
        let holder = header
            .client_name
            .clone()
            .unwrap_or_else(|| UNKNOWN_HOLDER.to_string());

        let mut transactions = Vec::new();
        for line in pages.iter().flat_map(|page| page.lines()) {
            let line = line.trim();
            if line.is_empty() || self.skip.is_match(line) {
                continue;
            }
            let Some((date_text, description, amount_text)) = self.split_line(line) else {
                continue;
            };
            let Some((day, month)) = parse_day_month(date_text) else {
                continue;
            };
            let transaction_date = match NaiveDate::from_ymd_opt(year, month, day) {
                Some(date) => TransactionDate::Resolved(date),
                None => TransactionDate::Partial { day, month },
            };

            transactions.push(Transaction {
                source_file: source_file.to_string(),
                issue_date: header.issue_date,
                due_date: header.due_date,
                declared_total: header.declared_total,
                client_name: header.client_name.clone(),
                primary_card: Some(GENERIC_CARD.to_string()),
                cardholder: holder.clone(),
                card_last4: MASKED_LAST4.to_string(),
                is_international: false,
                transaction_date: Some(transaction_date),
                description: description.to_string(),
                category: categorizer.categorize(description).to_string(),
                installment: None,
                amount: parse_money(amount_text),
                extraction_method: ExtractionMethod::Generic,
            });
        }
        debug!("Generic extraction found {} transactions", transactions.len());
        transactions
    }

    /// (date, description, amount) from whichever shape matches first
    fn split_line<'l>(&self, line: &'l str) -> Option<(&'l str, &'l str, &'l str)> {
        if let Some(caps) = self.date_first.captures(line) {
            return Some((
                caps.get(1)?.as_str(),
                caps.get(2)?.as_str().trim(),
                caps.get(3)?.as_str(),
            ));
        }
        let caps = self.date_middle.captures(line)?;
        Some((
            caps.get(2)?.as_str(),
            caps.get(1)?.as_str().trim(),
            caps.get(3)?.as_str(),
        ))
    }
}
