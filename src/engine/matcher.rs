//! Transaction pattern matching on a single statement line.
//!
//! A line may hold several items side by side (two-column layouts), so the
//! primary pattern is applied repeatedly. Amounts immediately followed by `%`
//! are interest rates, not items; the regex engine has no lookahead, so rate
//! figures are masked out of the line before matching.

use anyhow::Result;
use regex::Regex;
use rust_decimal::Decimal;
use std::borrow::Cow;
use std::ops::Range;
use tracing::debug;

use super::money::{parse_day_month, parse_money, resolve_transaction_date, DateResolution};
use super::text::fold;
use crate::models::TransactionDate;

const AMOUNT: &str = r"-?\s*(?:\d{1,3}(?:\.\d{3})*|\d+),\d{2}";

/// Payment and direct-debit reversals settle the previous balance
const SETTLEMENT_DESCRIPTIONS: [&str; 2] = ["pagamento", "debito aut"];

/// Per-line inputs the matcher needs from the classifier
#[derive(Debug, Clone, Copy)]
pub struct MatchContext {
    pub total_line: bool,
    pub declared_total: Decimal,
    pub total_line_tolerance: Decimal,
    pub due_date: Option<chrono::NaiveDate>,
    /// Date given to undated IOF/TAR lines
    pub inherited_date: Option<TransactionDate>,
    pub max_matches: Option<usize>,
}

/// One accepted item, before it is attributed to a card
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineItem {
    pub date: Option<TransactionDate>,
    pub description: String,
    pub installment: Option<String>,
    pub amount: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rejection {
    NoDigits,
    SettlementReversal,
    RepeatsDeclaredTotal,
    FuturePreview,
}

pub struct LinePatterns {
    primary: Regex,
    fee: Regex,
    fee_prefix: Regex,
    dated_prefix: Regex,
    percentage: Regex,
    installment: Regex,
}

impl LinePatterns {
    pub fn new() -> Result<Self> {
        Ok(Self {
            primary: Regex::new(&format!(r"(\d{{2}}/\d{{2}})\s+(.*?)\s+({})", AMOUNT))?,
            fee: Regex::new(&format!(r"^\s*((?:IOF|TAR)\s+.*?)\s+({})", AMOUNT))?,
            fee_prefix: Regex::new(r"^\s*(?:IOF|TAR)\b")?,
            dated_prefix: Regex::new(r"^\s*\d{2}/\d{2}\b")?,
            percentage: Regex::new(r"(?:\d{1,3}(?:\.\d{3})*|\d+),\d{2}\s*%")?,
            installment: Regex::new(r"(\d{2}/\d{2})$")?,
        })
    }

    /// Line opens with a `dd/mm` date or an IOF/TAR label
    pub fn is_item_line(&self, line: &str) -> bool {
        self.dated_prefix.is_match(line) || self.fee_prefix.is_match(line)
    }

    /// Extract every acceptable item on `line`
    pub fn match_line(&self, line: &str, ctx: &MatchContext) -> Vec<LineItem> {
        let masked = self.mask_percentages(line);

        let mut raw: Vec<(Option<Range<usize>>, Range<usize>, Range<usize>)> = self
            .primary
            .captures_iter(&masked)
            .filter_map(|caps| {
                Some((
                    Some(caps.get(1)?.range()),
                    caps.get(2)?.range(),
                    caps.get(3)?.range(),
                ))
            })
            .collect();

        if let Some(max) = ctx.max_matches {
            if raw.len() > max {
                debug!("Capping {} matches to {} after partial total", raw.len(), max);
                raw.truncate(max);
            }
        }

        if raw.is_empty() && self.fee_prefix.is_match(line) {
            if let Some(caps) = self.fee.captures(&masked) {
                if let (Some(desc), Some(amount)) = (caps.get(1), caps.get(2)) {
                    raw.push((None, desc.range(), amount.range()));
                }
            }
        }

        raw.into_iter()
            .filter_map(|(date, desc, amount)| {
                let date_text = date.map(|r| &line[r]);
                match self.accept(date_text, line[desc].trim(), &line[amount], ctx) {
                    Ok(item) => Some(item),
                    Err(reason) => {
                        debug!("Dropped item on line {:?}: {:?}", line.trim(), reason);
                        None
                    }
                }
            })
            .collect()
    }

    fn accept(
        &self,
        date_text: Option<&str>,
        description: &str,
        amount_text: &str,
        ctx: &MatchContext,
    ) -> std::result::Result<LineItem, Rejection> {
        if !amount_text.chars().any(|c| c.is_ascii_digit()) {
            return Err(Rejection::NoDigits);
        }
        let amount = parse_money(amount_text);

        if amount < Decimal::ZERO {
            let folded = fold(description);
            if SETTLEMENT_DESCRIPTIONS.iter().any(|w| folded.contains(w)) {
                return Err(Rejection::SettlementReversal);
            }
        }

        if ctx.total_line && (amount - ctx.declared_total).abs() < ctx.total_line_tolerance {
            return Err(Rejection::RepeatsDeclaredTotal);
        }

        let installment = self
            .installment
            .captures(description)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string());

        let date = match date_text.and_then(parse_day_month) {
            Some((day, month)) => match resolve_transaction_date(day, month, ctx.due_date) {
                DateResolution::Current(date) => Some(date),
                DateResolution::FuturePreview => return Err(Rejection::FuturePreview),
            },
            None => ctx.inherited_date,
        };

        Ok(LineItem {
            date,
            description: description.to_string(),
            installment,
            amount,
        })
    }

    /// Swap the decimal comma of rate figures ("2,50 %") for `;` so the amount
    /// pattern cannot match them. Byte offsets are unchanged.
    pub fn mask_percentages<'a>(&self, line: &'a str) -> Cow<'a, str> {
        if !line.contains('%') {
            return Cow::Borrowed(line);
        }
        let ranges: Vec<Range<usize>> = self.percentage.find_iter(line).map(|m| m.range()).collect();
        if ranges.is_empty() {
            return Cow::Borrowed(line);
        }
        Cow::Owned(
            line.char_indices()
                .map(|(i, c)| {
                    if c == ',' && ranges.iter().any(|r| r.contains(&i)) {
                        ';'
                    } else {
                        c
                    }
                })
                .collect(),
        )
    }
}
