//! First-page header extraction: declared total, dates, client, card.
//!
//! Each field is independent. A missing label leaves that field at its
//! default and never aborts the document.

use anyhow::Result;
use regex::Regex;
use rust_decimal::Decimal;
use tracing::debug;

use super::money::{parse_full_date, parse_money};
use super::text::compact_lower;
use crate::models::StatementHeader;

/// Amount that may carry stray spaces between digit groups ("1 .234, 56")
const SPACED_AMOUNT: &str = r"\d{1,3}(?: ?\.? ?\d{3})* ?, ?\d{2}";

pub struct HeaderExtractor {
    /// Tried in order on the literal page text
    literal_totals: Vec<Regex>,
    /// Tried in order on the space-stripped, lowercased page text
    compact_totals: Vec<Regex>,
    due_date: Regex,
    issue_date: Regex,
    client: Regex,
    card: Regex,
    payment_received: Regex,
    generic_total: Regex,
    generic_due_date: Regex,
    greeting: Regex,
}

impl HeaderExtractor {
    pub fn new() -> Result<Self> {
        let literal_totals = vec![
            Regex::new(&format!(r"Total\s*desta\s*fatura\s*({})", SPACED_AMOUNT))?,
            Regex::new(&format!(
                r"(?s)O total da sua fatura é:.*?R\$\s*({})",
                SPACED_AMOUNT
            ))?,
        ];

        let compact_totals = [
            r"totaldestafatura.*?(\d[\d\.,]*)",
            r"ototaldasuafaturaé.*?r\$(\d[\d\.,]*)",
            r"ototaldasuafaturae.*?r\$(\d[\d\.,]*)",
            r"l?lançamentosatuais(\d[\d\.,]*)",
            r"l?lancamentosatuais(\d[\d\.,]*)",
        ]
        .iter()
        .map(|p| Regex::new(p))
        .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(Self {
            literal_totals,
            compact_totals,
            due_date: Regex::new(r"Vencimento:\s*(\d{2}/\d{2}/\d{4})")?,
            issue_date: Regex::new(r"Emissão:\s*(\d{2}/\d{2}/\d{4})")?,
            client: Regex::new(r"Titular\s+(.+)")?,
            card: Regex::new(r"Cartão\s+(\d{4}\.XXXX\.XXXX\.\d{4})")?,
            payment_received: Regex::new(r"pagamentoefetuado.*?-(\d[\d\.,]*)")?,
            generic_total: Regex::new(
                r"(?i)(?:Total|Valor)\s*(?:da\s*fatura|a\s*pagar|total)?\s*(?:R\$)?\s*(\d[\d\.,]*)",
            )?,
            generic_due_date: Regex::new(r"(?i)Vencimento\s*:?\s*(\d{2}/\d{2}/\d{4})")?,
            greeting: Regex::new(r"Olá,\s*(\p{Lu}\p{Ll}+(?: \p{Lu}\p{Ll}+)*)")?,
        })
    }

    /// Issuer-layout header. First matching total pattern wins.
    pub fn extract(&self, text: &str) -> StatementHeader {
        let mut header = StatementHeader {
            declared_total: self.declared_total(text),
            ..Default::default()
        };

        header.due_date = first_group(&self.due_date, text).and_then(parse_full_date);
        header.issue_date = first_group(&self.issue_date, text).and_then(parse_full_date);
        header.client_name = first_group(&self.client, text)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        header.primary_card = first_group(&self.card, text).map(str::to_string);

        debug!(
            "Header: total={} due={:?} issue={:?} client={:?} card={:?}",
            header.declared_total,
            header.due_date,
            header.issue_date,
            header.client_name,
            header.primary_card
        );
        header
    }

    fn declared_total(&self, text: &str) -> Decimal {
        if let Some(raw) = self
            .literal_totals
            .iter()
            .find_map(|re| first_group(re, text))
        {
            return parse_money(raw);
        }

        let compact = compact_lower(text);
        self.compact_totals
            .iter()
            .find_map(|re| first_group(re, &compact))
            .map(parse_money)
            .unwrap_or(Decimal::ZERO)
    }

    /// Looser header used by the generic fallback: any "total"/"valor" label
    /// followed by an amount, and the name from a greeting line.
    pub fn extract_generic(&self, text: &str) -> StatementHeader {
        StatementHeader {
            declared_total: first_group(&self.generic_total, text)
                .map(parse_money)
                .unwrap_or(Decimal::ZERO),
            issue_date: None,
            due_date: first_group(&self.generic_due_date, text).and_then(parse_full_date),
            client_name: first_group(&self.greeting, text).map(str::to_string),
            primary_card: None,
        }
    }

    /// "Pagamento efetuado ... -1.234,56" on the first page, as a positive amount
    pub fn payment_received(&self, text: &str) -> Decimal {
        let compact = compact_lower(text);
        first_group(&self.payment_received, &compact)
            .map(parse_money)
            .unwrap_or(Decimal::ZERO)
    }
}

fn first_group<'t>(re: &Regex, text: &'t str) -> Option<&'t str> {
    re.captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}
