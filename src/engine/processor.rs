//! The per-document control loop.
//!
//! Pages are walked strictly in order. Section flags reset at each page;
//! the open card block and the ledger carry across pages. After the loop the
//! last block is finalized, the generic fallback runs if the issuer path came
//! up empty, and the statement is reconciled and validated.

use anyhow::Result;
use blake3::Hasher;
use regex::Regex;
use rust_decimal::Decimal;
use tracing::{debug, info};

use super::block::{CardBlock, CardBlockCursor};
use super::generic::GenericExtractor;
use super::header::HeaderExtractor;
use super::matcher::{LinePatterns, MatchContext};
use super::money::parse_money;
use super::reconcile::{ReconcileOutcome, Reconciler};
use super::section::{is_total_line, transitions, LineGate, SectionState, Transition};
use super::text::{fold, line_key};
use super::validate::validate;
use crate::category::Categorizer;
use crate::config::{EngineConfig, FALLBACK_CATEGORY};
use crate::models::{
    ExtractionMethod, ProcessedStatement, StatementHeader, StatementMetadata, Transaction,
    TransactionDate,
};

pub const AGGREGATE_DESCRIPTION: &str = "Produtos e serviços";
pub const IOF_PASSTHROUGH_DESCRIPTION: &str = "IOF INTERNACIONAL";
const AGGREGATE_KEY: &str = "lancamentosprodutoseservicos";
const UNKNOWN: &str = "Unknown";

/// Shareable across threads: holds only compiled patterns and the
/// immutable configuration.
pub struct StatementProcessor {
    config: EngineConfig,
    categorizer: Categorizer,
    header: HeaderExtractor,
    lines: LinePatterns,
    generic: GenericExtractor,
    reconciler: Reconciler,
    card_header: Regex,
    card_subtotal: Regex,
    aggregate_amount: Regex,
    iof_passthrough: Regex,
}

/// Mutable state for one document
struct DocumentRun<'d> {
    source_file: &'d str,
    header: &'d StatementHeader,
    state: SectionState,
    cursor: CardBlockCursor,
    transactions: Vec<Transaction>,
    card_subtotals: Vec<(String, Decimal)>,
    aggregate_total: Decimal,
}

impl DocumentRun<'_> {
    fn transaction(&self, description: String, category: String, amount: Decimal) -> Transaction {
        Transaction {
            source_file: self.source_file.to_string(),
            issue_date: self.header.issue_date,
            due_date: self.header.due_date,
            declared_total: self.header.declared_total,
            client_name: self.header.client_name.clone(),
            primary_card: self.header.primary_card.clone(),
            cardholder: self.cursor.holder().to_string(),
            card_last4: self.cursor.last4().to_string(),
            is_international: false,
            transaction_date: None,
            description,
            category,
            installment: None,
            amount,
            extraction_method: ExtractionMethod::Primary,
        }
    }
}

impl StatementProcessor {
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            categorizer: Categorizer::new(&config.categories),
            header: HeaderExtractor::new()?,
            lines: LinePatterns::new()?,
            generic: GenericExtractor::new()?,
            reconciler: Reconciler::new(&config)?,
            card_header: Regex::new(
                r"(?i)(?:^|\s)(?:lançamentos\s*no\s*cartão\s*)?([\p{L}\s\.]+?)\(?final\s*(\d{4})\)?",
            )?,
            card_subtotal: Regex::new(
                r"(?i)final\s*\d{4}[^\d]*(-?\s*(?:\d{1,3}(?:\.\d{3})*|\d+),\d{2})",
            )?,
            aggregate_amount: Regex::new(r"-?(?:\d{1,3}(?:\.\d{3})*|\d+),\d{2}")?,
            iof_passthrough: Regex::new(r"repassedeiof.*?(\d{1,3}(?:\.\d{3})*,\d{2})")?,
            config,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Interpret one document's page texts. Never fails: missing markers and
    /// unparseable fragments surface through the validation result.
    pub fn process(&self, source_file: &str, pages: &[String]) -> ProcessedStatement {
        info!("Processing {} ({} pages)", source_file, pages.len());
        let first_page = pages.first().map(String::as_str).unwrap_or_default();
        let header = if pages.is_empty() {
            StatementHeader::default()
        } else {
            self.header.extract(first_page)
        };

        let (mut transactions, card_subtotals, aggregate_total) =
            self.walk_pages(source_file, &header, pages);

        let mut header = header;
        if transactions.is_empty() || !header.has_declared_total() {
            info!("Issuer layout not recognized in {}, trying generic extraction", source_file);
            header = if pages.is_empty() {
                StatementHeader::default()
            } else {
                self.header.extract_generic(first_page)
            };
            transactions = self
                .generic
                .extract(pages, source_file, &header, &self.categorizer);
            if !transactions.is_empty() {
                info!("Generic extraction: {} transactions", transactions.len());
            }
        }

        match self
            .reconciler
            .reconcile(&mut transactions, &header, pages, source_file)
        {
            ReconcileOutcome::Resolved { added } => {
                info!("Reconciled {} with {:?}", source_file, added)
            }
            ReconcileOutcome::Unresolved { difference } => {
                debug!("{} left unreconciled by {}", source_file, difference)
            }
            ReconcileOutcome::NotNeeded => {}
        }

        let validation = validate(&transactions, &header, self.config.validation_tolerance);
        let metadata = StatementMetadata {
            payment_received: self.header.payment_received(first_page),
            card_subtotals,
            aggregate_total,
            fingerprint: fingerprint(pages),
            page_count: pages.len(),
        };

        ProcessedStatement {
            source_file: source_file.to_string(),
            header,
            transactions,
            validation,
            metadata,
        }
    }

    fn walk_pages(
        &self,
        source_file: &str,
        header: &StatementHeader,
        pages: &[String],
    ) -> (Vec<Transaction>, Vec<(String, Decimal)>, Decimal) {
        let mut run = DocumentRun {
            source_file,
            header,
            state: SectionState::default(),
            cursor: CardBlockCursor::new(
                header.client_name.clone().unwrap_or_else(|| UNKNOWN.to_string()),
                header.primary_last4().unwrap_or_else(|| UNKNOWN.to_string()),
                self.config.block_epsilon,
            ),
            transactions: Vec::new(),
            card_subtotals: Vec::new(),
            aggregate_total: Decimal::ZERO,
        };

        for (index, page) in pages.iter().enumerate() {
            run.state.reset_page();
            if page.trim().is_empty() {
                continue;
            }
            debug!("Page {}", index + 1);
            for line in page.lines() {
                self.process_line(line, &mut run);
            }
        }
        run.cursor.close(&mut run.transactions);

        (run.transactions, run.card_subtotals, run.aggregate_total)
    }

    fn process_line(&self, line: &str, run: &mut DocumentRun<'_>) {
        let key = line_key(line);
        let item_line = self.lines.is_item_line(line);

        // Dated and IOF/TAR lines are items even when they mention "final NNNN"
        if !item_line {
            if let Some(caps) = self.card_header.captures(line) {
                if let (Some(name), Some(last4)) = (caps.get(1), caps.get(2)) {
                    self.enter_card_block(line, name.as_str(), last4.as_str(), run);
                }
            }
        }

        if self.take_iof_passthrough(&key, run) {
            return;
        }

        for transition in transitions(&key) {
            run.state.apply(transition);
            match transition {
                Transition::ReopenLaunches => debug!("Reading launches: {}", line.trim()),
                Transition::EnterSummary => debug!("Entered summary: {}", line.trim()),
                Transition::EnterIgnored { total: Some(kind) } => {
                    debug!("Total line ({:?}): {}", kind, line.trim())
                }
                Transition::EnterIgnored { total: None } => {}
                Transition::InternationalMarker => run.cursor.mark_international(),
            }
        }

        if key.contains(AGGREGATE_KEY) {
            self.capture_aggregate(line, run);
        }

        let total_line = is_total_line(&key);
        let max_matches = match run.state.admit(line, &key, total_line, item_line) {
            LineGate::Extract { max_matches } => max_matches,
            LineGate::Skip(_) => return,
        };

        let ctx = MatchContext {
            total_line,
            declared_total: run.header.declared_total,
            total_line_tolerance: self.config.total_line_tolerance,
            due_date: run.header.due_date,
            inherited_date: run
                .cursor
                .last_date()
                .or(run.header.issue_date.map(TransactionDate::Resolved)),
            max_matches,
        };

        for item in self.lines.match_line(line, &ctx) {
            let international = run.cursor.is_international()
                || run.state.international_marker
                || fold(&item.description).contains("iof");
            let category = self.categorizer.categorize(&item.description).to_string();
            let mut tx = run.transaction(item.description, category, item.amount);
            tx.is_international = international;
            tx.transaction_date = item.date;
            tx.installment = item.installment;
            run.transactions.push(tx);
            run.cursor.record(item.amount, item.date);
        }
    }

    fn enter_card_block(&self, line: &str, raw_name: &str, last4: &str, run: &mut DocumentRun<'_>) {
        let name = raw_name.trim();
        let folded = fold(name);
        let generic = name.chars().count() < 3
            || folded.contains("lancamentos")
            || folded.contains("cartao");

        let holder = if generic {
            // "Lançamentos no cartão (final 1234)": same card continues
            if run.cursor.current().is_some_and(|b| b.last4 == last4) {
                return;
            }
            run.cursor.holder().to_string()
        } else {
            name.to_string()
        };

        let masked = self.lines.mask_percentages(line);
        let subtotal = self
            .card_subtotal
            .captures(&masked)
            .and_then(|caps| caps.get(1))
            .map(|m| parse_money(&line[m.range()]));

        if let Some(value) = subtotal {
            match run.card_subtotals.iter_mut().find(|(card, _)| card == last4) {
                Some(entry) => entry.1 = value,
                None => run.card_subtotals.push((last4.to_string(), value)),
            }
        }

        let mut block = CardBlock::new(holder, last4.to_string(), subtotal);
        block.international = run.state.start_card_block();
        run.cursor.open(block, &mut run.transactions);
    }

    /// "Repasse de IOF" lines carry the international IOF charge on their own
    fn take_iof_passthrough(&self, key: &str, run: &mut DocumentRun<'_>) -> bool {
        if !key.contains("repassedeiof") {
            return false;
        }
        let Some(amount) = self
            .iof_passthrough
            .captures(key)
            .and_then(|caps| caps.get(1))
            .map(|m| parse_money(m.as_str()))
        else {
            return false;
        };

        let category = self
            .categorizer
            .categorize(IOF_PASSTHROUGH_DESCRIPTION)
            .to_string();
        let mut tx = run.transaction(IOF_PASSTHROUGH_DESCRIPTION.to_string(), category, amount);
        tx.is_international = true;
        tx.transaction_date = run.header.issue_date.map(TransactionDate::Resolved);
        run.transactions.push(tx);
        info!("Extracted IOF pass-through: {}", amount);
        true
    }

    /// One "Produtos e serviços" item per card, remembered by its block
    fn capture_aggregate(&self, line: &str, run: &mut DocumentRun<'_>) {
        let Some(amount) = self
            .aggregate_amount
            .find(line)
            .map(|m| parse_money(m.as_str()))
        else {
            return;
        };
        let last4 = run.cursor.last4();
        if run
            .transactions
            .iter()
            .any(|t| t.card_last4 == last4 && t.description == AGGREGATE_DESCRIPTION)
        {
            return;
        }

        let mut tx = run.transaction(
            AGGREGATE_DESCRIPTION.to_string(),
            FALLBACK_CATEGORY.to_string(),
            amount,
        );
        tx.transaction_date = run.header.due_date.map(TransactionDate::Resolved);
        run.transactions.push(tx);
        run.cursor.record_aggregate(run.transactions.len() - 1, amount);
        run.aggregate_total += amount;
        debug!("Captured aggregate item {} for card {}", amount, run.cursor.last4());
    }
}

fn fingerprint(pages: &[String]) -> String {
    let mut hasher = Hasher::new();
    for page in pages {
        hasher.update(page.as_bytes());
        hasher.update(b"\x0c");
    }
    hasher.finalize().to_hex().to_string()
}
