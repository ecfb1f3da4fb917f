//! Output formatting module for CLI display
//!
//! Terminal tables and JSON documents for processed statements. Nothing here
//! computes figures; it only lays out what the engine produced.

use colored::Colorize;
use fatura::models::{ProcessedStatement, ValidationResult, ValidationStatus};
use fatura::stats::StatementStats;
use rust_decimal::Decimal;
use serde::Serialize;
use tabled::{
    settings::{object::Columns, Alignment, Style},
    Table, Tabled,
};

/// Format as Brazilian Real: "R$ 1.234,56"
pub fn format_currency(value: Decimal) -> String {
    let sign = if value < Decimal::ZERO { "-" } else { "" };
    let formatted = format!("{:.2}", value.abs());
    let (integer_part, decimal_part) = formatted
        .split_once('.')
        .unwrap_or((formatted.as_str(), "00"));

    let with_separators: String = integer_part
        .chars()
        .rev()
        .enumerate()
        .flat_map(|(i, c)| {
            if i > 0 && i % 3 == 0 {
                vec!['.', c]
            } else {
                vec![c]
            }
        })
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();

    format!("R$ {}{},{}", sign, with_separators, decimal_part)
}

fn colored_status(status: ValidationStatus) -> String {
    match status {
        ValidationStatus::Ok => status.as_str().green().bold().to_string(),
        ValidationStatus::Discrepant => status.as_str().red().bold().to_string(),
        ValidationStatus::Empty => status.as_str().yellow().bold().to_string(),
    }
}

fn colored_difference(difference: Decimal) -> String {
    let text = format_currency(difference);
    if difference.is_zero() {
        text
    } else {
        text.red().to_string()
    }
}

/// Full terminal report for one processed statement
pub fn format_statement_table(statement: &ProcessedStatement, stats: &StatementStats) -> String {
    let mut output = String::new();
    let header = &statement.header;

    output.push_str(&format!(
        "\n{} {}\n",
        "📄".cyan().bold(),
        statement.source_file.bold()
    ));
    output.push_str(&format!(
        "{:<18} {}\n",
        "Client:".bold(),
        header.client_name.as_deref().unwrap_or("-")
    ));
    output.push_str(&format!(
        "{:<18} {}\n",
        "Card:".bold(),
        header.primary_card.as_deref().unwrap_or("-")
    ));
    output.push_str(&format!(
        "{:<18} {}\n",
        "Issued:".bold(),
        header
            .issue_date
            .map(|d| d.format("%d/%m/%Y").to_string())
            .unwrap_or_else(|| "-".to_string())
    ));
    output.push_str(&format!(
        "{:<18} {}\n",
        "Due:".bold(),
        header
            .due_date
            .map(|d| d.format("%d/%m/%Y").to_string())
            .unwrap_or_else(|| "-".to_string())
    ));
    output.push_str(&format!("{:<18} {}\n\n", "Mode:".bold(), stats.mode.as_str()));

    if statement.transactions.is_empty() {
        output.push_str(&format!("{} No transactions found\n", "ℹ".blue().bold()));
    } else {
        #[derive(Tabled)]
        struct TransactionRow {
            #[tabled(rename = "Date")]
            date: String,
            #[tabled(rename = "Description")]
            description: String,
            #[tabled(rename = "Holder")]
            holder: String,
            #[tabled(rename = "Card")]
            card: String,
            #[tabled(rename = "Category")]
            category: String,
            #[tabled(rename = "Intl")]
            international: String,
            #[tabled(rename = "Amount")]
            amount: String,
        }

        let rows: Vec<TransactionRow> = statement
            .transactions
            .iter()
            .map(|tx| TransactionRow {
                date: tx
                    .transaction_date
                    .map(|d| d.to_string())
                    .unwrap_or_else(|| "-".to_string()),
                description: tx.description.clone(),
                holder: tx.cardholder.clone(),
                card: tx.card_last4.clone(),
                category: tx.category.clone(),
                international: (if tx.is_international { "✓" } else { "" }).to_string(),
                amount: format_currency(tx.amount),
            })
            .collect();

        let mut table = Table::new(&rows);
        table.with(Style::modern());
        table.modify(Columns::new(6..), Alignment::right());
        output.push_str(&table.to_string());
        output.push('\n');
    }

    if !stats.by_category.is_empty() {
        output.push_str(&format!("\n{} By category\n", "📊".cyan().bold()));
        for (category, value) in &stats.by_category {
            output.push_str(&format!("  {:<20} {:>16}\n", category, format_currency(*value)));
        }
        output.push_str(&format!("\n{} By holder\n", "👤".cyan().bold()));
        for (holder, value) in &stats.by_cardholder {
            output.push_str(&format!("  {:<20} {:>16}\n", holder, format_currency(*value)));
        }
        output.push_str(&format!(
            "\n  {:<20} {:>16}\n  {:<20} {:>16}\n  {:<20} {:>16}\n  {:<20} {:>16}\n",
            "Purchases",
            format_currency(stats.purchases),
            "IOF",
            format_currency(stats.iof),
            "International",
            format_currency(stats.international),
            "Fees",
            format_currency(stats.fees),
        ));
    }

    let validation = &statement.validation;
    output.push_str(&format!("\n{} Validation\n", "━".repeat(60).bright_black()));
    output.push_str(&format!(
        "{:<18} {}\n",
        "Declared:".bold(),
        format_currency(validation.declared_total)
    ));
    output.push_str(&format!(
        "{:<18} {}\n",
        "Extracted:".bold(),
        format_currency(validation.extracted_total)
    ));
    output.push_str(&format!(
        "{:<18} {}\n",
        "Difference:".bold(),
        colored_difference(validation.difference)
    ));
    output.push_str(&format!(
        "{:<18} {}\n",
        "Status:".bold(),
        colored_status(validation.status)
    ));

    output
}

/// JSON document for a batch of processed statements
pub fn format_statements_json(statements: &[(ProcessedStatement, StatementStats)]) -> String {
    #[derive(Serialize)]
    struct JsonStatement<'a> {
        #[serde(flatten)]
        statement: &'a ProcessedStatement,
        statistics: &'a StatementStats,
    }

    let documents: Vec<JsonStatement<'_>> = statements
        .iter()
        .map(|(statement, statistics)| JsonStatement {
            statement,
            statistics,
        })
        .collect();

    serde_json::to_string_pretty(&documents)
        .unwrap_or_else(|e| format!(r#"{{"error": "JSON serialization failed: {}"}}"#, e))
}

/// One line of the batch validation report
#[derive(Debug, Clone, Serialize)]
pub struct ValidationRow {
    pub file: String,
    #[serde(flatten)]
    pub outcome: ValidationOutcome,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ValidationOutcome {
    Checked(ValidationResult),
    Failed { error: String },
}

impl ValidationRow {
    pub fn passed(&self) -> bool {
        matches!(
            &self.outcome,
            ValidationOutcome::Checked(result) if result.status == ValidationStatus::Ok
        )
    }
}

pub fn format_validation_table(rows: &[ValidationRow]) -> String {
    #[derive(Tabled)]
    struct ReportRow {
        #[tabled(rename = "File")]
        file: String,
        #[tabled(rename = "Status")]
        status: String,
        #[tabled(rename = "Declared")]
        declared: String,
        #[tabled(rename = "Extracted")]
        extracted: String,
        #[tabled(rename = "Difference")]
        difference: String,
    }

    let table_rows: Vec<ReportRow> = rows
        .iter()
        .map(|row| match &row.outcome {
            ValidationOutcome::Checked(result) => ReportRow {
                file: row.file.clone(),
                status: colored_status(result.status),
                declared: format_currency(result.declared_total),
                extracted: format_currency(result.extracted_total),
                difference: colored_difference(result.difference),
            },
            ValidationOutcome::Failed { error } => ReportRow {
                file: row.file.clone(),
                status: "ERROR".red().bold().to_string(),
                declared: "-".to_string(),
                extracted: "-".to_string(),
                difference: error.clone(),
            },
        })
        .collect();

    let mut output = String::new();
    let mut table = Table::new(&table_rows);
    table.with(Style::modern());
    table.modify(Columns::new(2..4), Alignment::right());
    output.push_str(&table.to_string());

    let passed = rows.iter().filter(|row| row.passed()).count();
    let marker = if passed == rows.len() {
        "✓".green().bold()
    } else {
        "⚠".yellow().bold()
    };
    output.push_str(&format!(
        "\n\n{} {}/{} statements match their declared total\n",
        marker,
        passed,
        rows.len()
    ));
    output
}

pub fn format_validation_json(rows: &[ValidationRow]) -> String {
    #[derive(Serialize)]
    struct JsonReport<'a> {
        documents: &'a [ValidationRow],
        passed: usize,
        total: usize,
    }

    let report = JsonReport {
        documents: rows,
        passed: rows.iter().filter(|row| row.passed()).count(),
        total: rows.len(),
    };

    serde_json::to_string_pretty(&report)
        .unwrap_or_else(|e| format!(r#"{{"error": "JSON serialization failed: {}"}}"#, e))
}

/// Page dump for `inspect`
pub fn format_pages(file: &str, pages: &[String]) -> String {
    let mut output = format!(
        "{} Inspecting file: {}\n{} pages\n",
        "📊".cyan().bold(),
        file.green(),
        pages.len()
    );
    for (index, page) in pages.iter().enumerate() {
        output.push_str(&format!(
            "\n{} Page {} ({} lines)\n",
            "📌".cyan().bold(),
            index + 1,
            page.lines().count()
        ));
        output.push_str(page);
        if !page.ends_with('\n') {
            output.push('\n');
        }
    }
    output
}

pub fn format_pages_json(file: &str, pages: &[String]) -> String {
    #[derive(Serialize)]
    struct JsonPages<'a> {
        file: &'a str,
        pages: &'a [String],
    }

    serde_json::to_string_pretty(&JsonPages { file, pages })
        .unwrap_or_else(|e| format!(r#"{{"error": "JSON serialization failed: {}"}}"#, e))
}
