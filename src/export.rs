//! CSV export of the transaction ledger.
//!
//! One row per transaction; the statement header fields are repeated on every
//! row so files from several statements can be concatenated.

use anyhow::{Context, Result};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use tracing::info;

use crate::models::Transaction;

pub const CSV_COLUMNS: [&str; 15] = [
    "source_file",
    "issue_date",
    "due_date",
    "declared_total",
    "client_name",
    "primary_card",
    "cardholder",
    "card_last4",
    "is_international",
    "transaction_date",
    "description",
    "category",
    "installment",
    "amount",
    "extraction_method",
];

pub fn write_transactions<W: Write>(writer: W, transactions: &[Transaction]) -> Result<()> {
    let mut out = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(writer);
    out.write_record(CSV_COLUMNS)?;

    for tx in transactions {
        out.write_record([
            tx.source_file.clone(),
            optional(tx.issue_date),
            optional(tx.due_date),
            format!("{:.2}", tx.declared_total),
            tx.client_name.clone().unwrap_or_default(),
            tx.primary_card.clone().unwrap_or_default(),
            tx.cardholder.clone(),
            tx.card_last4.clone(),
            tx.is_international.to_string(),
            optional(tx.transaction_date),
            tx.description.clone(),
            tx.category.clone(),
            tx.installment.clone().unwrap_or_default(),
            format!("{:.2}", tx.amount),
            tx.extraction_method.as_str().to_string(),
        ])?;
    }

    out.flush()?;
    Ok(())
}

pub fn export_csv(path: &Path, transactions: &[Transaction]) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create CSV file {}", path.display()))?;
    write_transactions(file, transactions)?;
    info!("Wrote {} transactions to {}", transactions.len(), path.display());
    Ok(())
}

fn optional<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ExtractionMethod, TransactionDate};
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;
    use tempfile::tempdir;

    fn sample() -> Transaction {
        Transaction {
            source_file: "fatura.pdf".to_string(),
            issue_date: NaiveDate::from_ymd_opt(2025, 9, 28),
            due_date: NaiveDate::from_ymd_opt(2025, 10, 10),
            declared_total: dec!(1234.5),
            client_name: Some("MARIA SOUZA".to_string()),
            primary_card: Some("5234.XXXX.XXXX.8223".to_string()),
            cardholder: "MARIA SOUZA".to_string(),
            card_last4: "8223".to_string(),
            is_international: false,
            transaction_date: Some(TransactionDate::Partial { day: 3, month: 7 }),
            description: "LOJA, CENTRO 02/05".to_string(),
            category: "Compras".to_string(),
            installment: Some("02/05".to_string()),
            amount: dec!(10),
            extraction_method: ExtractionMethod::Primary,
        }
    }

    #[test]
    fn test_rows_carry_header_fields() {
        let mut buffer = Vec::new();
        write_transactions(&mut buffer, &[sample()]).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("source_file,issue_date,due_date"));
        assert_eq!(
            lines[1],
            "fatura.pdf,2025-09-28,2025-10-10,1234.50,MARIA SOUZA,5234.XXXX.XXXX.8223,\
             MARIA SOUZA,8223,false,03/07,\"LOJA, CENTRO 02/05\",Compras,02/05,10.00,Primary"
        );
    }

    #[test]
    fn test_export_to_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("saida.csv");
        export_csv(&path, &[sample(), sample()]).unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        assert_eq!(reader.records().count(), 2);
    }
}
