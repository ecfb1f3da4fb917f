use chrono::NaiveDate;
use fatura::config::EngineConfig;
use fatura::engine::StatementProcessor;
use fatura::models::{ExtractionMethod, ProcessedStatement, TransactionDate, ValidationStatus};
use fatura::source::load_document;
use fatura::stats::{ExtractionMode, StatementStats};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::path::Path;

fn processor() -> StatementProcessor {
    StatementProcessor::new(EngineConfig::default()).expect("processor builds")
}

fn process_fixture(name: &str) -> ProcessedStatement {
    let path = Path::new("tests/data").join(name);
    let pages = load_document(&path).expect("fixture loads");
    processor().process(name, &pages)
}

fn process_text(text: &str) -> ProcessedStatement {
    let pages: Vec<String> = text.split('\x0C').map(str::to_string).collect();
    processor().process("inline.txt", &pages)
}

fn date(y: i32, m: u32, d: u32) -> Option<TransactionDate> {
    NaiveDate::from_ymd_opt(y, m, d).map(TransactionDate::Resolved)
}

#[test]
fn test_multicard_statement_reconciles_to_declared_total() {
    let result = process_fixture("fatura_multicartao.txt");

    assert_eq!(result.header.declared_total, dec!(1296.90));
    assert_eq!(result.header.client_name.as_deref(), Some("MARIA SOUZA"));
    assert_eq!(result.header.due_date, NaiveDate::from_ymd_opt(2025, 10, 10));
    assert_eq!(result.metadata.page_count, 2);
    assert_eq!(result.metadata.payment_received, dec!(980.00));

    let descriptions: Vec<&str> = result
        .transactions
        .iter()
        .map(|t| t.description.as_str())
        .collect();
    assert_eq!(
        descriptions,
        vec![
            "SUPERMERCADO BOM",
            "POSTO SHELL",
            "LOJA RENNER 03/10",
            "UBER TRIP",
            "RESTAURANTE SABOR",
            "FARMACIA PAGUE MENOS",
            "AMAZON US",
            "IOF TRANSACAO EXTERIOR",
            "RECONCILIATION - Multa",
        ]
    );

    let txs = &result.transactions;
    assert_eq!(txs[0].cardholder, "MARIA SOUZA");
    assert_eq!(txs[0].card_last4, "8223");
    assert_eq!(txs[2].installment.as_deref(), Some("03/10"));
    assert_eq!(txs[2].transaction_date, date(2025, 9, 15));

    // Card block carries across the page break
    assert_eq!(txs[5].cardholder, "JOAO SOUZA");
    assert_eq!(txs[5].card_last4, "4455");
    assert!(!txs[5].is_international);

    assert_eq!(txs[6].cardholder, "ANA SOUZA");
    assert!(txs[6].is_international);
    assert!(txs[7].is_international);
    assert_eq!(txs[7].transaction_date, date(2025, 9, 18));

    let synthetic = &txs[8];
    assert_eq!(synthetic.amount, dec!(10.00));
    assert_eq!(synthetic.extraction_method, ExtractionMethod::Reconciliation);
    assert_eq!(synthetic.card_last4, "XXXX");

    assert_eq!(
        result.metadata.card_subtotals,
        vec![
            ("8223".to_string(), dec!(700.00)),
            ("4455".to_string(), dec!(486.90)),
            ("7788".to_string(), dec!(100.00)),
        ]
    );
    assert_eq!(result.validation.status, ValidationStatus::Ok);
    assert_eq!(result.validation.difference, Decimal::ZERO);
}

#[test]
fn test_lines_after_full_total_are_not_spend() {
    let result = process_fixture("fatura_multicartao.txt");
    assert!(result
        .transactions
        .iter()
        .all(|t| !t.description.contains("04/10")));
}

#[test]
fn test_processing_is_idempotent() {
    let path = Path::new("tests/data/fatura_multicartao.txt");
    let pages = load_document(path).unwrap();
    let processor = processor();

    let first = processor.process("fatura_multicartao.txt", &pages);
    let second = processor.process("fatura_multicartao.txt", &pages);
    assert_eq!(first, second);
    assert_eq!(first.metadata.fingerprint, second.metadata.fingerprint);
}

#[test]
fn test_unknown_layout_uses_generic_extraction() {
    let result = process_fixture("fatura_outro_banco.txt");

    assert_eq!(result.header.declared_total, dec!(33.40));
    assert_eq!(result.header.client_name.as_deref(), Some("Ana Lima"));
    assert_eq!(result.transactions.len(), 2);
    assert!(result.used_generic_extraction());
    assert_eq!(result.transactions[0].transaction_date, date(2024, 5, 10));
    assert_eq!(result.transactions[1].description, "PADARIA CENTRAL");
    assert_eq!(result.validation.status, ValidationStatus::Ok);

    let stats = StatementStats::from_transactions(&result.transactions);
    assert_eq!(stats.mode, ExtractionMode::Generic);
}

#[test]
fn test_statement_without_items_is_empty() {
    let result = process_text("Titular ANA LIMA\nTotal desta fatura 100,00\n");
    assert!(result.transactions.is_empty());
    assert_eq!(result.validation.status, ValidationStatus::Empty);
}

#[test]
fn test_partial_total_keeps_first_column_only() {
    let result = process_text(
        "Titular ANA LIMA\n\
         Cartão 4111.XXXX.XXXX.1111\n\
         Emissão: 28/09/2025\n\
         Vencimento: 10/10/2025\n\
         Total desta fatura 45,00\n\
         Lançamentos: compras e saques\n\
         07/09 FARMACIA 40,00 Total dos lançamentos atuais 999,50\n\
         08/09 PARCELA FUTURA 10,00\n\
         Lançamentos: compras e saques\n\
         09/09 PADARIA 5,00 10/09 OUTRA LOJA 7,00\n",
    );

    let descriptions: Vec<&str> = result
        .transactions
        .iter()
        .map(|t| t.description.as_str())
        .collect();
    assert_eq!(descriptions, vec!["FARMACIA", "PADARIA"]);
    assert_eq!(result.transactions[0].card_last4, "1111");
    assert_eq!(result.validation.status, ValidationStatus::Ok);
}

#[test]
fn test_aggregate_item_dropped_when_subtotal_excludes_it() {
    let result = process_text(
        "Titular MARIA SOUZA\n\
         Cartão 5234.XXXX.XXXX.8223\n\
         Emissão: 28/09/2025\n\
         Vencimento: 10/10/2025\n\
         Total desta fatura 130,00\n\
         Lançamentos: compras e saques\n\
         MARIA SOUZA (final 8223) 130,00\n\
         Lançamentos produtos e serviços 30,00\n\
         05/09 MERCADO BOM 100,00\n\
         06/09 FARMACIA 30,00\n",
    );

    assert_eq!(result.transactions.len(), 2);
    assert!(result
        .transactions
        .iter()
        .all(|t| t.description != "Produtos e serviços"));
    assert_eq!(result.metadata.aggregate_total, dec!(30.00));
    assert_eq!(result.extracted_total(), dec!(130.00));
    assert_eq!(result.validation.status, ValidationStatus::Ok);
}

#[test]
fn test_unexplained_gap_is_discrepant() {
    let result = process_text(
        "Titular ANA LIMA\n\
         Vencimento: 10/10/2025\n\
         Total desta fatura 500,00\n\
         Lançamentos: compras e saques\n\
         01/10 LOJA CENTRO 120,00\n",
    );

    assert_eq!(result.transactions.len(), 1);
    assert_eq!(result.validation.status, ValidationStatus::Discrepant);
    assert_eq!(result.validation.difference, dec!(-380.00));
}

#[test]
fn test_dated_item_mentioning_final_is_not_a_card_header() {
    let result = process_text(
        "Titular ANA LIMA\n\
         Cartão 4111.XXXX.XXXX.1111\n\
         Emissão: 28/09/2025\n\
         Vencimento: 10/10/2025\n\
         Total desta fatura 130,00\n\
         Lançamentos: compras e saques\n\
         15/09 INGRESSO JOGO FINAL 2025 100,00\n\
         16/09 PADARIA 30,00\n",
    );

    assert_eq!(result.transactions.len(), 2);
    assert_eq!(result.transactions[0].description, "INGRESSO JOGO FINAL 2025");
    for tx in &result.transactions {
        assert_eq!(tx.cardholder, "ANA LIMA");
        assert_eq!(tx.card_last4, "1111");
    }
    assert!(result.metadata.card_subtotals.is_empty());
    assert_eq!(result.validation.status, ValidationStatus::Ok);
}

#[test]
fn test_fee_line_takes_previous_date_without_card_header() {
    let result = process_text(
        "Titular ANA LIMA\n\
         Cartão 4111.XXXX.XXXX.1111\n\
         Emissão: 28/09/2025\n\
         Vencimento: 10/10/2025\n\
         Total desta fatura 100,00\n\
         Lançamentos: compras e saques\n\
         15/09 AMAZON US 96,50\n\
         IOF TRANSACAO EXTERIOR 3,50\n",
    );

    assert_eq!(result.transactions.len(), 2);
    let iof = &result.transactions[1];
    assert_eq!(iof.description, "IOF TRANSACAO EXTERIOR");
    assert_eq!(iof.transaction_date, date(2025, 9, 15));
    assert_eq!(result.validation.status, ValidationStatus::Ok);
}
