use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Header fields read once from the first page of a statement
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatementHeader {
    /// Zero means "not found", never a real total
    pub declared_total: Decimal,
    pub issue_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub client_name: Option<String>,
    /// Masked card number as printed, e.g. `5234.XXXX.XXXX.8223`
    pub primary_card: Option<String>,
}

impl StatementHeader {
    pub fn has_declared_total(&self) -> bool {
        !self.declared_total.is_zero()
    }

    /// Last four digits of the primary card, when the header carried one
    pub fn primary_last4(&self) -> Option<String> {
        let card = self.primary_card.as_deref()?;
        let digits: Vec<char> = card.chars().filter(|c| c.is_ascii_digit()).collect();
        if digits.len() < 4 {
            return None;
        }
        Some(digits[digits.len() - 4..].iter().collect())
    }
}

/// How a transaction entered the ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExtractionMethod {
    Primary,
    Generic,
    Reconciliation,
}

impl ExtractionMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExtractionMethod::Primary => "Primary",
            ExtractionMethod::Generic => "Generic",
            ExtractionMethod::Reconciliation => "Reconciliation",
        }
    }
}

/// Transaction date: absolute when the year could be inferred, otherwise the
/// day/month pair exactly as printed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransactionDate {
    Resolved(NaiveDate),
    Partial { day: u32, month: u32 },
}

impl fmt::Display for TransactionDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionDate::Resolved(date) => write!(f, "{}", date.format("%Y-%m-%d")),
            TransactionDate::Partial { day, month } => write!(f, "{:02}/{:02}", day, month),
        }
    }
}

impl Serialize for TransactionDate {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

/// One ledger line
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Transaction {
    pub source_file: String,
    pub issue_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub declared_total: Decimal,
    pub client_name: Option<String>,
    pub primary_card: Option<String>,
    pub cardholder: String,
    pub card_last4: String,
    pub is_international: bool,
    pub transaction_date: Option<TransactionDate>,
    pub description: String,
    pub category: String,
    pub installment: Option<String>,
    pub amount: Decimal,
    pub extraction_method: ExtractionMethod,
}

/// Outcome of comparing the extracted sum against the declared total
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ValidationStatus {
    Ok,
    Discrepant,
    Empty,
}

impl ValidationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationStatus::Ok => "OK",
            ValidationStatus::Discrepant => "DISCREPANT",
            ValidationStatus::Empty => "EMPTY",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationResult {
    pub status: ValidationStatus,
    pub declared_total: Decimal,
    pub extracted_total: Decimal,
    /// extracted - declared
    pub difference: Decimal,
}

/// Auxiliary figures collected while reading a statement
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatementMetadata {
    /// "Pagamento efetuado" printed on the first page, as a positive figure
    pub payment_received: Decimal,
    /// Declared subtotal per card, in the order the blocks were opened
    pub card_subtotals: Vec<(String, Decimal)>,
    /// Sum of captured "Produtos e serviços" aggregate items
    pub aggregate_total: Decimal,
    /// blake3 over the page texts
    pub fingerprint: String,
    pub page_count: usize,
}

/// Everything the engine produces for one document
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessedStatement {
    pub source_file: String,
    pub header: StatementHeader,
    pub transactions: Vec<Transaction>,
    pub validation: ValidationResult,
    pub metadata: StatementMetadata,
}

impl ProcessedStatement {
    pub fn extracted_total(&self) -> Decimal {
        self.transactions.iter().map(|t| t.amount).sum()
    }

    pub fn used_generic_extraction(&self) -> bool {
        self.transactions
            .iter()
            .any(|t| t.extraction_method == ExtractionMethod::Generic)
    }
}
