//! Card blocks: the run of lines attributed to one cardholder/card pair.
//!
//! Exactly one block is open at a time. `CardBlockCursor::open` finalizes the
//! previous block before taking its place, and finalizing is where the
//! single-aggregate reconciliation happens.

use rust_decimal::Decimal;
use tracing::{debug, info};

use crate::models::{Transaction, TransactionDate};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardBlock {
    pub holder: String,
    pub last4: String,
    pub international: bool,
    /// Subtotal printed next to the card header, when present
    pub declared_subtotal: Option<Decimal>,
    pub running_sum: Decimal,
    /// Position of the block's "Produtos e serviços" item in the ledger
    pub aggregate_index: Option<usize>,
    /// Date of the latest dated item, lent to undated fee lines
    pub last_date: Option<TransactionDate>,
}

impl CardBlock {
    pub fn new(holder: String, last4: String, declared_subtotal: Option<Decimal>) -> Self {
        Self {
            holder,
            last4,
            international: false,
            declared_subtotal,
            running_sum: Decimal::ZERO,
            aggregate_index: None,
            last_date: None,
        }
    }
}

/// Owner of the currently open block plus the attribution used before any
/// card header has been seen.
#[derive(Debug)]
pub struct CardBlockCursor {
    open: Option<CardBlock>,
    default_holder: String,
    default_last4: String,
    /// Latest dated item attributed while no block was open
    default_last_date: Option<TransactionDate>,
    epsilon: Decimal,
}

impl CardBlockCursor {
    pub fn new(default_holder: String, default_last4: String, epsilon: Decimal) -> Self {
        Self {
            open: None,
            default_holder,
            default_last4,
            default_last_date: None,
            epsilon,
        }
    }

    pub fn current(&self) -> Option<&CardBlock> {
        self.open.as_ref()
    }

    pub fn holder(&self) -> &str {
        self.open
            .as_ref()
            .map(|b| b.holder.as_str())
            .unwrap_or(&self.default_holder)
    }

    pub fn last4(&self) -> &str {
        self.open
            .as_ref()
            .map(|b| b.last4.as_str())
            .unwrap_or(&self.default_last4)
    }

    pub fn is_international(&self) -> bool {
        self.open.as_ref().is_some_and(|b| b.international)
    }

    pub fn mark_international(&mut self) {
        if let Some(block) = self.open.as_mut() {
            block.international = true;
        }
    }

    /// Date lent to undated fee lines: the open block's latest dated item,
    /// else the latest one seen under the default attribution
    pub fn last_date(&self) -> Option<TransactionDate> {
        self.open
            .as_ref()
            .and_then(|b| b.last_date)
            .or(self.default_last_date)
    }

    /// Close whatever is open, then make `block` current
    pub fn open(&mut self, block: CardBlock, transactions: &mut Vec<Transaction>) {
        self.close(transactions);
        info!("New card block: {} (final {})", block.holder, block.last4);
        self.open = Some(block);
    }

    /// Count an item attributed to the open block
    pub fn record(&mut self, amount: Decimal, date: Option<TransactionDate>) {
        match self.open.as_mut() {
            Some(block) => {
                block.running_sum += amount;
                if date.is_some() {
                    block.last_date = date;
                }
            }
            None if date.is_some() => self.default_last_date = date,
            None => {}
        }
    }

    pub fn record_aggregate(&mut self, index: usize, amount: Decimal) {
        if let Some(block) = self.open.as_mut() {
            block.running_sum += amount;
            block.aggregate_index = Some(index);
        }
    }

    /// Finalize the open block. When dropping its aggregate item brings the
    /// running sum strictly closer to the declared subtotal, the item is
    /// removed from `transactions` and returned.
    pub fn close(&mut self, transactions: &mut Vec<Transaction>) -> Option<Transaction> {
        let block = self.open.take()?;
        let (Some(target), Some(index)) = (block.declared_subtotal, block.aggregate_index) else {
            return None;
        };
        let aggregate = transactions.get(index)?.amount;

        let with_aggregate = (block.running_sum - target).abs();
        let without_aggregate = (block.running_sum - aggregate - target).abs();
        debug!(
            "Closing block {}: sum={} subtotal={} aggregate={}",
            block.last4, block.running_sum, target, aggregate
        );

        if without_aggregate < with_aggregate - self.epsilon {
            info!(
                "Removed 'Produtos e serviços' from block {} to match its subtotal",
                block.last4
            );
            return Some(transactions.remove(index));
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ExtractionMethod;
    use rust_decimal_macros::dec;

    fn tx(description: &str, amount: Decimal) -> Transaction {
        Transaction {
            source_file: "f.txt".to_string(),
            issue_date: None,
            due_date: None,
            declared_total: Decimal::ZERO,
            client_name: None,
            primary_card: None,
            cardholder: "ANA".to_string(),
            card_last4: "1111".to_string(),
            is_international: false,
            transaction_date: None,
            description: description.to_string(),
            category: "Outros".to_string(),
            installment: None,
            amount,
            extraction_method: ExtractionMethod::Primary,
        }
    }

    fn cursor() -> CardBlockCursor {
        CardBlockCursor::new("CLIENTE".to_string(), "9999".to_string(), dec!(0.001))
    }

    fn fill(cursor: &mut CardBlockCursor, ledger: &mut Vec<Transaction>, subtotal: Decimal) {
        cursor.open(
            CardBlock::new("ANA".to_string(), "1111".to_string(), Some(subtotal)),
            ledger,
        );
        for amount in [dec!(50.00), dec!(50.00)] {
            ledger.push(tx("LOJA", amount));
            cursor.record(amount, None);
        }
        ledger.push(tx("Produtos e serviços", dec!(30.00)));
        cursor.record_aggregate(ledger.len() - 1, dec!(30.00));
    }

    #[test]
    fn test_aggregate_removed_when_it_explains_the_gap() {
        let mut ledger = vec![tx("ANTERIOR", dec!(5.00))];
        let mut cursor = cursor();
        fill(&mut cursor, &mut ledger, dec!(100.00));

        let removed = cursor.close(&mut ledger).expect("aggregate removed");
        assert_eq!(removed.description, "Produtos e serviços");
        assert_eq!(ledger.len(), 3);
        let block_sum: Decimal = ledger[1..].iter().map(|t| t.amount).sum();
        assert_eq!(block_sum, dec!(100.00));
        assert!(cursor.current().is_none());
    }

    #[test]
    fn test_aggregate_kept_when_sum_already_matches() {
        let mut ledger = Vec::new();
        let mut cursor = cursor();
        fill(&mut cursor, &mut ledger, dec!(130.00));
        assert!(cursor.close(&mut ledger).is_none());
        assert_eq!(ledger.len(), 3);
    }

    #[test]
    fn test_opening_a_block_finalizes_the_previous_one() {
        let mut ledger = Vec::new();
        let mut cursor = cursor();
        fill(&mut cursor, &mut ledger, dec!(100.00));

        cursor.open(
            CardBlock::new("BRUNO".to_string(), "2222".to_string(), None),
            &mut ledger,
        );
        assert_eq!(ledger.len(), 2);
        assert_eq!(cursor.holder(), "BRUNO");
        assert_eq!(cursor.last4(), "2222");
    }

    #[test]
    fn test_block_without_subtotal_is_left_alone() {
        let mut ledger = Vec::new();
        let mut cursor = cursor();
        cursor.open(
            CardBlock::new("ANA".to_string(), "1111".to_string(), None),
            &mut ledger,
        );
        ledger.push(tx("Produtos e serviços", dec!(30.00)));
        cursor.record_aggregate(0, dec!(30.00));
        assert!(cursor.close(&mut ledger).is_none());
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_attribution_before_any_card_header() {
        let mut cursor = cursor();
        assert_eq!(cursor.holder(), "CLIENTE");
        assert_eq!(cursor.last4(), "9999");
        cursor.mark_international();
        assert!(!cursor.is_international());
        cursor.record(dec!(10.00), None);
        assert!(cursor.last_date().is_none());
    }

    #[test]
    fn test_dates_tracked_without_an_open_block() {
        let mut cursor = cursor();
        let date = Some(TransactionDate::Partial { day: 15, month: 9 });
        cursor.record(dec!(96.50), date);
        cursor.record(dec!(3.50), None);
        assert_eq!(cursor.last_date(), date);

        // A fresh block with no dated items still lends the earlier date
        let mut ledger = Vec::new();
        cursor.open(
            CardBlock::new("ANA".to_string(), "1111".to_string(), None),
            &mut ledger,
        );
        assert_eq!(cursor.last_date(), date);

        let later = Some(TransactionDate::Partial { day: 20, month: 9 });
        cursor.record(dec!(1.00), later);
        assert_eq!(cursor.last_date(), later);
    }
}
