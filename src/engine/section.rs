//! Page-scoped section state and its named transitions.
//!
//! The flags are independent on purpose: a statement can be inside a summary
//! block and an ignored block at the same time, and a single line can fire
//! several transitions (e.g. "Lançamentos futuros" both reopens and ignores).
//! Transitions fire in a fixed priority order; `SectionState::admit` then
//! decides whether the line reaches the transaction matcher.

use super::text::{char_position, contains_any};

/// Keywords that (re)enable extraction; may appear many times per page
pub const REOPEN_KEYS: [&str; 3] = ["lancamentos", "transacoes", "minhasdespesas"];

pub const SUMMARY_KEYS: [&str; 4] = [
    "resumodafatura",
    "encargoscobrados",
    "demonstrativodeencargos",
    "resumodespesas",
];

pub const IGNORE_KEYS: [&str; 12] = [
    "preparamosoutrasopcoes",
    "opcoesdepagamento",
    "pagamentominimo",
    "paguesuafatura",
    "limitesdecredito",
    "simulacao",
    "totaldoslancamentosatuais",
    "totalparaproximasfaturas",
    "lancamentosfuturos",
    "comprasparceladas",
    "demaisfaturas",
    "parcelasfuturas",
];

pub const TOTAL_LINE_KEY: &str = "totaldoslancamentosatuais";

pub const INTERNATIONAL_KEYS: [&str; 2] = ["transacoesinternacionais", "lancamentosinternacionais"];

/// Settlement/balance vocabulary; such lines never carry spend
const SETTLEMENT_KEYS: [&str; 2] = ["saldofinanciado", "totalapagar"];
const SETTLEMENT_WORD: &str = "Pagamento";

/// A total label within this many leading characters closes the whole page
const FULL_TOTAL_MAX_OFFSET: usize = 5;

/// Where the "total dos lançamentos atuais" label sits on its line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TotalLine {
    /// Line starts with the label: nothing after it on the page is current spend
    Full,
    /// Label in a second column: only that column is discarded
    Partial,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    ReopenLaunches,
    EnterSummary,
    EnterIgnored { total: Option<TotalLine> },
    InternationalMarker,
}

/// Transitions fired by one line, in priority order
pub fn transitions(key: &str) -> Vec<Transition> {
    let mut fired = Vec::new();
    if contains_any(key, &REOPEN_KEYS) {
        fired.push(Transition::ReopenLaunches);
    }
    if contains_any(key, &SUMMARY_KEYS) {
        fired.push(Transition::EnterSummary);
    }
    if contains_any(key, &IGNORE_KEYS) {
        let total = char_position(key, TOTAL_LINE_KEY).map(|offset| {
            if offset < FULL_TOTAL_MAX_OFFSET {
                TotalLine::Full
            } else {
                TotalLine::Partial
            }
        });
        fired.push(Transition::EnterIgnored { total });
    }
    if contains_any(key, &INTERNATIONAL_KEYS) {
        fired.push(Transition::InternationalMarker);
    }
    fired
}

pub fn is_total_line(key: &str) -> bool {
    key.contains(TOTAL_LINE_KEY)
}

/// `SETTLEMENT_WORD` is checked against the raw line, case-sensitively: an
/// upper-case merchant such as "PAGAMENTO DIGITAL" is still spend.
pub fn is_settlement_line(line: &str, key: &str) -> bool {
    line.contains(SETTLEMENT_WORD) || contains_any(key, &SETTLEMENT_KEYS)
}

/// Why a line was kept away from the matcher
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    AfterFullTotal,
    AfterPartialTotal,
    Ignored,
    Settlement,
    Summary,
    OutsideLaunches,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineGate {
    Skip(SkipReason),
    /// Hand the line to the matcher, keeping at most `max_matches` items
    Extract { max_matches: Option<usize> },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SectionState {
    pub ignored: bool,
    pub in_summary: bool,
    pub in_launches: bool,
    pub seen_total_full: bool,
    pub seen_total_partial: bool,
    pub after_partial_total: bool,
    pub international_marker: bool,
}

impl SectionState {
    /// Nothing carries across a page boundary
    pub fn reset_page(&mut self) {
        *self = Self::default();
    }

    pub fn apply(&mut self, transition: Transition) {
        match transition {
            Transition::ReopenLaunches => {
                self.ignored = false;
                self.in_summary = false;
                self.in_launches = true;
                self.after_partial_total = false;
            }
            Transition::EnterSummary => self.in_summary = true,
            Transition::EnterIgnored { total } => {
                self.ignored = true;
                match total {
                    Some(TotalLine::Full) => {
                        self.seen_total_full = true;
                        self.in_launches = false;
                    }
                    Some(TotalLine::Partial) => {
                        self.seen_total_partial = true;
                        self.after_partial_total = true;
                        self.in_launches = false;
                    }
                    None => {}
                }
            }
            Transition::InternationalMarker => self.international_marker = true,
        }
    }

    /// A new card block starts: totals seen for the previous block no longer
    /// apply. Returns the pending international marker and clears it.
    pub fn start_card_block(&mut self) -> bool {
        self.seen_total_full = false;
        self.seen_total_partial = false;
        std::mem::take(&mut self.international_marker)
    }

    /// Decide whether a line goes to the matcher. The triggering total line
    /// itself is always examined (its first column can hold a real item).
    /// A dated line seen outside any section opens one implicitly, since a
    /// page can continue a listing whose heading was on the previous page.
    pub fn admit(&mut self, line: &str, key: &str, total_line: bool, item_line: bool) -> LineGate {
        if !total_line {
            if self.seen_total_full {
                return LineGate::Skip(SkipReason::AfterFullTotal);
            }
            if self.after_partial_total {
                return LineGate::Skip(SkipReason::AfterPartialTotal);
            }
            if self.ignored {
                return LineGate::Skip(SkipReason::Ignored);
            }
            if !self.in_launches && item_line {
                self.in_launches = true;
            }
        }

        if is_settlement_line(line, key) {
            return LineGate::Skip(SkipReason::Settlement);
        }
        if !total_line {
            if self.in_summary {
                return LineGate::Skip(SkipReason::Summary);
            }
            if !self.in_launches {
                return LineGate::Skip(SkipReason::OutsideLaunches);
            }
        }

        let max_matches = self.seen_total_partial.then_some(1);
        LineGate::Extract { max_matches }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::text::line_key;

    fn fire(state: &mut SectionState, line: &str) -> Vec<Transition> {
        let fired = transitions(&line_key(line));
        for t in &fired {
            state.apply(*t);
        }
        fired
    }

    #[test]
    fn test_reopen_recovers_from_ignored() {
        let mut state = SectionState::default();
        fire(&mut state, "Pagamento mínimo R$ 150,00");
        assert!(state.ignored);
        fire(&mut state, "Lançamentos: compras e saques");
        assert!(!state.ignored);
        assert!(state.in_launches);
    }

    #[test]
    fn test_future_heading_reopens_then_ignores() {
        let mut state = SectionState::default();
        let fired = fire(&mut state, "Lançamentos futuros");
        assert_eq!(
            fired,
            vec![
                Transition::ReopenLaunches,
                Transition::EnterIgnored { total: None }
            ]
        );
        assert!(state.ignored);
    }

    #[test]
    fn test_total_line_position_decides_full_or_partial() {
        let key = line_key("Total dos lançamentos atuais 1.234,56");
        assert!(transitions(&key).contains(&Transition::EnterIgnored {
            total: Some(TotalLine::Full)
        }));

        let key = line_key("10/09 PADARIA 12,00 Total dos lançamentos atuais 1.234,56");
        assert!(transitions(&key).contains(&Transition::EnterIgnored {
            total: Some(TotalLine::Partial)
        }));
    }

    #[test]
    fn test_full_total_blocks_rest_of_page() {
        let mut state = SectionState::default();
        fire(&mut state, "Lançamentos");
        let line = "Total dos lançamentos atuais 500,00";
        fire(&mut state, line);
        let key = line_key(line);
        assert!(matches!(
            state.admit(line, &key, true, false),
            LineGate::Extract { .. }
        ));

        let next = "12/09 LOJA 10,00";
        assert_eq!(
            state.admit(next, &line_key(next), false, true),
            LineGate::Skip(SkipReason::AfterFullTotal)
        );

        state.reset_page();
        assert_eq!(
            state.admit(next, &line_key(next), false, true),
            LineGate::Extract { max_matches: None }
        );
    }

    #[test]
    fn test_partial_total_waits_for_reopen_not_for_dates() {
        // Documented quirk: a date-looking line does not resume reading
        // after a partial total; only a launches keyword does.
        let mut state = SectionState::default();
        fire(&mut state, "Lançamentos");
        let total = "05/09 MERCADO 10,00 Total dos lançamentos atuais 900,00";
        fire(&mut state, total);
        assert_eq!(
            state.admit(total, &line_key(total), true, true),
            LineGate::Extract { max_matches: Some(1) }
        );

        let dated = "06/09 FARMACIA 20,00";
        assert_eq!(
            state.admit(dated, &line_key(dated), false, true),
            LineGate::Skip(SkipReason::AfterPartialTotal)
        );

        fire(&mut state, "Minhas despesas");
        assert_eq!(
            state.admit(dated, &line_key(dated), false, true),
            LineGate::Extract { max_matches: Some(1) }
        );
    }

    #[test]
    fn test_dated_line_opens_launches_implicitly() {
        let mut state = SectionState::default();
        let line = "03/09 POSTO SHELL 80,00";
        assert_eq!(
            state.admit(line, &line_key(line), false, true),
            LineGate::Extract { max_matches: None }
        );
        assert!(state.in_launches);

        let mut state = SectionState::default();
        let plain = "Continua na próxima página";
        assert_eq!(
            state.admit(plain, &line_key(plain), false, false),
            LineGate::Skip(SkipReason::OutsideLaunches)
        );
    }

    #[test]
    fn test_summary_and_settlement_skips() {
        let mut state = SectionState::default();
        fire(&mut state, "Lançamentos");
        let line = "Saldo financiado 300,00";
        assert_eq!(
            state.admit(line, &line_key(line), false, false),
            LineGate::Skip(SkipReason::Settlement)
        );
        let line = "Pagamento recebido 100,00";
        assert_eq!(
            state.admit(line, &line_key(line), false, false),
            LineGate::Skip(SkipReason::Settlement)
        );
        let line = "05/09 PAGAMENTO DIGITAL LTDA 20,00";
        assert!(matches!(
            state.admit(line, &line_key(line), false, true),
            LineGate::Extract { .. }
        ));

        fire(&mut state, "Resumo da fatura");
        let line = "01/09 ENCARGOS 10,00";
        assert_eq!(
            state.admit(line, &line_key(line), false, true),
            LineGate::Skip(SkipReason::Summary)
        );
    }

    #[test]
    fn test_card_block_takes_international_marker() {
        let mut state = SectionState::default();
        fire(&mut state, "Transações Internacionais");
        state.seen_total_partial = true;
        assert!(state.start_card_block());
        assert!(!state.seen_total_partial);
        assert!(!state.start_card_block());
    }
}
