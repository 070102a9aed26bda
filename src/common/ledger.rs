// src/common/ledger.rs
//
// Regras de partidas dobradas. Nada aqui toca no banco: os serviços carregam
// os dados, chamam estas funções e só então gravam.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::models::accounts::AccountType;
use crate::models::journal::{JournalEntryLine, JournalLineInput};

/// Casas decimais aceitas nas partidas (NUMERIC(18,2) no banco)
pub const AMOUNT_SCALE: u32 = 2;

/// Maior valor que cabe em NUMERIC(18,2)
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(0xA763_FFFF, 0x0DE0_B6B3, 0, false, AMOUNT_SCALE); // 999_999_999_999_999_999 x 10^-2

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("lançamento precisa de ao menos duas partidas")]
    TooFewLines,

    #[error("partida {line} precisa de exatamente um lado positivo")]
    InvalidLineAmounts { line: usize },

    #[error("lançamento com valor zero")]
    ZeroTotal,

    #[error("débitos {debit} diferentes de créditos {credit}")]
    Unbalanced { debit: Decimal, credit: Decimal },
}

pub trait LineAmounts {
    fn debit(&self) -> Decimal;
    fn credit(&self) -> Decimal;
}

impl LineAmounts for JournalLineInput {
    fn debit(&self) -> Decimal {
        self.debit
    }
    fn credit(&self) -> Decimal {
        self.credit
    }
}

impl LineAmounts for JournalEntryLine {
    fn debit(&self) -> Decimal {
        self.debit
    }
    fn credit(&self) -> Decimal {
        self.credit
    }
}

impl LineAmounts for (Decimal, Decimal) {
    fn debit(&self) -> Decimal {
        self.0
    }
    fn credit(&self) -> Decimal {
        self.1
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Totals {
    pub debit: Decimal,
    pub credit: Decimal,
}

impl Totals {
    pub fn is_balanced(&self) -> bool {
        self.debit == self.credit
    }
}

fn has_valid_scale(value: Decimal) -> bool {
    value.normalize().scale() <= AMOUNT_SCALE
}

/// Uma partida tem exatamente um lado positivo e o outro zerado, sem passar de `MAX_AMOUNT`.
pub fn is_valid_line(debit: Decimal, credit: Decimal) -> bool {
    if debit.is_sign_negative() || credit.is_sign_negative() {
        return false;
    }
    if !has_valid_scale(debit) || !has_valid_scale(credit) {
        return false;
    }
    if debit > MAX_AMOUNT || credit > MAX_AMOUNT {
        return false;
    }
    (debit > Decimal::ZERO) != (credit > Decimal::ZERO)
}

pub fn totals<L: LineAmounts>(lines: &[L]) -> Totals {
    lines.iter().fold(Totals::default(), |acc, line| Totals {
        debit: acc.debit + line.debit(),
        credit: acc.credit + line.credit(),
    })
}

/// Validação estrutural (vale para rascunhos): quantidade mínima e forma de cada partida.
pub fn validate_lines<L: LineAmounts>(lines: &[L]) -> Result<Totals, LedgerError> {
    if lines.len() < 2 {
        return Err(LedgerError::TooFewLines);
    }
    if let Some(line) = lines.iter().position(|l| !is_valid_line(l.debit(), l.credit())) {
        return Err(LedgerError::InvalidLineAmounts { line });
    }
    Ok(totals(lines))
}

/// Tudo o que `validate_lines` exige, mais sum(débito) == sum(crédito) > 0.
/// Condição para efetivar um lançamento.
pub fn ensure_balanced<L: LineAmounts>(lines: &[L]) -> Result<Totals, LedgerError> {
    let totals = validate_lines(lines)?;
    if totals.debit.is_zero() {
        return Err(LedgerError::ZeroTotal);
    }
    if !totals.is_balanced() {
        return Err(LedgerError::Unbalanced { debit: totals.debit, credit: totals.credit });
    }
    Ok(totals)
}

/// Partidas do estorno: débito vira crédito e vice-versa.
pub fn reversed_lines(lines: &[JournalEntryLine]) -> Vec<JournalLineInput> {
    lines
        .iter()
        .map(|line| JournalLineInput {
            account_id: line.account_id,
            description: line.description.clone(),
            debit: line.credit,
            credit: line.debit,
        })
        .collect()
}

/// Saldo pelo lado natural do tipo de conta.
pub fn natural_balance(account_type: AccountType, debit: Decimal, credit: Decimal) -> Decimal {
    if account_type.is_debit_normal() {
        debit - credit
    } else {
        credit - debit
    }
}

/// Saldo acumulado linha a linha.
pub fn running_balances<L: LineAmounts>(account_type: AccountType, lines: &[L]) -> Vec<Decimal> {
    let mut balance = Decimal::ZERO;
    lines
        .iter()
        .map(|line| {
            balance += natural_balance(account_type, line.debit(), line.credit());
            balance
        })
        .collect()
}

// ---
// Períodos (exercícios fiscais)
// ---

pub fn is_valid_period(start: NaiveDate, end: NaiveDate) -> bool {
    start < end
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn line_needs_exactly_one_positive_side() {
        assert!(is_valid_line(dec!(10), dec!(0)));
        assert!(is_valid_line(dec!(0), dec!(0.01)));
        assert!(!is_valid_line(dec!(0), dec!(0)));
        assert!(!is_valid_line(dec!(5), dec!(5)));
        assert!(!is_valid_line(dec!(-5), dec!(0)));
        assert!(!is_valid_line(dec!(0), dec!(-1)));
    }

    #[test]
    fn line_rejects_sub_cent_amounts() {
        assert!(!is_valid_line(dec!(10.001), dec!(0)));
        // zeros à direita não contam como casas extras
        assert!(is_valid_line(dec!(10.5000), dec!(0)));
    }

    #[test]
    fn line_amount_must_fit_the_column() {
        assert!(is_valid_line(dec!(9999999999999999.99), dec!(0)));
        assert!(!is_valid_line(dec!(10000000000000000.00), dec!(0)));
        assert!(!is_valid_line(dec!(0), dec!(100000000000000000000)));

        let huge = vec![(dec!(100000000000000000000), dec!(0)), (dec!(0), dec!(100000000000000000000))];
        assert_eq!(ensure_balanced(&huge), Err(LedgerError::InvalidLineAmounts { line: 0 }));
    }

    #[test]
    fn draft_may_be_unbalanced_but_posting_may_not() {
        let lines = vec![(dec!(100), dec!(0)), (dec!(0), dec!(90))];
        let totals = validate_lines(&lines).unwrap();
        assert!(!totals.is_balanced());

        assert_eq!(
            ensure_balanced(&lines),
            Err(LedgerError::Unbalanced { debit: dec!(100), credit: dec!(90) })
        );
    }

    #[test]
    fn balanced_entry_with_split_credits() {
        let lines = vec![(dec!(150.00), dec!(0)), (dec!(0), dec!(100.00)), (dec!(0), dec!(50.00))];
        let totals = ensure_balanced(&lines).unwrap();
        assert_eq!(totals.debit, dec!(150));
        assert_eq!(totals.credit, dec!(150));
    }

    #[test]
    fn single_line_is_rejected() {
        assert_eq!(validate_lines(&[(dec!(1), dec!(0))]), Err(LedgerError::TooFewLines));
    }

    #[test]
    fn reports_first_invalid_line_index() {
        let lines = vec![(dec!(1), dec!(0)), (dec!(1), dec!(1)), (dec!(0), dec!(0))];
        assert_eq!(validate_lines(&lines), Err(LedgerError::InvalidLineAmounts { line: 1 }));
    }

    #[test]
    fn reversal_swaps_sides_and_stays_balanced() {
        let now = chrono::Utc::now();
        let entry_id = uuid::Uuid::new_v4();
        let line = |debit, credit, order| JournalEntryLine {
            id: uuid::Uuid::new_v4(),
            journal_entry_id: entry_id,
            account_id: uuid::Uuid::new_v4(),
            description: None,
            debit,
            credit,
            line_order: order,
            created_at: now,
        };
        let original = vec![line(dec!(80), dec!(0), 0), line(dec!(0), dec!(80), 1)];

        let reversed = reversed_lines(&original);
        assert_eq!(reversed[0].credit, dec!(80));
        assert_eq!(reversed[0].debit, dec!(0));
        assert_eq!(reversed[1].debit, dec!(80));
        assert_eq!(reversed[0].account_id, original[0].account_id);
        assert!(ensure_balanced(&reversed).is_ok());
    }

    #[test]
    fn natural_balance_follows_account_type() {
        assert_eq!(natural_balance(AccountType::Asset, dec!(100), dec!(30)), dec!(70));
        assert_eq!(natural_balance(AccountType::Revenue, dec!(100), dec!(30)), dec!(-70));
        assert_eq!(natural_balance(AccountType::Liability, dec!(0), dec!(45)), dec!(45));
    }

    #[test]
    fn running_balance_accumulates() {
        let lines = vec![(dec!(100), dec!(0)), (dec!(0), dec!(40)), (dec!(10), dec!(0))];
        assert_eq!(
            running_balances(AccountType::Asset, &lines),
            vec![dec!(100), dec!(60), dec!(70)]
        );
    }

    #[test]
    fn period_rules() {
        assert!(is_valid_period(d(2025, 1, 1), d(2025, 12, 31)));
        assert!(!is_valid_period(d(2025, 1, 1), d(2025, 1, 1)));
        assert!(!is_valid_period(d(2025, 12, 31), d(2025, 1, 1)));
    }
}
