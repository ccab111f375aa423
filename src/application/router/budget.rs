//! Daily provider spend.

use chrono::{NaiveDate, Utc};
use parking_lot::Mutex;
use rust_decimal::Decimal;

#[derive(Debug)]
struct Ledger {
    day: NaiveDate,
    spent: Decimal,
}

/// Spend accumulated over the current UTC day against a ceiling.
///
/// The ledger resets on the first access after UTC midnight.
#[derive(Debug)]
pub struct DailyBudget {
    ceiling: Decimal,
    ledger: Mutex<Ledger>,
}

impl DailyBudget {
    #[must_use]
    pub fn new(ceiling: Decimal) -> Self {
        Self {
            ceiling,
            ledger: Mutex::new(Ledger {
                day: Utc::now().date_naive(),
                spent: Decimal::ZERO,
            }),
        }
    }

    #[must_use]
    pub const fn ceiling(&self) -> Decimal {
        self.ceiling
    }

    /// Add `cost` to today's spend and return the new total.
    pub fn record(&self, cost: Decimal) -> Decimal {
        self.record_on(Utc::now().date_naive(), cost)
    }

    /// Spend so far today.
    #[must_use]
    pub fn spent(&self) -> Decimal {
        self.spent_on(Utc::now().date_naive())
    }

    /// True once today's spend has reached the ceiling.
    #[must_use]
    pub fn is_exceeded(&self) -> bool {
        self.is_exceeded_on(Utc::now().date_naive())
    }

    #[must_use]
    pub fn remaining(&self) -> Decimal {
        (self.ceiling - self.spent()).max(Decimal::ZERO)
    }

    pub(crate) fn record_on(&self, day: NaiveDate, cost: Decimal) -> Decimal {
        let mut ledger = self.ledger.lock();
        roll(&mut ledger, day);
        ledger.spent += cost;
        ledger.spent
    }

    pub(crate) fn spent_on(&self, day: NaiveDate) -> Decimal {
        let mut ledger = self.ledger.lock();
        roll(&mut ledger, day);
        ledger.spent
    }

    pub(crate) fn is_exceeded_on(&self, day: NaiveDate) -> bool {
        self.spent_on(day) >= self.ceiling
    }
}

fn roll(ledger: &mut Ledger, day: NaiveDate) {
    if day > ledger.day {
        ledger.day = day;
        ledger.spent = Decimal::ZERO;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn exceeded_at_ceiling() {
        let budget = DailyBudget::new(dec!(1.0));
        assert!(!budget.is_exceeded());
        budget.record(dec!(0.6));
        assert!(!budget.is_exceeded());
        budget.record(dec!(0.4));
        assert!(budget.is_exceeded());
        assert_eq!(budget.remaining(), Decimal::ZERO);
    }

    #[test]
    fn resets_on_new_day() {
        let budget = DailyBudget::new(dec!(1.0));
        let today = NaiveDate::from_ymd_opt(2100, 3, 1).unwrap();
        let tomorrow = today.succ_opt().unwrap();
        budget.record_on(today, dec!(5));
        assert!(budget.is_exceeded_on(today));
        assert!(!budget.is_exceeded_on(tomorrow));
        assert_eq!(budget.spent_on(tomorrow), Decimal::ZERO);
        // A late write for an earlier day does not roll back.
        assert_eq!(budget.record_on(today, dec!(0.1)), dec!(0.1));
    }
}
