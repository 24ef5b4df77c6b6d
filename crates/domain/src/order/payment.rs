use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Money, PaymentMethod};

/// The single payment that closes an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub method: PaymentMethod,

    /// Amount handed over, stored as given.
    pub amount: Money,

    pub paid_at: DateTime<Utc>,

    /// Free-text remark from the cashier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl Payment {
    /// Returns true if the amount is at least `total`.
    pub fn covers(&self, total: Money) -> bool {
        self.amount >= total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cash(cents: i64) -> Payment {
        Payment {
            method: PaymentMethod::Cash,
            amount: Money::from_cents(cents),
            paid_at: Utc::now(),
            notes: None,
        }
    }

    #[test]
    fn covers_exact_and_larger_amounts() {
        assert!(cash(1250).covers(Money::from_cents(1250)));
        assert!(cash(2000).covers(Money::from_cents(1250)));
        assert!(!cash(1000).covers(Money::from_cents(1250)));
    }

    #[test]
    fn notes_are_omitted_when_absent() {
        let json = serde_json::to_value(cash(100)).unwrap();
        assert!(json.get("notes").is_none());
    }
}
