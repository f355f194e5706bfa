//! AccountState — realized balance and its running peak.

use serde::{Deserialize, Serialize};

/// Realized account state. Changes only when a trade closes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AccountState {
    pub balance: f64,
    pub peak_balance: f64,
}

impl AccountState {
    pub fn new(initial_capital: f64) -> Self {
        Self {
            balance: initial_capital,
            peak_balance: initial_capital,
        }
    }

    /// Apply a realized P&L amount.
    pub fn apply(&mut self, pnl_amount: f64) {
        self.balance += pnl_amount;
        if self.balance > self.peak_balance {
            self.peak_balance = self.balance;
        }
    }

    pub fn drawdown(&self) -> f64 {
        self.peak_balance - self.balance
    }

    pub fn is_ruined(&self) -> bool {
        self.balance <= 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_tracks_peak() {
        let mut acct = AccountState::new(1000.0);
        acct.apply(200.0);
        acct.apply(-500.0);
        assert_eq!(acct.balance, 700.0);
        assert_eq!(acct.peak_balance, 1200.0);
        assert_eq!(acct.drawdown(), 500.0);
        assert!(!acct.is_ruined());
        acct.apply(-700.0);
        assert!(acct.is_ruined());
    }
}
