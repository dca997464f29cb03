// ABOUTME: Credit ledger for the deckgen application
// ABOUTME: Pre-flight credit checks and post-generation deductions per workspace

use crate::errors::{DeckError, Result};
use log::info;
use parking_lot::Mutex;
use std::collections::HashMap;

/// Workspace credit bookkeeping. A workspace without a recorded balance is
/// unmetered.
pub trait CreditLedger: Send + Sync {
    fn balance(&self, workspace: &str) -> Option<f64>;

    /// Deduct `amount` and return the new balance, if the workspace is metered.
    fn deduct(&self, workspace: &str, amount: f64, allow_negative: bool) -> Option<f64>;
}

/// Fail with `InsufficientCredits` when a metered workspace has nothing left.
pub fn ensure_credits(ledger: &dyn CreditLedger, workspace: &str) -> Result<()> {
    match ledger.balance(workspace) {
        Some(balance) if balance <= 0.0 => {
            Err(DeckError::InsufficientCredits(workspace.to_string()))
        }
        _ => Ok(()),
    }
}

#[derive(Debug, Default)]
pub struct InMemoryLedger {
    balances: Mutex<HashMap<String, f64>>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_balance(workspace: &str, balance: f64) -> Self {
        let ledger = Self::new();
        ledger.set_balance(workspace, balance);
        ledger
    }

    pub fn set_balance(&self, workspace: &str, balance: f64) {
        self.balances.lock().insert(workspace.to_string(), balance);
    }
}

impl CreditLedger for InMemoryLedger {
    fn balance(&self, workspace: &str) -> Option<f64> {
        self.balances.lock().get(workspace).copied()
    }

    fn deduct(&self, workspace: &str, amount: f64, allow_negative: bool) -> Option<f64> {
        let mut balances = self.balances.lock();
        let balance = balances.get_mut(workspace)?;
        *balance -= amount;
        if !allow_negative && *balance < 0.0 {
            *balance = 0.0;
        }
        info!(
            "Deducted {:.4} credits from workspace {} ({:.4} remaining)",
            amount, workspace, *balance
        );
        Some(*balance)
    }
}
