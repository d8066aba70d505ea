// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Budget evaluation.
//!
//! Pure arithmetic over a budget ceiling and a set of expense amounts. Two
//! questions are answered:
//!
//! - **Retrospective**: has the recorded spend gone over the ceiling?
//!   `total > budget`, so spending exactly the budget is not exceeded.
//! - **Prospective**: may a candidate expense be committed?
//!   `existing + candidate <= budget`, so landing exactly on the budget is allowed.
//!
//! Amounts are not validated here. Zero and negative candidates go through
//! the same arithmetic; positivity is the caller's concern. A budget of `0`
//! (the default for new users) is exceeded by any positive spend.

use serde::Serialize;
use utoipa::ToSchema;

use crate::models::Expense;

/// Outcome of a retrospective evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BudgetStatus {
    /// Sum of all evaluated amounts
    pub total: f64,
    /// `total > budget`
    pub exceeded: bool,
    /// `budget - total`; negative once exceeded
    pub remaining: f64,
}

/// Outcome of a prospective evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProspectiveCheck {
    pub new_total: f64,
    pub budget: f64,
    /// `new_total <= budget`
    pub allowed: bool,
}

impl ProspectiveCheck {
    /// Headroom left after committing the candidate.
    pub fn remaining(&self) -> f64 {
        self.budget - self.new_total
    }

    /// Turn a rejected check into an error carrying the figures for display.
    pub fn into_result(self) -> Result<f64, BudgetExceeded> {
        if self.allowed {
            Ok(self.new_total)
        } else {
            Err(BudgetExceeded {
                new_total: self.new_total,
                budget: self.budget,
            })
        }
    }
}

/// A write was refused because it would take spend past the ceiling.
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
#[error("Budget exceeded")]
pub struct BudgetExceeded {
    pub new_total: f64,
    pub budget: f64,
}

/// Sum the amounts of a set of expenses.
pub fn total_of<'a, I>(expenses: I) -> f64
where
    I: IntoIterator<Item = &'a Expense>,
{
    expenses.into_iter().map(|e| e.amount).sum()
}

/// Evaluate recorded spend against the ceiling.
pub fn evaluate_existing<'a, I>(expenses: I, budget: f64) -> BudgetStatus
where
    I: IntoIterator<Item = &'a Expense>,
{
    let total = total_of(expenses);
    BudgetStatus {
        total,
        exceeded: total > budget,
        remaining: budget - total,
    }
}

/// Evaluate what the total would become if `candidate_amount` were committed.
pub fn evaluate_prospective(existing_total: f64, candidate_amount: f64, budget: f64) -> ProspectiveCheck {
    let new_total = existing_total + candidate_amount;
    ProspectiveCheck {
        new_total,
        budget,
        allowed: new_total <= budget,
    }
}
