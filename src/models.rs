// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Data Models
//!
//! Stored entities and the request/response bodies of the REST API. Wire
//! types use camelCase field names and derive `ToSchema` for the OpenAPI
//! document.
//!
//! ## Model Categories
//!
//! - **Users**: accounts with a role and a budget ceiling
//! - **Expenses**: individual spend records owned by a user
//! - **Sessions**: refresh tokens recorded in the token ledger

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::auth::{Principal, Role};

pub const MIN_NAME_LEN: usize = 3;
pub const MIN_PASSWORD_LEN: usize = 6;

// =============================================================================
// Stored Entities
// =============================================================================

/// A user account.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    /// Argon2 PHC string. Never leaves the server.
    pub password_hash: String,
    pub role: Role,
    /// Spending ceiling; `0` until explicitly set.
    pub budget: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Build a new ordinary user with a zero budget.
    pub fn new(name: impl Into<String>, email: impl Into<String>, password_hash: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            email: email.into(),
            password_hash: password_hash.into(),
            role: Role::User,
            budget: 0.0,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A recorded expense.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Expense {
    pub id: String,
    /// Owning user
    pub user_id: String,
    pub amount: f64,
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    /// When the spend happened
    pub date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A refresh token recorded at login.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRecord {
    pub subject_id: String,
    pub token_value: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// User Models
// =============================================================================

/// User as exposed over the API (no password hash).
#[derive(Debug, Clone, Serialize, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub budget: f64,
    pub created_at: DateTime<Utc>,
}

impl From<User> for PublicUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            role: user.role,
            budget: user.budget,
            created_at: user.created_at,
        }
    }
}

/// Request to create an account.
///
/// Missing fields deserialize as empty strings and fail validation.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct RegisterRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

impl RegisterRequest {
    /// Strip surrounding whitespace from name and email. Validation runs on
    /// the trimmed values so that what is checked is what gets stored.
    pub fn trimmed(self) -> Self {
        Self {
            name: self.name.trim().to_string(),
            email: self.email.trim().to_string(),
            password: self.password,
        }
    }

    pub fn validate(&self) -> Result<(), &'static str> {
        if self.name.chars().count() < MIN_NAME_LEN {
            return Err("name must be at least 3 characters");
        }
        if !is_valid_email(&self.email) {
            return Err("email is invalid");
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err("password must be at least 6 characters");
        }
        Ok(())
    }
}

/// Login credentials.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

impl LoginRequest {
    pub fn validate(&self) -> Result<(), &'static str> {
        if !is_valid_email(&self.email) {
            return Err("email is invalid");
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err("password must be at least 6 characters");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub message: String,
    pub access_token: String,
    pub refresh_token: String,
}

/// Body for refresh and logout. The token is optional so that its absence
/// gets a dedicated message instead of a deserialization error.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    #[serde(default)]
    pub refresh_token: Option<String>,
}

impl RefreshRequest {
    pub fn token(&self) -> Option<&str> {
        self.refresh_token.as_deref().filter(|t| !t.is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub message: String,
    pub access_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ProfileResponse {
    pub message: String,
    pub user: Principal,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UpdateBudgetRequest {
    pub budget: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BudgetResponse {
    pub message: String,
    pub budget: f64,
}

/// Ledger entry as shown to administrators (token value withheld).
#[derive(Debug, Clone, Serialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub subject_id: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    /// Whether the record is still within its lifetime
    pub active: bool,
}

impl SessionView {
    pub fn from_record(record: &RefreshRecord, now: DateTime<Utc>) -> Self {
        Self {
            subject_id: record.subject_id.clone(),
            created_at: record.created_at,
            expires_at: record.expires_at,
            active: now < record.expires_at,
        }
    }
}

// =============================================================================
// Expense Models
// =============================================================================

/// Request to record an expense.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateExpenseRequest {
    /// User the expense is charged to
    pub user_id: String,
    pub amount: f64,
    pub category: String,
    #[serde(default)]
    pub note: Option<String>,
    /// Defaults to now
    #[serde(default)]
    pub date: Option<DateTime<Utc>>,
}

impl CreateExpenseRequest {
    pub fn into_expense(self) -> Expense {
        let now = Utc::now();
        Expense {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: self.user_id,
            amount: self.amount,
            category: self.category,
            note: self.note,
            date: self.date.unwrap_or(now),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update of an expense; absent fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct UpdateExpenseRequest {
    #[serde(default)]
    pub amount: Option<f64>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub date: Option<DateTime<Utc>>,
}

impl UpdateExpenseRequest {
    /// Apply the present fields to `expense`.
    pub fn apply_to(self, expense: &mut Expense) {
        if let Some(amount) = self.amount {
            expense.amount = amount;
        }
        if let Some(category) = self.category {
            expense.category = category;
        }
        if let Some(note) = self.note {
            expense.note = Some(note);
        }
        if let Some(date) = self.date {
            expense.date = date;
        }
        expense.updated_at = Utc::now();
    }
}

/// Filters and pagination for the budget summary.
#[derive(Debug, Clone, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ExpenseSummaryQuery {
    pub user_id: String,
    /// 1-based page number (default 1)
    pub page: Option<usize>,
    /// Page size (default 10)
    pub limit: Option<usize>,
    pub category: Option<String>,
    /// Inclusive lower bound; only applied together with `endDate`
    pub start_date: Option<DateTime<Utc>>,
    /// Inclusive upper bound; only applied together with `startDate`
    pub end_date: Option<DateTime<Utc>>,
}

impl ExpenseSummaryQuery {
    pub const DEFAULT_PAGE: usize = 1;
    pub const DEFAULT_LIMIT: usize = 10;

    pub fn matches(&self, expense: &Expense) -> bool {
        if let Some(category) = &self.category {
            if &expense.category != category {
                return false;
            }
        }
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if expense.date < start || expense.date > end {
                return false;
            }
        }
        true
    }

    /// Offset and length of the requested page.
    pub fn window(&self) -> (usize, usize) {
        let page = self.page.unwrap_or(Self::DEFAULT_PAGE).max(1);
        let limit = self.limit.unwrap_or(Self::DEFAULT_LIMIT);
        ((page - 1).saturating_mul(limit), limit)
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseSummaryResponse {
    /// Sum over every expense matching the filters (all pages)
    pub total_expenses_amount: f64,
    /// The requested page
    pub expenses: Vec<Expense>,
    pub is_budget_exceeded: bool,
    pub budget: f64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeleteExpenseResponse {
    pub message: String,
    pub deleted_expense: Expense,
}

// =============================================================================
// Validation Helpers
// =============================================================================

/// Loose structural check: `local@domain.tld`, no whitespace.
pub fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    let Some((host, tld)) = domain.rsplit_once('.') else {
        return false;
    };
    !host.is_empty() && !tld.is_empty() && !domain.starts_with('.') && !domain.contains("..")
}
