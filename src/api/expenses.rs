// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Expense endpoints.
//!
//! Writes that change a user's spend (add, update) run the prospective budget
//! check while holding that user's budget lock, so the total they check
//! against cannot move underneath them.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::{
    auth::{AdminOnly, Auth, AuthError, Principal},
    budget,
    error::{ApiError, ApiJson, ApiQuery},
    models::{
        CreateExpenseRequest, DeleteExpenseResponse, Expense, ExpenseSummaryQuery,
        ExpenseSummaryResponse, MessageResponse, PublicUser, UpdateExpenseRequest, User,
    },
    state::AppState,
};

fn ensure_may_act_for(principal: &Principal, user_id: &str) -> Result<(), ApiError> {
    if principal.may_act_for(user_id) {
        Ok(())
    } else {
        tracing::debug!(actor = %principal.id, target = %user_id, "Cross-user access refused");
        Err(AuthError::Forbidden.into())
    }
}

fn load_user(state: &AppState, user_id: &str) -> Result<User, ApiError> {
    state
        .store
        .find_user_by_id(user_id)?
        .ok_or_else(|| ApiError::not_found("User not found"))
}

fn load_expense(state: &AppState, expense_id: &str) -> Result<Expense, ApiError> {
    state
        .store
        .find_expense(expense_id)?
        .ok_or_else(|| ApiError::not_found("Expense not found"))
}

/// List every expense in the system. Admin only.
#[utoipa::path(
    get,
    path = "/api/expenses",
    tag = "Expenses",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "All expenses", body = Vec<Expense>),
        (status = 403, description = "Admin role required"),
    )
)]
pub async fn list_all(State(state): State<AppState>, AdminOnly(_admin): AdminOnly) -> Result<Json<Vec<Expense>>, ApiError> {
    Ok(Json(state.store.list_expenses()?))
}

/// List every account. Admin only.
#[utoipa::path(
    get,
    path = "/api/expenses/manage-users",
    tag = "Expenses",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "All users", body = Vec<PublicUser>),
        (status = 403, description = "Admin role required"),
    )
)]
pub async fn manage_users(
    State(state): State<AppState>,
    AdminOnly(_admin): AdminOnly,
) -> Result<Json<Vec<PublicUser>>, ApiError> {
    let users = state.store.list_users()?.into_iter().map(PublicUser::from).collect();
    Ok(Json(users))
}

/// The caller's own expenses.
#[utoipa::path(
    get,
    path = "/api/expenses/user",
    tag = "Expenses",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Caller's expenses", body = Vec<Expense>),
        (status = 401, description = "Invalid or expired token"),
    )
)]
pub async fn mine(State(state): State<AppState>, Auth(principal): Auth) -> Result<Json<Vec<Expense>>, ApiError> {
    Ok(Json(state.store.find_expenses_by_user(&principal.id)?))
}

/// Filtered, paginated spend report for one user.
///
/// The total and the exceeded flag cover every matching expense, not just the
/// returned page.
#[utoipa::path(
    get,
    path = "/api/expenses/summary",
    tag = "Expenses",
    security(("bearer_auth" = [])),
    params(ExpenseSummaryQuery),
    responses(
        (status = 200, description = "Budget summary", body = ExpenseSummaryResponse),
        (status = 403, description = "Not the owner or an admin"),
        (status = 404, description = "User not found", body = MessageResponse),
    )
)]
pub async fn summary(
    State(state): State<AppState>,
    Auth(principal): Auth,
    ApiQuery(query): ApiQuery<ExpenseSummaryQuery>,
) -> Result<Json<ExpenseSummaryResponse>, ApiError> {
    ensure_may_act_for(&principal, &query.user_id)?;
    let user = load_user(&state, &query.user_id)?;

    let matching: Vec<Expense> = state
        .store
        .find_expenses_by_user(&user.id)?
        .into_iter()
        .filter(|expense| query.matches(expense))
        .collect();

    let status = budget::evaluate_existing(&matching, user.budget);
    let (offset, limit) = query.window();
    let page = matching.into_iter().skip(offset).take(limit).collect();

    Ok(Json(ExpenseSummaryResponse {
        total_expenses_amount: status.total,
        expenses: page,
        is_budget_exceeded: status.exceeded,
        budget: user.budget,
    }))
}

/// Record an expense if it keeps the user within budget.
#[utoipa::path(
    post,
    path = "/api/expenses/add",
    tag = "Expenses",
    security(("bearer_auth" = [])),
    request_body = CreateExpenseRequest,
    responses(
        (status = 201, description = "Expense recorded", body = Expense),
        (status = 400, description = "Budget exceeded; body carries newTotal and budget"),
        (status = 403, description = "Not the owner or an admin"),
        (status = 404, description = "User not found", body = MessageResponse),
    )
)]
pub async fn add(
    State(state): State<AppState>,
    Auth(principal): Auth,
    ApiJson(request): ApiJson<CreateExpenseRequest>,
) -> Result<(StatusCode, Json<Expense>), ApiError> {
    ensure_may_act_for(&principal, &request.user_id)?;

    let _guard = state.budget_locks.lock(&request.user_id).await;
    let user = load_user(&state, &request.user_id)?;

    let existing = state.store.find_expenses_by_user(&user.id)?;
    let check = budget::evaluate_prospective(budget::total_of(&existing), request.amount, user.budget);
    if let Err(exceeded) = check.into_result() {
        tracing::warn!(
            user_id = %user.id,
            new_total = exceeded.new_total,
            budget = exceeded.budget,
            "Expense rejected: budget exceeded"
        );
        return Err(exceeded.into());
    }

    let expense = request.into_expense();
    state.store.insert_expense(&expense)?;

    tracing::info!(
        user_id = %user.id,
        expense_id = %expense.id,
        amount = expense.amount,
        remaining = check.remaining(),
        "Expense recorded"
    );
    Ok((StatusCode::CREATED, Json(expense)))
}

/// Change an expense. A new amount is checked against the budget with the
/// old amount taken out of the total.
#[utoipa::path(
    put,
    path = "/api/expenses/{id}",
    tag = "Expenses",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Expense ID")),
    request_body = UpdateExpenseRequest,
    responses(
        (status = 200, description = "Expense updated", body = Expense),
        (status = 400, description = "Budget exceeded; body carries newTotal and budget"),
        (status = 403, description = "Not the owner or an admin"),
        (status = 404, description = "Expense not found", body = MessageResponse),
    )
)]
pub async fn update(
    State(state): State<AppState>,
    Auth(principal): Auth,
    Path(expense_id): Path<String>,
    ApiJson(request): ApiJson<UpdateExpenseRequest>,
) -> Result<Json<Expense>, ApiError> {
    let owner_id = load_expense(&state, &expense_id)?.user_id;
    ensure_may_act_for(&principal, &owner_id)?;

    let _guard = state.budget_locks.lock(&owner_id).await;
    // Re-read under the lock; the expense may have changed or gone meanwhile.
    let current = load_expense(&state, &expense_id)?;
    let user = load_user(&state, &current.user_id)?;

    // Edits that leave the amount alone do not change spend.
    if let Some(amount) = request.amount {
        let others_total = budget::total_of(
            state
                .store
                .find_expenses_by_user(&user.id)?
                .iter()
                .filter(|expense| expense.id != current.id),
        );
        let check = budget::evaluate_prospective(others_total, amount, user.budget);
        if let Err(exceeded) = check.into_result() {
            tracing::warn!(
                user_id = %user.id,
                expense_id = %current.id,
                new_total = exceeded.new_total,
                budget = exceeded.budget,
                "Expense update rejected: budget exceeded"
            );
            return Err(exceeded.into());
        }
    }

    let mut updated = current;
    request.apply_to(&mut updated);

    state.store.update_expense(&updated)?;

    tracing::info!(user_id = %user.id, expense_id = %updated.id, "Expense updated");
    Ok(Json(updated))
}

#[utoipa::path(
    delete,
    path = "/api/expenses/{id}",
    tag = "Expenses",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Expense ID")),
    responses(
        (status = 200, description = "Expense deleted", body = DeleteExpenseResponse),
        (status = 403, description = "Not the owner or an admin"),
        (status = 404, description = "Expense not found", body = MessageResponse),
    )
)]
pub async fn delete(
    State(state): State<AppState>,
    Auth(principal): Auth,
    Path(expense_id): Path<String>,
) -> Result<Json<DeleteExpenseResponse>, ApiError> {
    let expense = load_expense(&state, &expense_id)?;
    ensure_may_act_for(&principal, &expense.user_id)?;

    let deleted = state
        .store
        .delete_expense(&expense.id)?
        .ok_or_else(|| ApiError::not_found("Expense not found"))?;

    tracing::info!(user_id = %deleted.user_id, expense_id = %deleted.id, "Expense deleted");
    Ok(Json(DeleteExpenseResponse {
        message: "Expense deleted successfully".to_string(),
        deleted_expense: deleted,
    }))
}
