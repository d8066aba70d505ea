// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    middleware::from_fn_with_state,
    routing::{get, post, put},
    Router,
};
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    auth::{enforce_role, require_auth, require_role, Principal, Role},
    budget::BudgetStatus,
    models::{
        BudgetResponse, CreateExpenseRequest, DeleteExpenseResponse, Expense,
        ExpenseSummaryResponse, LoginRequest, LoginResponse, MessageResponse, ProfileResponse,
        PublicUser, RefreshRequest, RefreshResponse, RegisterRequest, SessionView,
        UpdateBudgetRequest, UpdateExpenseRequest,
    },
    state::AppState,
};

pub mod expenses;
pub mod health;
pub mod users;


pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(health::root))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .nest("/api/users", user_routes(&state))
        .nest("/api/expenses", expense_routes(&state))
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(CorsLayer::permissive())
}

// Route layers run last-added first: authentication before the role gate.

fn user_routes(state: &AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/register", post(users::register))
        .route("/login", post(users::login))
        .route("/refresh", post(users::refresh))
        .route("/logout", post(users::logout));

    let member = Router::new()
        .route("/profile", get(users::profile))
        .route("/{id}/budget", put(users::update_budget))
        .route_layer(from_fn_with_state(state.clone(), require_auth));

    let admin = Router::new()
        .route("/{id}/sessions", get(users::list_sessions))
        .route_layer(from_fn_with_state(require_role(Role::Admin), enforce_role))
        .route_layer(from_fn_with_state(state.clone(), require_auth));

    public.merge(member).merge(admin)
}

fn expense_routes(state: &AppState) -> Router<AppState> {
    let member = Router::new()
        .route("/user", get(expenses::mine))
        .route("/summary", get(expenses::summary))
        .route("/add", post(expenses::add))
        .route("/{id}", put(expenses::update).delete(expenses::delete))
        .route_layer(from_fn_with_state(state.clone(), require_auth));

    let admin = Router::new()
        .route("/", get(expenses::list_all))
        .route("/manage-users", get(expenses::manage_users))
        .route_layer(from_fn_with_state(require_role(Role::Admin), enforce_role))
        .route_layer(from_fn_with_state(state.clone(), require_auth));

    member.merge(admin)
}

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::root,
        health::liveness,
        health::readiness,
        users::register,
        users::login,
        users::refresh,
        users::logout,
        users::profile,
        users::update_budget,
        users::list_sessions,
        expenses::list_all,
        expenses::manage_users,
        expenses::mine,
        expenses::summary,
        expenses::add,
        expenses::update,
        expenses::delete
    ),
    components(
        schemas(
            Principal,
            Role,
            PublicUser,
            Expense,
            BudgetStatus,
            RegisterRequest,
            LoginRequest,
            LoginResponse,
            RefreshRequest,
            RefreshResponse,
            MessageResponse,
            ProfileResponse,
            UpdateBudgetRequest,
            BudgetResponse,
            SessionView,
            CreateExpenseRequest,
            UpdateExpenseRequest,
            ExpenseSummaryResponse,
            DeleteExpenseResponse,
            health::ReadyResponse,
            health::HealthChecks,
            health::HealthResponse
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "Health", description = "Liveness and readiness"),
        (name = "Users", description = "Accounts, credentials and budgets"),
        (name = "Expenses", description = "Expense records and budget enforcement")
    )
)]
struct ApiDoc;
