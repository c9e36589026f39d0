//! Route definitions for the Controlled Medicine Inventory

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::{handlers, middleware::auth_middleware, AppState};

/// Create API routes
pub fn api_routes(state: AppState) -> Router<AppState> {
    let protected = Router::new()
        .nest("/session", session_routes())
        .nest("/medicines", medicine_routes())
        .nest("/warehouses", warehouse_routes())
        .nest("/movements", movement_routes())
        .nest("/users", user_routes())
        .nest("/reports", report_routes())
        .route("/audit", get(handlers::list_audit_log))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware));

    Router::new()
        // Health check (public)
        .route("/health", get(handlers::health_check))
        // Login (public)
        .route("/auth/login", post(handlers::login))
        .merge(protected)
}

/// Session routes; every request through here counts as activity
fn session_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::current_session).delete(handlers::logout))
        .route("/activity", post(handlers::activity))
        .route("/capabilities", get(handlers::capabilities))
}

fn medicine_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_medicines).post(handlers::create_medicine))
        .route(
            "/:id",
            get(handlers::get_medicine)
                .put(handlers::update_medicine)
                .delete(handlers::delete_medicine),
        )
}

fn warehouse_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_warehouses).post(handlers::create_warehouse))
        .route(
            "/:id",
            get(handlers::get_warehouse)
                .put(handlers::update_warehouse)
                .delete(handlers::delete_warehouse),
        )
}

fn movement_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_movements).post(handlers::create_movement))
        .route("/:id", get(handlers::get_movement))
}

fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_users).post(handlers::create_user))
        .route(
            "/:id",
            get(handlers::get_user)
                .put(handlers::update_user)
                .delete(handlers::delete_user),
        )
}

fn report_routes() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(handlers::get_dashboard))
        .route("/inventory", get(handlers::get_inventory))
        .route("/period", get(handlers::get_period_report))
        .route("/monthly", get(handlers::get_monthly_report))
        .route("/reconciliation", get(handlers::get_reconciliation))
}
