//! Route definitions for the Manufacturing Operations Platform

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};

use crate::{handlers, middleware::auth_middleware, AppState};

/// Create API routes
pub fn api_routes(state: AppState) -> Router<AppState> {
    let protected = Router::new()
        .nest("/company", company_routes())
        .nest("/business-customers", customer_routes())
        .nest("/customer-insights", customer_insight_routes())
        .nest("/suppliers", supplier_routes())
        .nest("/raw-materials", raw_material_routes())
        .nest("/raw-material-stock", raw_material_stock_routes())
        .nest("/packaging-raw-materials", packaging_routes())
        .nest("/machines", machine_routes())
        .nest("/manual-jobs", manual_job_routes())
        .nest("/manual-job-productions", manual_job_production_routes())
        .nest("/semi-finished-products", semi_finished_routes())
        .nest("/products", product_routes())
        .nest("/product-productions", product_production_routes())
        .nest("/production", production_routes())
        .nest("/production-outputs", production_output_routes())
        .nest("/production-plans", plan_routes())
        .nest("/production-insights", insight_routes())
        .nest("/scrap-reasons", scrap_reason_routes())
        .nest("/finance-costs", finance_cost_routes())
        .nest("/financial", financial_routes())
        .route("/dashboard", get(handlers::get_dashboard))
        .nest("/invoices", invoice_routes())
        .nest("/orders", order_routes())
        .nest("/chat", chat_routes())
        .route_layer(middleware::from_fn_with_state(state, auth_middleware));

    Router::new()
        // Health check (public)
        .route("/health", get(handlers::health_check))
        // Auth routes (public)
        .nest("/auth", auth_routes())
        // Everything else requires a bearer token
        .merge(protected)
}

/// Authentication routes (public)
fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(handlers::register))
        .route("/verify-email", post(handlers::verify_email))
        .route("/resend-verification", post(handlers::resend_verification))
        .route("/login", post(handlers::login))
        .route("/refresh", post(handlers::refresh))
        .route("/forgot-password", post(handlers::forgot_password))
        .route("/reset-password", post(handlers::reset_password))
}

fn company_routes() -> Router<AppState> {
    Router::new().route(
        "/",
        get(handlers::get_company).put(handlers::update_company),
    )
}

fn customer_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_customers).post(handlers::create_customer),
        )
        .route(
            "/:id",
            get(handlers::get_customer).put(handlers::update_customer),
        )
        .route("/:id/ordered-products", get(handlers::get_ordered_products))
}

fn customer_insight_routes() -> Router<AppState> {
    Router::new()
        .route("/top", get(handlers::top_customers))
        .route("/outstanding", get(handlers::outstanding_balances))
        .route("/:customer_id", get(handlers::get_customer_insight))
}

fn supplier_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_suppliers).post(handlers::create_supplier),
        )
        .route(
            "/:id",
            get(handlers::get_supplier).put(handlers::update_supplier),
        )
}

fn raw_material_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_raw_materials).post(handlers::create_raw_material),
        )
        .route("/low-stock", get(handlers::list_low_stock))
        .route(
            "/:id",
            get(handlers::get_raw_material).put(handlers::update_raw_material),
        )
}

fn raw_material_stock_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_stock_entries).post(handlers::record_stock_intake),
        )
        .route(
            "/raw-materials/:id",
            get(handlers::get_material_stock_entries),
        )
}

fn packaging_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_packaging).post(handlers::create_packaging),
        )
        .route(
            "/:id",
            get(handlers::get_packaging).put(handlers::update_packaging),
        )
        .route("/:id/stock", put(handlers::adjust_packaging_stock))
}

fn machine_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_machines).post(handlers::create_machine),
        )
        .route("/maintenance-due", get(handlers::list_maintenance_due))
        .route(
            "/:id",
            get(handlers::get_machine).put(handlers::update_machine),
        )
        .route(
            "/:id/maintenance",
            get(handlers::get_maintenance_history).post(handlers::log_maintenance),
        )
        .route("/:id/utilization", get(handlers::get_machine_utilization))
}

fn manual_job_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_manual_jobs).post(handlers::create_manual_job),
        )
        .route(
            "/:id",
            get(handlers::get_manual_job).put(handlers::update_manual_job),
        )
}

fn manual_job_production_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_manual_job_productions)
                .post(handlers::record_manual_job_production),
        )
        .route("/jobs/:id", get(handlers::get_job_productions))
}

fn semi_finished_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_semi_finished).post(handlers::create_semi_finished),
        )
        .route(
            "/:id",
            get(handlers::get_semi_finished).put(handlers::update_semi_finished),
        )
        .route("/:id/stock", put(handlers::adjust_semi_finished_stock))
}

fn product_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_products).post(handlers::create_product),
        )
        .route(
            "/:id",
            get(handlers::get_product).put(handlers::update_product),
        )
        .route("/:id/stock", put(handlers::adjust_product_stock))
        .route(
            "/:id/cost-breakdown",
            get(handlers::get_product_cost_breakdown),
        )
}

fn product_production_routes() -> Router<AppState> {
    Router::new().route(
        "/",
        get(handlers::list_product_productions).post(handlers::record_product_production),
    )
}

fn production_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_production_records).post(handlers::create_production_record),
        )
        .route("/:id", get(handlers::get_production_record))
}

fn production_output_routes() -> Router<AppState> {
    Router::new()
        .route("/daily", get(handlers::get_daily_output))
        .route("/machines", get(handlers::get_machine_output))
}

fn plan_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_plans).post(handlers::create_plan))
        .route("/:id", get(handlers::get_plan).put(handlers::update_plan))
        .route("/:id/progress", get(handlers::get_plan_progress))
}

fn insight_routes() -> Router<AppState> {
    Router::new()
        .route("/oee", get(handlers::get_oee))
        .route("/bottlenecks", get(handlers::get_bottlenecks))
        .route("/scrap-analysis", get(handlers::get_scrap_analysis))
}

fn scrap_reason_routes() -> Router<AppState> {
    Router::new().route(
        "/",
        get(handlers::list_scrap_reasons).post(handlers::create_scrap_reason),
    )
}

fn finance_cost_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_finance_costs).post(handlers::create_finance_cost),
        )
        .route("/summary", get(handlers::get_cost_summary))
        .route("/:id", put(handlers::update_finance_cost))
}

fn financial_routes() -> Router<AppState> {
    Router::new()
        .route("/gross-profit", get(handlers::get_gross_profit))
        .route("/break-even", get(handlers::get_break_even))
        .route("/profit-and-loss", get(handlers::get_profit_and_loss))
}

fn invoice_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_invoices).post(handlers::create_invoice),
        )
        .route("/ledger", get(handlers::get_ledger))
        .route("/:id", get(handlers::get_invoice))
        .route("/:id/payments", post(handlers::record_invoice_payment))
}

fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_orders).post(handlers::create_order))
        .route("/bulk-delivery", put(handlers::bulk_delivery))
        .route(
            "/:id",
            get(handlers::get_order).put(handlers::update_order),
        )
        .route("/:id/deliver", post(handlers::deliver_order))
        .route("/:id/cancel", post(handlers::cancel_order))
}

fn chat_routes() -> Router<AppState> {
    Router::new()
        .route("/messages", post(handlers::send_chat_message))
        .route("/history", get(handlers::get_chat_history))
}
