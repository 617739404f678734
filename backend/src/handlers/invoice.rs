//! HTTP handlers for invoices, invoice payments and the ledger

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use shared::models::{CreateInvoiceInput, InvoiceKind, InvoiceStatus, PaymentInput};
use shared::types::PaginatedResponse;
use uuid::Uuid;

use super::{csv_response, date_range, paginate};
use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::invoice::{Invoice, InvoiceDetail, InvoiceService, Ledger};
use crate::services::ReportingService;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct InvoiceQuery {
    pub kind: Option<InvoiceKind>,
    pub status: Option<InvoiceStatus>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct LedgerQuery {
    #[serde(default)]
    pub kind: InvoiceKind,
    pub counterparty_id: Option<Uuid>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub format: Option<String>,
}

pub async fn list_invoices(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<InvoiceQuery>,
) -> AppResult<Json<PaginatedResponse<Invoice>>> {
    let service = InvoiceService::new(state.db);
    let invoices = service
        .list(
            current_user.0.company_id,
            query.kind,
            query.status,
            &paginate(query.page, query.per_page),
        )
        .await?;
    Ok(Json(invoices))
}

/// Issue a sales invoice or book a purchase invoice; totals come from the line items
pub async fn create_invoice(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateInvoiceInput>,
) -> AppResult<(StatusCode, Json<InvoiceDetail>)> {
    let service = InvoiceService::new(state.db);
    let invoice = service.create(current_user.0.company_id, input).await?;
    Ok((StatusCode::CREATED, Json(invoice)))
}

pub async fn get_invoice(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(invoice_id): Path<Uuid>,
) -> AppResult<Json<InvoiceDetail>> {
    let service = InvoiceService::new(state.db);
    let invoice = service.get(current_user.0.company_id, invoice_id).await?;
    Ok(Json(invoice))
}

pub async fn record_invoice_payment(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(invoice_id): Path<Uuid>,
    Json(input): Json<PaymentInput>,
) -> AppResult<Json<InvoiceDetail>> {
    let service = InvoiceService::new(state.db);
    let invoice = service
        .record_payment(current_user.0.company_id, invoice_id, input)
        .await?;
    Ok(Json(invoice))
}

/// Running balance of invoices and payments; `?format=csv` exports the entries
pub async fn get_ledger(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<LedgerQuery>,
) -> AppResult<impl IntoResponse> {
    let range = date_range(query.from, query.to)?;
    let service = InvoiceService::new(state.db);
    let ledger: Ledger = service
        .ledger(
            current_user.0.company_id,
            query.kind,
            query.counterparty_id,
            &range,
        )
        .await?;

    if query.format.as_deref() == Some("csv") {
        let csv = ReportingService::export_to_csv(&ledger.entries)?;
        return Ok(csv_response("ledger.csv", csv));
    }

    Ok(Json(ledger).into_response())
}
