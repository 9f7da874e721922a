use super::{iso_date, lenient_id, validate_iso_date, validate_non_blank, MessageResponse, MonthQuery};
use crate::models::{
    parse_iso_date, DateRange, InvoiceFilter, InvoiceStatusFilter, InvoiceWithItems, MonthPeriod,
    NewInvoice, NewInvoiceItem,
};
use crate::services::formatting::{invoices_csv, share_text};
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::Local;
use serde::{Deserialize, Serialize};
use service_core::error::AppError;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateInvoiceRequest {
    #[validate(custom(function = "validate_non_blank"))]
    pub invoice_number: String,
    pub company: Option<String>,
    pub distributor: Option<String>,
    #[serde(default, deserialize_with = "lenient_id")]
    pub company_id: Option<i64>,
    #[serde(default, deserialize_with = "lenient_id")]
    pub distributor_id: Option<i64>,
    #[validate(custom(function = "validate_iso_date"))]
    pub date: String,
    #[serde(default)]
    #[validate(nested)]
    pub items: Vec<InvoiceItemRequest>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct InvoiceItemRequest {
    #[validate(custom(function = "validate_non_blank"))]
    pub item_name: String,
    #[validate(range(min = 0, message = "Quantity cannot be negative"))]
    pub quantity: i64,
    #[validate(range(min = 0.0, message = "Price cannot be negative"))]
    pub price: f64,
    #[serde(default)]
    #[validate(range(min = 0, message = "Free quantity cannot be negative"))]
    pub free_qty: i64,
}

#[derive(Debug, Serialize)]
pub struct CreateInvoiceResponse {
    pub id: i64,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct ListInvoicesQuery {
    pub company_id: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SetPaidRequest {
    pub is_paid: bool,
}

#[derive(Debug, Deserialize)]
pub struct ExportQuery {
    pub filter: Option<String>,
    pub month: Option<String>,
    pub year: Option<String>,
    #[serde(rename = "startDate")]
    pub start_date: Option<String>,
    #[serde(rename = "endDate")]
    pub end_date: Option<String>,
}

impl ExportQuery {
    /// Requested date bounds plus the label used in the file name. Incomplete or
    /// unparsable parameters export everything.
    fn range(&self) -> (Option<DateRange>, &'static str) {
        match self.filter.as_deref() {
            Some("monthly") => {
                let month = self.month.as_deref().and_then(|m| m.trim().parse().ok());
                let year = self.year.as_deref().and_then(|y| y.trim().parse().ok());
                match month.zip(year).and_then(|(m, y)| MonthPeriod::new(m, y)) {
                    Some(period) => (Some(period.range()), "monthly"),
                    None => (None, "all"),
                }
            }
            Some("range") => {
                let start = self.start_date.as_deref().and_then(parse_iso_date);
                let end = self.end_date.as_deref().and_then(parse_iso_date);
                match start.zip(end) {
                    Some((start, end)) => (Some(DateRange::between(start, end)), "range"),
                    None => (None, "all"),
                }
            }
            _ => (None, "all"),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ShareResponse {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct PurchasesSummary {
    pub total_purchases: f64,
}

#[tracing::instrument(skip(state, request))]
pub async fn create_invoice(
    State(state): State<AppState>,
    Json(request): Json<CreateInvoiceRequest>,
) -> Result<(StatusCode, Json<CreateInvoiceResponse>), AppError> {
    request.validate()?;

    let input = NewInvoice {
        invoice_number: request.invoice_number.trim().to_string(),
        company: request.company.filter(|c| !c.trim().is_empty()),
        distributor: request.distributor.filter(|d| !d.trim().is_empty()),
        company_id: request.company_id,
        distributor_id: request.distributor_id,
        date: iso_date(&request.date)?,
        items: request
            .items
            .into_iter()
            .map(|item| NewInvoiceItem {
                item_name: item.item_name,
                quantity: item.quantity,
                price: item.price,
                free_qty: item.free_qty,
            })
            .collect(),
    };

    let id = state.invoices.create(&input).await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateInvoiceResponse {
            id,
            message: "Invoice created".to_string(),
        }),
    ))
}

pub async fn list_invoices(
    State(state): State<AppState>,
    Query(query): Query<ListInvoicesQuery>,
) -> Result<Json<Vec<InvoiceWithItems>>, AppError> {
    let company_id = match query.company_id.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => Some(raw.parse::<i64>().map_err(|_| {
            AppError::BadRequest(anyhow::anyhow!("Invalid company_id '{}'", raw))
        })?),
    };
    // Unknown statuses list everything.
    let status = match query.status.as_deref() {
        Some("paid") => Some(InvoiceStatusFilter::Paid),
        Some("pending") => Some(InvoiceStatusFilter::Pending),
        _ => None,
    };

    let invoices = state
        .invoices
        .list(&InvoiceFilter { company_id, status })
        .await?;
    Ok(Json(invoices))
}

pub async fn get_invoice(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<InvoiceWithItems>, AppError> {
    state
        .invoices
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Invoice {} not found", id)))
}

#[tracing::instrument(skip(state))]
pub async fn set_paid(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(request): Json<SetPaidRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    state.invoices.set_paid(id, request.is_paid).await?;
    Ok(Json(MessageResponse::new("Updated")))
}

#[tracing::instrument(skip(state))]
pub async fn delete_invoice(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>, AppError> {
    state.invoices.delete(id).await?;
    Ok(Json(MessageResponse::new("Deleted")))
}

pub async fn share_invoice(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ShareResponse>, AppError> {
    let invoice = state
        .invoices
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Invoice {} not found", id)))?;

    Ok(Json(ShareResponse {
        text: share_text(&invoice),
    }))
}

#[tracing::instrument(skip(state))]
pub async fn export_csv(
    State(state): State<AppState>,
    Query(query): Query<ExportQuery>,
) -> Result<impl IntoResponse, AppError> {
    let (range, label) = query.range();
    let invoices = state.invoices.list_in_range(range.as_ref()).await?;
    let body = invoices_csv(&invoices)?;

    tracing::info!(rows = invoices.len(), filter = label, "Invoices exported");

    let filename = format!(
        "attachment; filename=invoices-{}-{}.csv",
        label,
        Local::now().date_naive()
    );
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, filename),
        ],
        body,
    ))
}

pub async fn monthly_purchases(
    State(state): State<AppState>,
    Query(query): Query<MonthQuery>,
) -> Result<Json<PurchasesSummary>, AppError> {
    let total_purchases = state.invoices.monthly_total(query.period()?).await?;
    Ok(Json(PurchasesSummary { total_purchases }))
}
