//! Invoice model for invoicing-service.

use chrono::{Days, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Calendar days between an invoice date and its payment reminder.
pub const REMINDER_OFFSET_DAYS: u64 = 10;

/// Invoice row, with contact names resolved from linked entities or legacy text.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Invoice {
    pub id: i64,
    pub invoice_number: String,
    pub company: Option<String>,
    pub distributor: Option<String>,
    pub company_id: Option<i64>,
    pub distributor_id: Option<i64>,
    pub company_name: Option<String>,
    pub distributor_name: Option<String>,
    pub date: NaiveDate,
    pub total_amount: f64,
    pub reminder_date: NaiveDate,
    pub is_paid: bool,
    pub created_at: NaiveDateTime,
}

/// Line item on an invoice.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct InvoiceItem {
    pub id: i64,
    pub invoice_id: i64,
    pub item_name: String,
    pub quantity: i64,
    pub price: f64,
    pub free_qty: i64,
}

impl InvoiceItem {
    /// Billed amount; free units are not charged.
    pub fn subtotal(&self) -> f64 {
        self.quantity as f64 * self.price
    }
}

/// Invoice hydrated with its items.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceWithItems {
    #[serde(flatten)]
    pub invoice: Invoice,
    pub items: Vec<InvoiceItem>,
}

impl InvoiceWithItems {
    pub fn total_free_qty(&self) -> i64 {
        self.items.iter().map(|i| i.free_qty).sum()
    }
}

/// Input for creating an invoice.
#[derive(Debug, Clone)]
pub struct NewInvoice {
    pub invoice_number: String,
    pub company: Option<String>,
    pub distributor: Option<String>,
    pub company_id: Option<i64>,
    pub distributor_id: Option<i64>,
    pub date: NaiveDate,
    pub items: Vec<NewInvoiceItem>,
}

/// Input for one line item.
#[derive(Debug, Clone)]
pub struct NewInvoiceItem {
    pub item_name: String,
    pub quantity: i64,
    pub price: f64,
    pub free_qty: i64,
}

/// Payment status filter for listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatusFilter {
    Paid,
    Pending,
}

/// Filter parameters for listing invoices.
#[derive(Debug, Clone, Default)]
pub struct InvoiceFilter {
    pub company_id: Option<i64>,
    pub status: Option<InvoiceStatusFilter>,
}

/// Sum of quantity x price over the items, ignoring free quantities.
pub fn invoice_total(items: &[NewInvoiceItem]) -> f64 {
    items
        .iter()
        .map(|item| item.quantity as f64 * item.price)
        .sum()
}

/// Reminder threshold for an invoice dated `date`.
pub fn reminder_date_for(date: NaiveDate) -> NaiveDate {
    date.checked_add_days(Days::new(REMINDER_OFFSET_DAYS))
        .unwrap_or(NaiveDate::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(quantity: i64, price: f64, free_qty: i64) -> NewInvoiceItem {
        NewInvoiceItem {
            item_name: "Widget".to_string(),
            quantity,
            price,
            free_qty,
        }
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn total_ignores_free_quantity() {
        let items = vec![item(10, 5.0, 2), item(3, 2.5, 100)];
        assert_eq!(invoice_total(&items), 57.5);
    }

    #[test]
    fn total_of_no_items_is_zero() {
        assert_eq!(invoice_total(&[]), 0.0);
    }

    #[test]
    fn reminder_is_ten_calendar_days_later() {
        assert_eq!(reminder_date_for(date("2025-03-20")), date("2025-03-30"));
    }

    #[test]
    fn reminder_crosses_month_and_year_boundaries() {
        assert_eq!(reminder_date_for(date("2025-01-25")), date("2025-02-04"));
        assert_eq!(reminder_date_for(date("2024-12-28")), date("2025-01-07"));
        assert_eq!(reminder_date_for(date("2024-02-25")), date("2024-03-06"));
    }
}
