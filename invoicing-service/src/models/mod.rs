//! Domain models for invoicing-service.

mod cash_flow;
mod entity;
mod invoice;
mod period;
mod setting;

pub use cash_flow::{CashFlowEntry, UpsertCashFlow};
pub use entity::{Entity, EntityRemoval, EntityType, NewEntity};
pub use invoice::{
    invoice_total, reminder_date_for, Invoice, InvoiceFilter, InvoiceItem, InvoiceStatusFilter,
    InvoiceWithItems, NewInvoice, NewInvoiceItem, REMINDER_OFFSET_DAYS,
};
pub use period::{parse_iso_date, DateRange, MonthPeriod};
pub use setting::{Setting, EMAIL_PASS_KEY, EMAIL_USER_KEY, REMINDER_EMAIL_KEY};
