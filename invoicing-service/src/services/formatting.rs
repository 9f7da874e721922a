//! Plain-text renderings of invoices: reminder emails, share messages and CSV export.

use crate::models::{InvoiceItem, InvoiceWithItems};
use service_core::error::AppError;

pub const CSV_HEADER: [&str; 8] = [
    "Invoice Number",
    "Company",
    "Distributor",
    "Date",
    "Items",
    "Total Amount",
    "Status",
    "Reminder Date",
];

/// Amounts print without a trailing `.0` for whole values.
fn amount(value: f64) -> String {
    format!("{}", value)
}

fn name_or_blank(name: &Option<String>) -> &str {
    name.as_deref().unwrap_or("")
}

pub fn reminder_subject(invoice: &InvoiceWithItems) -> String {
    format!(
        "Payment Reminder: Invoice #{} - ₹{}",
        invoice.invoice.invoice_number,
        amount(invoice.invoice.total_amount)
    )
}

pub fn reminder_body(invoice: &InvoiceWithItems) -> String {
    let inv = &invoice.invoice;
    let items = invoice
        .items
        .iter()
        .map(|item| format!("  - {}{}", priced_line(item), free_suffix(item, " ")))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Payment Reminder!\n\n\
         Invoice #{}\n\
         Company: {}\n\
         Distributor: {}\n\
         Date: {}\n\n\
         Items:\n{}\n\n\
         Total: ₹{}\n\n\
         This payment was due on {}.",
        inv.invoice_number,
        name_or_blank(&inv.company_name),
        name_or_blank(&inv.distributor_name),
        inv.date,
        items,
        amount(inv.total_amount),
        inv.reminder_date
    )
}

/// Message for pasting into chat apps.
pub fn share_text(invoice: &InvoiceWithItems) -> String {
    let inv = &invoice.invoice;
    let items = invoice
        .items
        .iter()
        .map(|item| format!("{}{}", priced_line(item), free_suffix(item, "")))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "📋 Invoice #{}\n\
         ━━━━━━━━━━━━━━━━━━━━\n\
         🏢 {}\n\
         📦 {}\n\
         📅 {}\n\n\
         📝 Items:\n{}\n\n\
         💰 Total: ₹{}\n\
         🎁 Free items: {}\n\
         ━━━━━━━━━━━━━━━━━━━━",
        inv.invoice_number,
        name_or_blank(&inv.company_name),
        name_or_blank(&inv.distributor_name),
        inv.date,
        items,
        amount(inv.total_amount),
        invoice.total_free_qty()
    )
}

fn priced_line(item: &InvoiceItem) -> String {
    format!(
        "{}: {} x ₹{} = ₹{}",
        item.item_name,
        item.quantity,
        amount(item.price),
        amount(item.subtotal())
    )
}

fn free_suffix(item: &InvoiceItem, gap: &str) -> String {
    if item.free_qty > 0 {
        format!(" (+{}{} free)", gap, item.free_qty)
    } else {
        String::new()
    }
}

/// `name (qty x price +N free)` per item, joined with `; `.
pub fn items_summary(items: &[InvoiceItem]) -> String {
    items
        .iter()
        .map(|item| {
            let free = if item.free_qty > 0 {
                format!(" +{} free", item.free_qty)
            } else {
                String::new()
            };
            format!(
                "{} ({} x {}{})",
                item.item_name,
                item.quantity,
                amount(item.price),
                free
            )
        })
        .collect::<Vec<_>>()
        .join("; ")
}

/// One header row plus one row per invoice, in the order given.
pub fn invoices_csv(invoices: &[InvoiceWithItems]) -> Result<String, AppError> {
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    writer.write_record(CSV_HEADER).map_err(csv_error)?;
    for invoice in invoices {
        let inv = &invoice.invoice;
        writer
            .write_record([
                inv.invoice_number.clone(),
                name_or_blank(&inv.company_name).to_string(),
                name_or_blank(&inv.distributor_name).to_string(),
                inv.date.to_string(),
                items_summary(&invoice.items),
                amount(inv.total_amount),
                if inv.is_paid { "Paid" } else { "Unpaid" }.to_string(),
                inv.reminder_date.to_string(),
            ])
            .map_err(csv_error)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| AppError::InternalError(anyhow::anyhow!("Failed to flush CSV: {}", e)))?;
    String::from_utf8(bytes)
        .map_err(|e| AppError::InternalError(anyhow::anyhow!("CSV is not UTF-8: {}", e)))
}

fn csv_error(e: csv::Error) -> AppError {
    AppError::InternalError(anyhow::anyhow!("Failed to write CSV: {}", e))
}
