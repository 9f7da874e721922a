//! Invoice store operations.

use crate::models::{
    invoice_total, reminder_date_for, DateRange, Invoice, InvoiceFilter, InvoiceItem,
    InvoiceStatusFilter, InvoiceWithItems, MonthPeriod, NewInvoice,
};
use crate::services::database::{db_error, Database};
use crate::services::metrics::{DB_QUERY_DURATION, INVOICES_TOTAL};
use chrono::NaiveDate;
use service_core::error::AppError;
use sqlx::{QueryBuilder, Sqlite};
use std::collections::HashMap;
use tracing::{info, instrument};

const INVOICE_COLUMNS: &str = r#"
    SELECT i.id, i.invoice_number, i.company, i.distributor, i.company_id, i.distributor_id,
           COALESCE(c.name, i.company) AS company_name,
           COALESCE(d.name, i.distributor) AS distributor_name,
           i.date, i.total_amount, i.reminder_date, i.is_paid, i.created_at
    FROM invoices i
    LEFT JOIN entities c ON c.id = i.company_id
    LEFT JOIN entities d ON d.id = i.distributor_id
"#;

/// Invoice ids bound per item lookup.
pub const ITEM_LOOKUP_BATCH: usize = 500;

#[derive(Clone)]
pub struct InvoiceService {
    db: Database,
}

impl InvoiceService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Persist an invoice and its items; totals and reminder date are derived here.
    #[instrument(skip(self, input), fields(invoice_number = %input.invoice_number))]
    pub async fn create(&self, input: &NewInvoice) -> Result<i64, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_invoice"])
            .start_timer();

        let total_amount = invoice_total(&input.items);
        let reminder_date = reminder_date_for(input.date);

        let mut tx = self
            .db
            .pool()
            .begin()
            .await
            .map_err(db_error("begin invoice transaction"))?;

        for (role, id) in [("Company", input.company_id), ("Distributor", input.distributor_id)] {
            let Some(id) = id else { continue };
            let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM entities WHERE id = ?)")
                .bind(id)
                .fetch_one(&mut *tx)
                .await
                .map_err(db_error("look up entity"))?;
            if !exists {
                return Err(AppError::NotFound(anyhow::anyhow!("{} {} not found", role, id)));
            }
        }

        let invoice_id = sqlx::query(
            r#"
            INSERT INTO invoices (invoice_number, company, distributor, company_id, distributor_id, date, total_amount, reminder_date)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&input.invoice_number)
        .bind(&input.company)
        .bind(&input.distributor)
        .bind(input.company_id)
        .bind(input.distributor_id)
        .bind(input.date)
        .bind(total_amount)
        .bind(reminder_date)
        .execute(&mut *tx)
        .await
        .map_err(db_error("create invoice"))?
        .last_insert_rowid();

        for item in &input.items {
            sqlx::query(
                r#"
                INSERT INTO invoice_items (invoice_id, item_name, quantity, price, free_qty)
                VALUES (?, ?, ?, ?, ?)
                "#,
            )
            .bind(invoice_id)
            .bind(&item.item_name)
            .bind(item.quantity)
            .bind(item.price)
            .bind(item.free_qty)
            .execute(&mut *tx)
            .await
            .map_err(db_error("create invoice item"))?;
        }

        tx.commit().await.map_err(db_error("commit invoice"))?;
        timer.observe_duration();

        INVOICES_TOTAL.with_label_values(&["created"]).inc();
        info!(
            invoice_id = invoice_id,
            total_amount = total_amount,
            reminder_date = %reminder_date,
            "Invoice created"
        );

        Ok(invoice_id)
    }

    /// Invoices newest first, each with its items.
    #[instrument(skip(self))]
    pub async fn list(&self, filter: &InvoiceFilter) -> Result<Vec<InvoiceWithItems>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_invoices"])
            .start_timer();

        let mut query = QueryBuilder::<Sqlite>::new(INVOICE_COLUMNS);
        query.push(" WHERE 1 = 1");
        if let Some(company_id) = filter.company_id {
            query.push(" AND i.company_id = ").push_bind(company_id);
        }
        match filter.status {
            Some(InvoiceStatusFilter::Paid) => {
                query.push(" AND i.is_paid = 1");
            }
            Some(InvoiceStatusFilter::Pending) => {
                query.push(" AND i.is_paid = 0");
            }
            None => {}
        }
        query.push(" ORDER BY i.date DESC, i.id DESC");

        let invoices = query
            .build_query_as::<Invoice>()
            .fetch_all(self.db.pool())
            .await
            .map_err(db_error("list invoices"))?;

        let hydrated = self.with_items(invoices).await?;
        timer.observe_duration();
        Ok(hydrated)
    }

    /// Single invoice with items.
    #[instrument(skip(self))]
    pub async fn get(&self, id: i64) -> Result<Option<InvoiceWithItems>, AppError> {
        let invoice = sqlx::query_as::<_, Invoice>(&format!("{INVOICE_COLUMNS} WHERE i.id = ?"))
            .bind(id)
            .fetch_optional(self.db.pool())
            .await
            .map_err(db_error("get invoice"))?;

        match invoice {
            Some(invoice) => Ok(self.with_items(vec![invoice]).await?.pop()),
            None => Ok(None),
        }
    }

    /// Mark an invoice paid or unpaid. Repeating the same value is a no-op.
    #[instrument(skip(self))]
    pub async fn set_paid(&self, id: i64, is_paid: bool) -> Result<(), AppError> {
        let result = sqlx::query("UPDATE invoices SET is_paid = ? WHERE id = ?")
            .bind(is_paid)
            .bind(id)
            .execute(self.db.pool())
            .await
            .map_err(db_error("update invoice status"))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(anyhow::anyhow!("Invoice {} not found", id)));
        }

        INVOICES_TOTAL
            .with_label_values(&[if is_paid { "paid" } else { "unpaid" }])
            .inc();
        info!(invoice_id = id, is_paid = is_paid, "Invoice payment status updated");
        Ok(())
    }

    /// Remove an invoice and its items.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: i64) -> Result<(), AppError> {
        let mut tx = self
            .db
            .pool()
            .begin()
            .await
            .map_err(db_error("begin delete transaction"))?;

        sqlx::query("DELETE FROM invoice_items WHERE invoice_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(db_error("delete invoice items"))?;

        let result = sqlx::query("DELETE FROM invoices WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(db_error("delete invoice"))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(anyhow::anyhow!("Invoice {} not found", id)));
        }

        tx.commit().await.map_err(db_error("commit invoice delete"))?;

        INVOICES_TOTAL.with_label_values(&["deleted"]).inc();
        info!(invoice_id = id, "Invoice deleted");
        Ok(())
    }

    /// Invoices whose date lies in `range` (or all of them), newest first.
    #[instrument(skip(self))]
    pub async fn list_in_range(
        &self,
        range: Option<&DateRange>,
    ) -> Result<Vec<InvoiceWithItems>, AppError> {
        let mut query = QueryBuilder::<Sqlite>::new(INVOICE_COLUMNS);
        if let Some(range) = range {
            query
                .push(" WHERE i.date BETWEEN ")
                .push_bind(&range.start)
                .push(" AND ")
                .push_bind(&range.end);
        }
        query.push(" ORDER BY i.date DESC, i.id DESC");

        let invoices = query
            .build_query_as::<Invoice>()
            .fetch_all(self.db.pool())
            .await
            .map_err(db_error("list invoices for export"))?;

        self.with_items(invoices).await
    }

    /// Total purchases for a month.
    #[instrument(skip(self))]
    pub async fn monthly_total(&self, period: MonthPeriod) -> Result<f64, AppError> {
        let range = period.range();
        sqlx::query_scalar::<_, f64>(
            "SELECT CAST(COALESCE(SUM(total_amount), 0) AS REAL) FROM invoices WHERE date BETWEEN ? AND ?",
        )
        .bind(&range.start)
        .bind(&range.end)
        .fetch_one(self.db.pool())
        .await
        .map_err(db_error("sum monthly purchases"))
    }

    /// Unpaid invoices whose reminder date is on or before `today`.
    #[instrument(skip(self))]
    pub async fn due_for_reminder(
        &self,
        today: NaiveDate,
    ) -> Result<Vec<InvoiceWithItems>, AppError> {
        let invoices = sqlx::query_as::<_, Invoice>(&format!(
            "{INVOICE_COLUMNS} WHERE i.is_paid = 0 AND i.reminder_date <= ? ORDER BY i.reminder_date, i.id"
        ))
        .bind(today)
        .fetch_all(self.db.pool())
        .await
        .map_err(db_error("list due invoices"))?;

        self.with_items(invoices).await
    }

    async fn with_items(&self, invoices: Vec<Invoice>) -> Result<Vec<InvoiceWithItems>, AppError> {
        if invoices.is_empty() {
            return Ok(Vec::new());
        }

        let mut by_invoice: HashMap<i64, Vec<InvoiceItem>> = HashMap::new();
        // SQLite caps bound parameters per statement.
        for chunk in invoices.chunks(ITEM_LOOKUP_BATCH) {
            let mut query = QueryBuilder::<Sqlite>::new(
                "SELECT id, invoice_id, item_name, quantity, price, free_qty FROM invoice_items WHERE invoice_id IN (",
            );
            let mut ids = query.separated(", ");
            for invoice in chunk {
                ids.push_bind(invoice.id);
            }
            query.push(") ORDER BY id");

            let items = query
                .build_query_as::<InvoiceItem>()
                .fetch_all(self.db.pool())
                .await
                .map_err(db_error("load invoice items"))?;

            for item in items {
                by_invoice.entry(item.invoice_id).or_default().push(item);
            }
        }

        Ok(invoices
            .into_iter()
            .map(|invoice| {
                let items = by_invoice.remove(&invoice.id).unwrap_or_default();
                InvoiceWithItems { invoice, items }
            })
            .collect())
    }
}
