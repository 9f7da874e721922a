//! Services module for invoicing-service.

pub mod cash_flow;
pub mod database;
pub mod entities;
pub mod entity_migration;
pub mod formatting;
pub mod invoices;
pub mod metrics;
pub mod providers;
pub mod reminder;
pub mod settings;

pub use cash_flow::CashFlowService;
pub use database::Database;
pub use entities::EntityService;
pub use entity_migration::{EntityMigration, MigrationReport};
pub use invoices::InvoiceService;
pub use metrics::{get_metrics, init_metrics};
pub use providers::{
    EmailMessage, EmailProvider, MockEmailProvider, ProviderError, ProviderResponse,
    SmtpCredentials, SmtpProvider,
};
pub use reminder::{resolve_target, DailySchedule, ReminderNotifier, ReminderReport};
pub use settings::SettingsService;
