//! Daily payment reminders for unpaid invoices past their reminder date.
//!
//! Nothing records which invoices were already reminded about, so an unpaid invoice is
//! mailed again on every run until it is marked paid.

use crate::config::EmailOverrides;
use crate::models::{EMAIL_PASS_KEY, EMAIL_USER_KEY, REMINDER_EMAIL_KEY};
use crate::services::formatting::{reminder_body, reminder_subject};
use crate::services::metrics::REMINDERS_TOTAL;
use crate::services::providers::{EmailMessage, EmailProvider, SmtpCredentials};
use crate::services::{InvoiceService, SettingsService};
use chrono::{Days, Local, NaiveDate, NaiveDateTime, NaiveTime};
use secrecy::Secret;
use serde::Serialize;
use service_core::error::AppError;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, instrument, warn};

/// Sender login plus the address reminders go to.
#[derive(Debug, Clone)]
pub struct ReminderTarget {
    pub credentials: SmtpCredentials,
    pub recipient: String,
}

/// Environment overrides win over stored settings; blank values count as missing.
/// `None` when any of sender, password or recipient is unavailable.
pub fn resolve_target(
    overrides: &EmailOverrides,
    stored: &BTreeMap<String, Option<String>>,
) -> Option<ReminderTarget> {
    let setting = |key: &str| {
        stored
            .get(key)
            .cloned()
            .flatten()
            .filter(|v| !v.trim().is_empty())
    };

    let user = overrides.user.clone().or_else(|| setting(EMAIL_USER_KEY))?;
    let password = overrides
        .password
        .clone()
        .or_else(|| setting(EMAIL_PASS_KEY).map(Secret::new))?;
    let recipient = overrides
        .recipient
        .clone()
        .or_else(|| setting(REMINDER_EMAIL_KEY))?;

    Some(ReminderTarget {
        credentials: SmtpCredentials { user, password },
        recipient,
    })
}

/// Outcome of one reminder pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReminderReport {
    /// True when email is not configured and nothing was looked at.
    pub skipped: bool,
    pub due: usize,
    pub sent: usize,
    pub failed: usize,
}

pub struct ReminderNotifier {
    invoices: InvoiceService,
    settings: SettingsService,
    provider: Arc<dyn EmailProvider>,
    overrides: EmailOverrides,
}

impl ReminderNotifier {
    pub fn new(
        invoices: InvoiceService,
        settings: SettingsService,
        provider: Arc<dyn EmailProvider>,
        overrides: EmailOverrides,
    ) -> Self {
        Self {
            invoices,
            settings,
            provider,
            overrides,
        }
    }

    /// Mail one reminder per due invoice. A failed send is logged and the rest continue.
    #[instrument(skip(self))]
    pub async fn run(&self, today: NaiveDate) -> Result<ReminderReport, AppError> {
        let stored = self.settings.all().await?;
        let Some(target) = resolve_target(&self.overrides, &stored) else {
            info!("Email not configured, skipping reminders");
            REMINDERS_TOTAL.with_label_values(&["skipped"]).inc();
            return Ok(ReminderReport {
                skipped: true,
                ..Default::default()
            });
        };

        let due = self.invoices.due_for_reminder(today).await?;
        let mut report = ReminderReport {
            due: due.len(),
            ..Default::default()
        };
        if due.is_empty() {
            info!("No payment reminders due");
            return Ok(report);
        }

        for invoice in &due {
            let message = EmailMessage {
                from: target.credentials.user.clone(),
                to: target.recipient.clone(),
                subject: reminder_subject(invoice),
                body_text: reminder_body(invoice),
            };

            match self.provider.send(&target.credentials, &message).await {
                Ok(_) => {
                    report.sent += 1;
                    REMINDERS_TOTAL.with_label_values(&["sent"]).inc();
                    info!(
                        invoice_number = %invoice.invoice.invoice_number,
                        "Reminder sent"
                    );
                }
                Err(e) => {
                    report.failed += 1;
                    REMINDERS_TOTAL.with_label_values(&["failed"]).inc();
                    warn!(
                        invoice_number = %invoice.invoice.invoice_number,
                        error = %e,
                        "Failed to send reminder"
                    );
                }
            }
        }

        info!(
            due = report.due,
            sent = report.sent,
            failed = report.failed,
            "Reminder run finished"
        );
        Ok(report)
    }
}

/// Wall-clock time of day at which the reminder pass fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailySchedule {
    pub hour: u32,
    pub minute: u32,
}

impl Default for DailySchedule {
    fn default() -> Self {
        Self { hour: 9, minute: 0 }
    }
}

impl DailySchedule {
    fn time(&self) -> NaiveTime {
        NaiveTime::from_hms_opt(self.hour.min(23), self.minute.min(59), 0)
            .unwrap_or_default()
    }

    /// First firing strictly after `now`.
    pub fn next_after(&self, now: NaiveDateTime) -> NaiveDateTime {
        let today = now.date().and_time(self.time());
        if today > now {
            return today;
        }
        now.date()
            .checked_add_days(Days::new(1))
            .map(|d| d.and_time(self.time()))
            .unwrap_or(NaiveDateTime::MAX)
    }

    /// Run `notifier` at every firing until `shutdown` flips to true or its sender drops.
    pub fn spawn(
        self,
        notifier: Arc<ReminderNotifier>,
        mut shutdown: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                let now = Local::now().naive_local();
                let next = self.next_after(now);
                let wait = (next - now).to_std().unwrap_or_default();
                info!(next_run = %next, "Reminder run scheduled");

                tokio::select! {
                    _ = tokio::time::sleep(wait) => {
                        let today = Local::now().date_naive();
                        if let Err(e) = notifier.run(today).await {
                            error!(error = %e, "Reminder run failed");
                        }
                    }
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            info!("Reminder scheduler stopped");
                            return;
                        }
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    fn at(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").unwrap()
    }

    fn stored(pairs: &[(&str, &str)]) -> BTreeMap<String, Option<String>> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), Some(v.to_string())))
            .collect()
    }

    #[test]
    fn fires_later_today_when_time_not_reached() {
        let schedule = DailySchedule::default();
        assert_eq!(schedule.next_after(at("2025-03-20 08:30")), at("2025-03-20 09:00"));
    }

    #[test]
    fn fires_tomorrow_once_time_has_passed() {
        let schedule = DailySchedule::default();
        assert_eq!(schedule.next_after(at("2025-03-20 09:00")), at("2025-03-21 09:00"));
        assert_eq!(schedule.next_after(at("2025-12-31 23:59")), at("2026-01-01 09:00"));
    }

    #[test]
    fn stored_settings_are_used_without_overrides() {
        let settings = stored(&[
            ("email_user", "shop@example.com"),
            ("email_pass", "secret"),
            ("reminder_email", "owner@example.com"),
        ]);
        let target = resolve_target(&EmailOverrides::default(), &settings).unwrap();
        assert_eq!(target.credentials.user, "shop@example.com");
        assert_eq!(target.credentials.password.expose_secret(), "secret");
        assert_eq!(target.recipient, "owner@example.com");
    }

    #[test]
    fn environment_overrides_win() {
        let settings = stored(&[
            ("email_user", "shop@example.com"),
            ("email_pass", "secret"),
            ("reminder_email", "owner@example.com"),
        ]);
        let overrides = EmailOverrides {
            user: Some("env@example.com".to_string()),
            password: None,
            recipient: Some("boss@example.com".to_string()),
        };
        let target = resolve_target(&overrides, &settings).unwrap();
        assert_eq!(target.credentials.user, "env@example.com");
        assert_eq!(target.credentials.password.expose_secret(), "secret");
        assert_eq!(target.recipient, "boss@example.com");
    }

    #[test]
    fn any_missing_value_means_no_target() {
        let settings = stored(&[("email_user", "shop@example.com"), ("email_pass", "")]);
        let overrides = EmailOverrides {
            recipient: Some("owner@example.com".to_string()),
            ..Default::default()
        };
        assert!(resolve_target(&overrides, &settings).is_none());
    }
}
