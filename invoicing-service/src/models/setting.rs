//! Key/value settings.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

pub const EMAIL_USER_KEY: &str = "email_user";
pub const EMAIL_PASS_KEY: &str = "email_pass";
pub const REMINDER_EMAIL_KEY: &str = "reminder_email";

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Setting {
    pub key: String,
    pub value: Option<String>,
}
