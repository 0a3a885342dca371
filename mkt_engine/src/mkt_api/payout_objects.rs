use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db_types::PayoutMethod;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayoutRequest {
    pub method: PayoutMethod,
    /// Defaults to the beginning of time
    #[serde(default)]
    pub period_start: Option<DateTime<Utc>>,
    /// Defaults to now
    #[serde(default)]
    pub period_end: Option<DateTime<Utc>>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayoutDecision {
    Approve,
    Reject,
}
