// src/models.rs
use crate::error::{FolioError, Result};
use crate::wire;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Holding {
    pub id: String,
    #[serde(default)]
    pub user_id: Option<String>,
    pub symbol: String,
    #[serde(default)]
    pub name: String,
    #[serde(deserialize_with = "wire::decimal")]
    pub shares: f64,
    #[serde(deserialize_with = "wire::decimal")]
    pub avg_cost: f64,
    #[serde(deserialize_with = "wire::timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(deserialize_with = "wire::timestamp")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HoldingCreate {
    pub symbol: String,
    pub shares: f64,
    pub avg_cost: f64,
}

impl HoldingCreate {
    /// Builds a create payload with the symbol trimmed and uppercased.
    pub fn new(symbol: &str, shares: f64, avg_cost: f64) -> Self {
        HoldingCreate {
            symbol: symbol.trim().to_uppercase(),
            shares,
            avg_cost,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.symbol.trim().is_empty() {
            return Err(FolioError::Validation("Symbol is required".into()));
        }
        validate_shares(self.shares)?;
        validate_avg_cost(self.avg_cost)
    }
}

/// Partial update. The symbol is immutable after creation and never sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HoldingUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shares: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_cost: Option<f64>,
}

impl HoldingUpdate {
    pub fn shares(shares: f64) -> Self {
        HoldingUpdate {
            shares: Some(shares),
            avg_cost: None,
        }
    }

    pub fn avg_cost(avg_cost: f64) -> Self {
        HoldingUpdate {
            shares: None,
            avg_cost: Some(avg_cost),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.shares.is_none() && self.avg_cost.is_none() {
            return Err(FolioError::Validation("Nothing to update".into()));
        }
        if let Some(shares) = self.shares {
            validate_shares(shares)?;
        }
        if let Some(avg_cost) = self.avg_cost {
            validate_avg_cost(avg_cost)?;
        }
        Ok(())
    }
}

fn validate_shares(shares: f64) -> Result<()> {
    if shares.is_finite() && shares > 0.0 {
        Ok(())
    } else {
        Err(FolioError::Validation(
            "Shares must be a positive number".into(),
        ))
    }
}

fn validate_avg_cost(avg_cost: f64) -> Result<()> {
    if avg_cost.is_finite() && avg_cost > 0.0 {
        Ok(())
    } else {
        Err(FolioError::Validation(
            "Avg cost must be a positive number".into(),
        ))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardHolding {
    pub symbol: String,
    #[serde(deserialize_with = "wire::decimal")]
    pub shares: f64,
    #[serde(deserialize_with = "wire::decimal")]
    pub avg_cost: f64,
    #[serde(deserialize_with = "wire::decimal")]
    pub current_price: f64,
    #[serde(deserialize_with = "wire::decimal")]
    pub previous_close: f64,
    #[serde(deserialize_with = "wire::decimal")]
    pub daily_change_pct: f64,
    #[serde(deserialize_with = "wire::decimal")]
    pub market_value: f64,
    #[serde(deserialize_with = "wire::decimal")]
    pub pnl: f64,
    #[serde(deserialize_with = "wire::decimal")]
    pub pnl_pct: f64,
    #[serde(deserialize_with = "wire::decimal")]
    pub allocation_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dashboard {
    #[serde(deserialize_with = "wire::decimal")]
    pub total_value: f64,
    #[serde(deserialize_with = "wire::decimal")]
    pub total_cost: f64,
    #[serde(deserialize_with = "wire::decimal")]
    pub total_pnl: f64,
    #[serde(deserialize_with = "wire::decimal")]
    pub total_pnl_pct: f64,
    #[serde(deserialize_with = "wire::timestamp")]
    pub last_updated: DateTime<Utc>,
    pub holdings: Vec<DashboardHolding>,
}

// Identity provider payloads

#[derive(Debug, Serialize)]
pub struct Credentials<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Serialize)]
pub struct ConfirmRequest<'a> {
    pub email: &'a str,
    pub confirmation_code: &'a str,
}

#[derive(Debug, Serialize)]
pub struct EmailRequest<'a> {
    pub email: &'a str,
}

#[derive(Debug, Serialize)]
pub struct RefreshRequest<'a> {
    pub refresh_token: &'a str,
}

#[derive(Debug, Serialize)]
pub struct SignOutRequest<'a> {
    pub access_token: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SignUpResponse {
    pub user_sub: String,
    pub user_confirmed: bool,
    pub message: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConfirmResponse {
    pub confirmed: bool,
    pub message: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SignInResponse {
    pub id_token: String,
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: u64,
    pub token_type: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RefreshResponse {
    pub id_token: String,
    pub access_token: String,
    pub expires_in: u64,
    pub token_type: String,
}

/// Error body returned by the backend on non-2xx responses.
///
/// `detail` is usually a string, but request validation failures carry a
/// list of objects instead.
#[derive(Debug, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub detail: Option<serde_json::Value>,
    #[serde(default)]
    pub code: Option<String>,
}

impl ErrorBody {
    pub fn message(&self) -> Option<String> {
        match self.detail.as_ref()? {
            serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
            serde_json::Value::String(_) | serde_json::Value::Null => None,
            other => Some(other.to_string()),
        }
    }
}
