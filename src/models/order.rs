use bson::oid::ObjectId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Payment lifecycle of an order. An order is created `Pending` when
/// checkout begins and is finalized at most once by the provider callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Completed => "completed",
            PaymentStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, PaymentStatus::Pending)
    }
}

/// Provider-supplied details attached to an order when its payment is
/// finalized. On failure only `error` is set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PaymentMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mpesa_receipt_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,

    pub checkout_request_id: String,
    pub merchant_request_id: String,
    pub phone_number: String,
    pub amount: f64,
    pub account_reference: String,

    pub payment_status: PaymentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_metadata: Option<PaymentMetadata>,

    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// A fresh order in `Pending` state, as created when an STK push is
    /// initiated for a checkout.
    pub fn pending(
        checkout_request_id: impl Into<String>,
        merchant_request_id: impl Into<String>,
        phone_number: impl Into<String>,
        amount: f64,
        account_reference: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Order {
            id: None,
            checkout_request_id: checkout_request_id.into(),
            merchant_request_id: merchant_request_id.into(),
            phone_number: phone_number.into(),
            amount,
            account_reference: account_reference.into(),
            payment_status: PaymentStatus::Pending,
            payment_metadata: None,
            created_at: now,
            updated_at: now,
        }
    }
}
