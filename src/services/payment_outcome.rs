// services/payment_outcome.rs
use serde_json::Value;

use crate::models::mpesa_callback::StkCallback;
use crate::models::order::{PaymentMetadata, PaymentStatus};

/// Typed result of one provider callback. `ResultCode == 0` is success, any
/// other value is a failure carrying the provider's description. Consumed to
/// finalize an order; never persisted on its own.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentOutcome {
    pub checkout_request_id: String,
    pub result_code: i32,
    pub result_desc: String,
    pub amount: Option<f64>,
    pub receipt_number: Option<String>,
    pub transaction_date: Option<String>,
    pub phone_number: Option<String>,
}

impl PaymentOutcome {
    /// Maps the provider's nested callback into a flat outcome. Recognized
    /// metadata names are `Amount`, `MpesaReceiptNumber`, `TransactionDate`
    /// and `PhoneNumber`; anything else is ignored so new provider fields
    /// cannot break the flow. Never fails: a malformed item just leaves its
    /// field unset.
    pub fn from_callback(callback: &StkCallback) -> Self {
        let mut outcome = PaymentOutcome {
            checkout_request_id: callback.checkout_request_id.clone(),
            result_code: callback.result_code,
            result_desc: callback.result_desc.clone(),
            amount: None,
            receipt_number: None,
            transaction_date: None,
            phone_number: None,
        };

        if let Some(metadata) = &callback.callback_metadata {
            for item in &metadata.items {
                match item.name.as_str() {
                    "Amount" => outcome.amount = value_as_f64(&item.value),
                    "MpesaReceiptNumber" => outcome.receipt_number = value_as_string(&item.value),
                    "TransactionDate" => outcome.transaction_date = value_as_string(&item.value),
                    "PhoneNumber" => outcome.phone_number = value_as_string(&item.value),
                    _ => {}
                }
            }
        }

        outcome
    }

    pub fn is_success(&self) -> bool {
        self.result_code == 0
    }

    pub fn status(&self) -> PaymentStatus {
        if self.is_success() {
            PaymentStatus::Completed
        } else {
            PaymentStatus::Failed
        }
    }

    /// The metadata stored on the order: provider details on success, the
    /// failure description on anything else.
    pub fn into_metadata(self) -> PaymentMetadata {
        if self.is_success() {
            PaymentMetadata {
                amount: self.amount,
                mpesa_receipt_number: self.receipt_number,
                transaction_date: self.transaction_date,
                phone_number: self.phone_number,
                error: None,
            }
        } else {
            PaymentMetadata {
                error: Some(self.result_desc),
                ..Default::default()
            }
        }
    }
}

// Daraja is loose about value types; amounts arrive as numbers or numeric
// strings, phone numbers and dates as either strings or integers.
fn value_as_f64(value: &Value) -> Option<f64> {
    value
        .as_f64()
        .or_else(|| value.as_str().and_then(|s| s.trim().parse().ok()))
}

fn value_as_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::mpesa_callback::MpesaCallback;
    use serde_json::json;

    fn callback_from(value: serde_json::Value) -> StkCallback {
        let envelope: MpesaCallback = serde_json::from_value(value).unwrap();
        envelope.body.stk_callback
    }

    fn success_envelope(items: serde_json::Value) -> serde_json::Value {
        json!({
            "Body": {
                "stkCallback": {
                    "MerchantRequestID": "29115-34620561-1",
                    "CheckoutRequestID": "ws_CO_191220191020363925",
                    "ResultCode": 0,
                    "ResultDesc": "The service request is processed successfully.",
                    "CallbackMetadata": { "Item": items }
                }
            }
        })
    }

    #[test]
    fn success_populates_recognized_metadata() {
        let callback = callback_from(success_envelope(json!([
            { "Name": "Amount", "Value": 500 },
            { "Name": "MpesaReceiptNumber", "Value": "QGR7XXXX" },
            { "Name": "TransactionDate", "Value": 20231215143022u64 },
            { "Name": "PhoneNumber", "Value": 254708374149u64 },
            { "Name": "Balance", "Value": "ignored" }
        ])));

        let outcome = PaymentOutcome::from_callback(&callback);
        assert!(outcome.is_success());
        assert_eq!(outcome.status(), PaymentStatus::Completed);
        assert_eq!(outcome.amount, Some(500.0));
        assert_eq!(outcome.receipt_number.as_deref(), Some("QGR7XXXX"));
        assert_eq!(outcome.transaction_date.as_deref(), Some("20231215143022"));
        assert_eq!(outcome.phone_number.as_deref(), Some("254708374149"));
    }

    #[test]
    fn amount_accepts_numeric_string() {
        let callback = callback_from(success_envelope(json!([
            { "Name": "Amount", "Value": "750.50" }
        ])));
        let outcome = PaymentOutcome::from_callback(&callback);
        assert_eq!(outcome.amount, Some(750.5));
    }

    #[test]
    fn malformed_item_leaves_field_unset() {
        let callback = callback_from(success_envelope(json!([
            { "Name": "Amount", "Value": {"nested": true} },
            { "Name": "MpesaReceiptNumber" }
        ])));
        let outcome = PaymentOutcome::from_callback(&callback);
        assert!(outcome.is_success());
        assert_eq!(outcome.amount, None);
        assert_eq!(outcome.receipt_number, None);
    }

    #[test]
    fn failure_carries_result_desc() {
        let callback = callback_from(json!({
            "Body": {
                "stkCallback": {
                    "MerchantRequestID": "29115-34620561-1",
                    "CheckoutRequestID": "ws_CO_191220191020363925",
                    "ResultCode": 1032,
                    "ResultDesc": "Request cancelled by user"
                }
            }
        }));

        let outcome = PaymentOutcome::from_callback(&callback);
        assert!(!outcome.is_success());
        assert_eq!(outcome.status(), PaymentStatus::Failed);

        let metadata = outcome.into_metadata();
        assert_eq!(metadata.error.as_deref(), Some("Request cancelled by user"));
        assert_eq!(metadata.amount, None);
    }

    #[test]
    fn success_metadata_has_no_error() {
        let callback = callback_from(success_envelope(json!([
            { "Name": "Amount", "Value": 500 }
        ])));
        let metadata = PaymentOutcome::from_callback(&callback).into_metadata();
        assert_eq!(metadata.amount, Some(500.0));
        assert!(metadata.error.is_none());
    }
}
