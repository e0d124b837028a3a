// handlers/payment_handlers.rs
use axum::{
    body::Bytes,
    extract::{Query, State},
    response::Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{error, info, warn};

use crate::errors::{AppError, Result};
use crate::models::mpesa_callback::MpesaCallback;
use crate::models::order::{Order, PaymentStatus};
use crate::services::payment_outcome::PaymentOutcome;
use crate::state::AppState;
use crate::repositories::PaymentUpdate;

#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    pub phone_number: String,
    pub amount: f64,
    pub account_reference: Option<String>,
    pub transaction_desc: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    #[serde(rename = "orderId")]
    pub order_id: Option<String>,
    #[serde(rename = "checkoutRequestId")]
    pub checkout_request_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PaymentStatusResponse {
    #[serde(rename = "orderId")]
    pub order_id: String,
    #[serde(rename = "paymentStatus")]
    pub payment_status: &'static str,
    #[serde(rename = "transactionId", skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

/// Starts a checkout: prompts the customer's phone through Daraja and
/// records the pending order under the returned checkout request id.
pub async fn initiate_stk_push(
    State(state): State<AppState>,
    Json(request): Json<CheckoutRequest>,
) -> Result<Json<Value>> {
    if request.phone_number.trim().is_empty() {
        return Err(AppError::Validation("phone_number is required".to_string()));
    }
    if request.amount <= 0.0 {
        return Err(AppError::Validation(
            "amount must be greater than 0".to_string(),
        ));
    }

    let mpesa = state.mpesa.as_ref().ok_or_else(|| {
        AppError::ServiceUnavailable("M-Pesa service is not available".to_string())
    })?;

    let account_reference = request.account_reference.as_deref().unwrap_or("WineStore");
    let transaction_desc = request
        .transaction_desc
        .as_deref()
        .unwrap_or("Wine order payment");

    let response = mpesa
        .initiate_stk_push(
            &request.phone_number,
            request.amount,
            account_reference,
            transaction_desc,
        )
        .await?;

    let order = state
        .orders
        .create(Order::pending(
            &response.checkout_request_id,
            &response.merchant_request_id,
            request.phone_number,
            request.amount,
            account_reference,
        ))
        .await?;

    info!(
        "checkout started: order {:?} checkout_request_id {}",
        order.id, order.checkout_request_id
    );

    Ok(Json(json!({
        "success": true,
        "data": {
            "orderId": order.id.map(|id| id.to_hex()).unwrap_or_default(),
            "checkoutRequestId": response.checkout_request_id,
            "merchantRequestId": response.merchant_request_id,
            "customerMessage": response.customer_message,
        },
    })))
}

/// Provider confirmation endpoint. Whatever happens inside (unparseable
/// body, unknown checkout id, store failure) the response is HTTP 200 with
/// a success-shaped body, because Safaricom treats anything else as a
/// delivery failure and keeps retrying.
pub async fn mpesa_callback(State(state): State<AppState>, body: Bytes) -> Json<Value> {
    let callback = match serde_json::from_slice::<MpesaCallback>(&body) {
        Ok(envelope) => envelope.body.stk_callback,
        Err(e) => {
            warn!("discarding unparseable M-Pesa callback: {}", e);
            return callback_ack();
        }
    };

    info!(
        "M-Pesa callback: checkout_request_id {} result_code {}",
        callback.checkout_request_id, callback.result_code
    );

    let outcome = PaymentOutcome::from_callback(&callback);
    let status = outcome.status();
    let checkout_request_id = outcome.checkout_request_id.clone();
    let receipt = outcome.receipt_number.clone();

    match state
        .orders
        .finalize_payment(&checkout_request_id, status, outcome.into_metadata())
        .await
    {
        Ok(PaymentUpdate::Applied) => {
            info!(
                "order payment {}: checkout_request_id {}",
                status.as_str(),
                checkout_request_id
            );
            if status == PaymentStatus::Completed {
                // Notification hook. A confirmation email would go out here.
                info!(
                    "payment confirmed, receipt {}; notification hook fired",
                    receipt.unwrap_or_default()
                );
            }
        }
        Ok(PaymentUpdate::AlreadyFinal) => {
            warn!(
                "duplicate callback for finalized order, ignored: {}",
                checkout_request_id
            );
        }
        Ok(PaymentUpdate::NotFound) => {
            warn!(
                "callback for unknown checkout_request_id: {}",
                checkout_request_id
            );
        }
        Err(e) => {
            error!(
                "failed to record payment result for {}: {}",
                checkout_request_id, e
            );
        }
    }

    callback_ack()
}

fn callback_ack() -> Json<Value> {
    Json(json!({
        "ResultCode": 0,
        "ResultDesc": "Success",
    }))
}

/// Client-facing poll endpoint: looks the order up by id or checkout
/// request id and reports its current payment status.
pub async fn payment_status(
    State(state): State<AppState>,
    Query(query): Query<StatusQuery>,
) -> Result<Json<Value>> {
    let order = if let Some(order_id) = query.order_id.as_deref() {
        state
            .orders
            .find_by_order_id(order_id)
            .await?
            .ok_or_else(|| AppError::OrderNotFound(order_id.to_string()))?
    } else if let Some(checkout_id) = query.checkout_request_id.as_deref() {
        state
            .orders
            .find_by_checkout_id(checkout_id)
            .await?
            .ok_or_else(|| AppError::OrderNotFound(checkout_id.to_string()))?
    } else {
        return Err(AppError::MissingParameter(
            "orderId or checkoutRequestId is required".to_string(),
        ));
    };

    let metadata = order.payment_metadata.as_ref();
    let response = PaymentStatusResponse {
        order_id: order.id.map(|id| id.to_hex()).unwrap_or_default(),
        payment_status: order.payment_status.as_str(),
        transaction_id: metadata.and_then(|m| m.mpesa_receipt_number.clone()),
        amount: metadata.and_then(|m| m.amount),
        timestamp: Some(order.updated_at.to_rfc3339()),
    };

    Ok(Json(json!({
        "success": true,
        "data": response,
    })))
}

/// Shared 405 for verbs the payment routes do not serve.
pub async fn method_not_allowed() -> AppError {
    AppError::MethodNotAllowed
}
