use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use bson::oid::ObjectId;
use chrono::Utc;

use crate::errors::Result;
use crate::models::order::{Order, PaymentMetadata, PaymentStatus};
use crate::repositories::{OrderRepository, PaymentUpdate};

/// In-memory order store behind the same trait as the MongoDB one.
/// Used by the test suite; keyed by checkout request id.
#[derive(Debug, Default)]
pub struct InMemoryOrderRepository {
    orders: RwLock<HashMap<String, Order>>,
}

impl InMemoryOrderRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OrderRepository for InMemoryOrderRepository {
    async fn create(&self, mut order: Order) -> Result<Order> {
        if order.id.is_none() {
            order.id = Some(ObjectId::new());
        }
        let mut orders = self.orders.write().unwrap();
        orders.insert(order.checkout_request_id.clone(), order.clone());
        Ok(order)
    }

    async fn find_by_order_id(&self, order_id: &str) -> Result<Option<Order>> {
        let orders = self.orders.read().unwrap();
        let order = orders
            .values()
            .find(|o| o.id.map(|id| id.to_hex()).as_deref() == Some(order_id))
            .cloned();
        Ok(order)
    }

    async fn find_by_checkout_id(&self, checkout_request_id: &str) -> Result<Option<Order>> {
        let orders = self.orders.read().unwrap();
        Ok(orders.get(checkout_request_id).cloned())
    }

    async fn finalize_payment(
        &self,
        checkout_request_id: &str,
        status: PaymentStatus,
        metadata: PaymentMetadata,
    ) -> Result<PaymentUpdate> {
        let mut orders = self.orders.write().unwrap();
        let Some(order) = orders.get_mut(checkout_request_id) else {
            return Ok(PaymentUpdate::NotFound);
        };
        if order.payment_status.is_terminal() {
            return Ok(PaymentUpdate::AlreadyFinal);
        }

        order.payment_status = status;
        order.payment_metadata = Some(metadata);
        order.updated_at = Utc::now();
        Ok(PaymentUpdate::Applied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending_order(checkout_id: &str) -> Order {
        Order::pending(checkout_id, "29115-34620561-1", "254708374149", 500.0, "WINE-1001")
    }

    #[tokio::test]
    async fn finalize_transitions_pending_order() {
        let repo = InMemoryOrderRepository::new();
        repo.create(pending_order("ws_CO_01")).await.unwrap();

        let metadata = PaymentMetadata {
            amount: Some(500.0),
            mpesa_receipt_number: Some("QGR7XXXX".to_string()),
            ..Default::default()
        };
        let update = repo
            .finalize_payment("ws_CO_01", PaymentStatus::Completed, metadata)
            .await
            .unwrap();
        assert_eq!(update, PaymentUpdate::Applied);

        let order = repo.find_by_checkout_id("ws_CO_01").await.unwrap().unwrap();
        assert_eq!(order.payment_status, PaymentStatus::Completed);
        let metadata = order.payment_metadata.unwrap();
        assert_eq!(metadata.amount, Some(500.0));
        assert_eq!(metadata.mpesa_receipt_number.as_deref(), Some("QGR7XXXX"));
    }

    #[tokio::test]
    async fn finalize_refuses_second_transition() {
        let repo = InMemoryOrderRepository::new();
        repo.create(pending_order("ws_CO_02")).await.unwrap();

        repo.finalize_payment("ws_CO_02", PaymentStatus::Completed, PaymentMetadata::default())
            .await
            .unwrap();

        // Redelivery with a conflicting payload must not overwrite.
        let update = repo
            .finalize_payment(
                "ws_CO_02",
                PaymentStatus::Failed,
                PaymentMetadata {
                    error: Some("Request cancelled by user".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(update, PaymentUpdate::AlreadyFinal);

        let order = repo.find_by_checkout_id("ws_CO_02").await.unwrap().unwrap();
        assert_eq!(order.payment_status, PaymentStatus::Completed);
    }

    #[tokio::test]
    async fn finalize_unknown_checkout_id() {
        let repo = InMemoryOrderRepository::new();
        let update = repo
            .finalize_payment("ws_CO_missing", PaymentStatus::Completed, PaymentMetadata::default())
            .await
            .unwrap();
        assert_eq!(update, PaymentUpdate::NotFound);
    }

    #[tokio::test]
    async fn find_by_order_id_matches_hex_id() {
        let repo = InMemoryOrderRepository::new();
        let created = repo.create(pending_order("ws_CO_03")).await.unwrap();
        let id = created.id.unwrap().to_hex();

        let found = repo.find_by_order_id(&id).await.unwrap().unwrap();
        assert_eq!(found.checkout_request_id, "ws_CO_03");
        assert!(repo.find_by_order_id("not-an-id").await.unwrap().is_none());
    }
}
