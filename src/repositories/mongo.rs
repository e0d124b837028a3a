use async_trait::async_trait;
use bson::{doc, oid::ObjectId};
use mongodb::{Collection, Database};

use crate::errors::Result;
use crate::models::order::{Order, PaymentMetadata, PaymentStatus};
use crate::repositories::{OrderRepository, PaymentUpdate};

const ORDERS_COLLECTION: &str = "orders";

/// MongoDB-backed order store.
#[derive(Debug, Clone)]
pub struct MongoOrderRepository {
    collection: Collection<Order>,
}

impl MongoOrderRepository {
    pub fn new(db: &Database) -> Self {
        MongoOrderRepository {
            collection: db.collection(ORDERS_COLLECTION),
        }
    }
}

#[async_trait]
impl OrderRepository for MongoOrderRepository {
    async fn create(&self, mut order: Order) -> Result<Order> {
        if order.id.is_none() {
            order.id = Some(ObjectId::new());
        }
        self.collection.insert_one(&order).await?;
        Ok(order)
    }

    async fn find_by_order_id(&self, order_id: &str) -> Result<Option<Order>> {
        // A malformed id cannot match any document.
        let oid = match ObjectId::parse_str(order_id) {
            Ok(oid) => oid,
            Err(_) => return Ok(None),
        };
        let order = self.collection.find_one(doc! { "_id": oid }).await?;
        Ok(order)
    }

    async fn find_by_checkout_id(&self, checkout_request_id: &str) -> Result<Option<Order>> {
        let order = self
            .collection
            .find_one(doc! { "checkout_request_id": checkout_request_id })
            .await?;
        Ok(order)
    }

    async fn finalize_payment(
        &self,
        checkout_request_id: &str,
        status: PaymentStatus,
        metadata: PaymentMetadata,
    ) -> Result<PaymentUpdate> {
        // The filter doubles as the idempotency guard: only a still-pending
        // order matches, so the write is a conditional single transition.
        let filter = doc! {
            "checkout_request_id": checkout_request_id,
            "payment_status": PaymentStatus::Pending.as_str(),
        };
        let update = doc! {
            "$set": {
                "payment_status": status.as_str(),
                "payment_metadata": bson::to_bson(&metadata)?,
                "updated_at": bson::DateTime::now(),
            }
        };

        let result = self.collection.update_one(filter, update).await?;
        if result.matched_count > 0 {
            return Ok(PaymentUpdate::Applied);
        }

        match self.find_by_checkout_id(checkout_request_id).await? {
            Some(_) => Ok(PaymentUpdate::AlreadyFinal),
            None => Ok(PaymentUpdate::NotFound),
        }
    }
}
