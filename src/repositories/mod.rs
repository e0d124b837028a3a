pub mod memory;
pub mod mongo;

pub use memory::InMemoryOrderRepository;
pub use mongo::MongoOrderRepository;

use async_trait::async_trait;

use crate::errors::Result;
use crate::models::order::{Order, PaymentMetadata, PaymentStatus};

/// Result of attempting the single `pending -> terminal` payment transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentUpdate {
    /// The order was still pending and has been finalized.
    Applied,
    /// The order exists but was already finalized; duplicate or out-of-order
    /// delivery, left untouched.
    AlreadyFinal,
    /// No order carries this checkout request id.
    NotFound,
}

/// Storage capability for orders. The payment flow only ever creates a
/// pending order, looks one up, and finalizes its payment status once.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    async fn create(&self, order: Order) -> Result<Order>;

    async fn find_by_order_id(&self, order_id: &str) -> Result<Option<Order>>;

    async fn find_by_checkout_id(&self, checkout_request_id: &str) -> Result<Option<Order>>;

    /// Conditional transition: applies `status`/`metadata` only while the
    /// order is still `Pending`, so redelivered callbacks cannot overwrite a
    /// finalized order.
    async fn finalize_payment(
        &self,
        checkout_request_id: &str,
        status: PaymentStatus,
        metadata: PaymentMetadata,
    ) -> Result<PaymentUpdate>;
}
