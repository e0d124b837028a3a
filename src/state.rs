use std::sync::Arc;

use crate::repositories::OrderRepository;
use crate::services::mpesa_service::MpesaService;

#[derive(Clone)]
pub struct AppState {
    /// The only shared mutable resource in the payment flow. Injected so the
    /// storage technology is swappable (MongoDB in production, an in-memory
    /// fake in tests).
    pub orders: Arc<dyn OrderRepository>,
    /// Absent when Daraja credentials are not configured; STK push returns
    /// 503 in that case while callback and status keep working.
    pub mpesa: Option<Arc<MpesaService>>,
}

impl AppState {
    pub fn new(orders: Arc<dyn OrderRepository>) -> Self {
        AppState {
            orders,
            mpesa: None,
        }
    }

    pub fn with_mpesa(mut self, mpesa: Arc<MpesaService>) -> Self {
        self.mpesa = Some(mpesa);
        self
    }
}
