pub mod mpesa_service;
pub mod payment_outcome;
