//! Message delivery orchestration.

pub mod router;

pub use router::DeliveryRouter;
