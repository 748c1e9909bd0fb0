//! LCCN subscription service
//!
//! Subscription lifecycle management and notification routing on top of a
//! [`SubscriptionRepository`](lccn_metadata::SubscriptionRepository).

pub mod lifecycle;
pub mod metrics;
pub mod router;

pub use lifecycle::SubscriptionManager;
pub use router::NotificationRouter;
