//! Real-time announcements of order lifecycle changes.
//!
//! The [`NotificationHub`] knows nothing about sockets; transports subscribe,
//! drain their [`Subscription`] and unsubscribe when the connection ends.

pub mod hub;
pub mod notification;

pub use hub::{DEFAULT_SUBSCRIBER_BUFFER, DeliveryReport, NotificationHub, SubscriberId, Subscription};
pub use notification::Notification;
