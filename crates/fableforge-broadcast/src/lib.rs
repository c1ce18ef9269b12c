//! Fableforge Broadcast — fans structured events out to every connected
//! listener over bounded, drop-oldest queues.

pub mod event;
pub mod hub;

pub use event::StreamEvent;
pub use hub::{BroadcastHub, Delivery, ListenerQueue, StreamItem, keepalive_stream};
