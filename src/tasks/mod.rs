//! Background Tasks Module
//!
//! Long-running workers that keep the cache tidy.
//!
//! # Tasks
//! - Expirer: one thread per TTL partition, removes items as they expire
//! - Janitor: periodically drops abandoned transactions

mod expirer;
mod janitor;

pub use expirer::Expirer;
pub use janitor::spawn_janitor_task;
