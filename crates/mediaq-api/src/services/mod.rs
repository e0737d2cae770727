//! Business logic services.

pub mod queue_admin;

pub use queue_admin::QueueAdmin;
