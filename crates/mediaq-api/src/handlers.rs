//! Request handlers.

pub mod admin;
pub mod health;
pub mod queue;

pub use admin::*;
pub use health::*;
pub use queue::*;
