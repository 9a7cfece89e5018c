//! Sample lifecycle and test-assignment operations.
//!
//! Every operation takes an explicit [`Actor`](crate::models::Actor);
//! authorization is checked before any write is attempted.

mod assignment;
mod lifecycle;

pub use assignment::*;
pub use lifecycle::*;
