//! Domain types for the sample-tracking core.

mod catalog;
mod sample;
mod user;

pub use catalog::*;
pub use sample::*;
pub use user::*;
