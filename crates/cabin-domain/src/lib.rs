//! cabin-domain
//!
//! Pure domain models (Home, Usage, payloads and scopes).
//! No I/O, no CLI, no storage. Only data types and core enums.

pub mod common;
pub mod home;
pub mod usage;

pub use common::*;
pub use home::*;
pub use usage::*;
