//! Shared types for the mint oracle.
//!
//! Every crate in the workspace speaks in these types: payment claims, chain
//! receipts as the oracle sees them, mint authorizations, the price schedule
//! and the HTTP request/response bodies.

pub mod api;
pub mod authorization;
pub mod chain;
pub mod claim;
pub mod pricing;

pub use api::*;
pub use authorization::*;
pub use chain::*;
pub use claim::*;
pub use pricing::*;

/// Sequence position of a voucher within the series, starting at 1.
pub type TokenId = u64;
