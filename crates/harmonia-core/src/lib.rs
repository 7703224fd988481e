//! Catalog core: the vote ledger, derived-aggregate recomputation, and the
//! song-to-album reassignment coordinator.
//!
//! Every operation here takes an explicit connection (`&impl ConnectionTrait`)
//! so callers can scope it to a transaction. The HTTP layer opens one
//! transaction per mutating request, runs the relevant core operations through
//! it, and commits; any failure rolls the whole request back, which is what
//! keeps the derived columns (`listen_time_secs`, `rating`, biography counts)
//! consistent with actual membership.

pub mod aggregates;
pub mod error;
pub mod reassign;
pub mod votes;

pub use error::CoreError;
