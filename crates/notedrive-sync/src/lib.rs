//! NoteDrive sync engine
//!
//! Bidirectional synchronization between a local notes folder and a linked
//! cloud-drive folder. The engine is a library with no I/O of its own:
//! every effect goes through the gateway ports defined in `notedrive-core`,
//! so the whole pipeline runs against in-memory fakes in tests.
//!
//! One run is strictly sequential: preflight, then either an initial full
//! reconcile or a push pass followed by a change-feed pull pass. The
//! [`runner::SyncRunner`] serializes runs and maps terminal errors onto the
//! host scheduler's retry policy.

pub mod conflict;
pub mod deletes;
pub mod engine;
pub mod error;
pub mod executor;
pub mod filter;
pub mod initial;
pub mod path_resolver;
pub mod preflight;
pub mod pull;
pub mod push;
pub mod runner;
pub mod tree_walker;

pub use engine::{RunStats, SyncEngine};
pub use error::{DriveApiStatus, NetworkFailure, SyncError};
pub use preflight::{PreflightOutcome, SyncContext, SyncPreflight};
pub use runner::SyncRunner;
