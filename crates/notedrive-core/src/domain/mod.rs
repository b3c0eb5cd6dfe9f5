//! Domain layer: entities, newtypes, and closed result sums
//!
//! Pure business types with no I/O. Everything here is serde-serializable
//! so that store adapters and test fixtures can round-trip records.

pub mod errors;
pub mod newtypes;
pub mod preferences;
pub mod results;
pub mod status;
pub mod sync_folder;
pub mod sync_item;

pub use errors::DomainError;
pub use newtypes::{DriveId, PageToken, RelPath};
pub use preferences::{RemoteDeletePolicy, SyncPreferences};
pub use results::{SyncOutcome, WorkerDecision};
pub use status::{SyncStatus, SyncStatusState};
pub use sync_folder::{SyncFolder, SyncMeta};
pub use sync_item::{SyncItem, SyncState};
