//! NoteDrive Core - Domain logic and gateway contracts
//!
//! This crate contains the hexagonal architecture core with:
//! - **Domain entities** - `SyncItem`, `SyncFolder`, `SyncMeta`, `SyncStatus`
//! - **Preferences** - `SyncPreferences`, `RemoteDeletePolicy`
//! - **Result types** - `SyncOutcome`, `WorkerDecision`
//! - **Gateway ports** - Traits for adapters: `PrefsGateway`, `AuthGateway`,
//!   `DriveGateway`, `LocalFsGateway`, `SyncStore`
//!
//! # Architecture
//!
//! This crate follows the hexagonal (ports & adapters) architecture pattern.
//! The domain module contains pure business logic with no external dependencies.
//! Ports define trait interfaces that adapter crates implement; the sync engine
//! in `notedrive-sync` orchestrates domain entities through port interfaces.

pub mod domain;
pub mod ports;
