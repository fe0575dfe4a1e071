//! Store - Local mirror, remote record store, and teardown drain
//!
//! This crate holds the storage ports the sync engine talks to, together
//! with the implementations used in development and tests:
//!
//! - `LocalMirror`: synchronous full-state cache (`MemoryMirror`, `FileMirror`)
//! - `RemoteStore`: durable keyed record store with epoch fencing
//!   (`MemoryRemoteStore`)
//! - `DrainTransport`: fire-and-forget teardown send
//!   (`ChannelDrainTransport`, `StoreBeacon`)

mod error;
mod remote;
mod mirror;
mod file_mirror;
mod memory_remote;
mod drain;

pub use error::*;
pub use remote::*;
pub use mirror::*;
pub use file_mirror::*;
pub use memory_remote::*;
pub use drain::*;
