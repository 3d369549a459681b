//! Infrastructure adapters and runtime bootstrap.

pub mod assets;
pub mod changefeed;
pub mod db;
pub mod error;
pub mod identity;
pub mod memory;
pub mod telemetry;
