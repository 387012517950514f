//! # Application Layer
//!
//! Use cases orchestrating domain types against the ports. Each operation
//! from the container's external interface gets its own module; `engine.rs`
//! at the crate root wires them behind a single façade with the process-wide
//! lock described in §5.

pub mod add_file;
pub mod export_archive;
pub mod garbage_collect;
pub mod import_archive;
pub mod move_file;
pub mod query;
pub mod remove_file;
pub mod restore_version;
pub mod save_checkpoint;
pub mod verify;
