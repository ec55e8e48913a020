//! # saml-storage
//!
//! Storage abstraction for the SAML binding layer.
//!
//! The artifact map parks protocol messages in a partitioned key-value store
//! and redeems them later, possibly from another request thread. This crate
//! defines that contract and ships an in-process implementation.
//!
//! - [`StorageService`] - partitioned get/put/remove/contains
//! - [`InMemoryStorageService`] - `DashMap` backed implementation
//!
//! ## Example
//!
//! ```ignore
//! use saml_storage::{InMemoryStorageService, StorageService};
//!
//! let storage = InMemoryStorageService::new();
//! storage.put("artifact", "AAQAAM...", entry)?;
//! let entry = storage.get("artifact", "AAQAAM...")?;
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod error;
pub mod memory;
pub mod provider;

pub use error::{StorageError, StorageResult};
pub use memory::InMemoryStorageService;
pub use provider::StorageService;
