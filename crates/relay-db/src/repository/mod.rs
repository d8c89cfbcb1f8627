//! # Repository Module
//!
//! Repositories layered over the [`KvStore`](crate::kv::KvStore) capability.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  UploadService (relay-server)                                          │
//! │       │                                                                 │
//! │       │  repo.find_by_id(&session_id)                                  │
//! │       ▼                                                                 │
//! │  MetadataRepository                                                    │
//! │  ├── store(&self, record)                                              │
//! │  ├── find_by_id(&self, key)                                            │
//! │  ├── update(&self, patch)                                              │
//! │  ├── remove(&self, session_id)                                         │
//! │  └── read_all(&self)                                                   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  KvStore (SQLite or memory) + UploadStoreInvoker                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`MetadataRepository`](metadata::MetadataRepository) - Dual-key upload metadata

pub mod metadata;
