//! # relay-db: Metadata Persistence for Log Relay
//!
//! This crate stores upload metadata in named key-value collections, backed
//! by SQLite through sqlx.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Log Relay Data Flow                              │
//! │                                                                         │
//! │  UploadService (post-create / post-finish / terminate)                 │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     relay-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repository   │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │ (metadata.rs) │    │  (embedded)  │  │   │
//! │  │   │               │    │               │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│ KvStore       │    │ 001_kv_      │  │   │
//! │  │   │               │    │ Invoker       │    │   entries    │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 SQLite Database (relay.db)                      │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`kv`] - The `KvStore` capability and its SQLite / memory stores
//! - [`invoker`] - Blob removal capability
//! - [`repository`] - `MetadataRepository`
//! - [`error`] - Database error types
//!
//! ## Usage
//!
//! ```rust,ignore
//! use relay_db::{Database, DbConfig, MetadataRepository};
//!
//! let db = Database::new(DbConfig::new("relay.db")).await?;
//! let repo = MetadataRepository::new(Arc::new(db.kv_store()), invoker, "root")?;
//! let pending = repo.read_all().await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod invoker;
pub mod kv;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use invoker::UploadStoreInvoker;
pub use kv::{KvStore, MemoryKvStore, SqliteKvStore};
pub use pool::{Database, DbConfig};
pub use repository::metadata::MetadataRepository;
