//! # Aquaops Database Crate
//!
//! This crate is the Entity Store: the read side of the farm's relational data
//! as seen by the KPI layer.
//!
//! ## Architectural Principles
//!
//! - **Layer 2 Adapter:** Encapsulates all database-specific logic behind the
//!   `EntityStore` trait. Callers hold an `Arc<dyn EntityStore>` handle.
//! - **Typed Filters:** Queries are scoped with `QueryFilter`s built from the
//!   `Filter` enum, never with ad hoc `WHERE` strings.
//! - **Asynchronous & Pooled:** The PostgreSQL implementation uses a `PgPool`.
//!
//! ## Public API
//!
//! - `connect` / `run_migrations`: Pool setup and schema migrations.
//! - `EntityStore`, `Measure`: The store contract and its aggregatable columns.
//! - `DbRepository`: The PostgreSQL implementation.
//! - `MemoryStore`: The in-process implementation.
//! - `Entity`, `Field`, `Filter`, `QueryFilter`: The query filter vocabulary.
//! - `DbError`: The specific error types that can be returned from this crate.

// Declare the modules that constitute this crate.
pub mod connection;
pub mod error;
pub mod filter;
pub mod memory;
pub mod repository;
pub mod store;

// Re-export the key components to create a clean, public-facing API.
pub use connection::{connect, run_migrations};
pub use error::DbError;
pub use filter::{Entity, Field, Filter, QueryFilter};
pub use memory::{MemoryStore, Row};
pub use repository::DbRepository;
pub use store::{EntityStore, Measure};
