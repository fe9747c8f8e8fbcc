//! # UShare Infrastructure
//! 
//! Store and blob area implementations (adapters).

pub mod database;
pub mod memory;
pub mod storage;

pub use database::{create_pool, run_migrations, PgMembershipStore};
pub use memory::MemoryStore;
pub use storage::FsBlobArea;
