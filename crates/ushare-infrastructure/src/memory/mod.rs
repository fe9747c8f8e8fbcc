//! In-process store, selected with a `memory://` database url

pub mod memory_store;

pub use memory_store::MemoryStore;
