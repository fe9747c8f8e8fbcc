//! PostgreSQL store implementation

pub mod membership_store_impl;

pub use membership_store_impl::PgMembershipStore;
