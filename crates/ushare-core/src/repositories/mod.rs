//! Store and blob traits (ports)

pub mod membership_store;
pub mod blob_area;

pub use membership_store::{MembershipStore, StoreTx};
pub use blob_area::{BlobArea, BlobError};

#[cfg(test)]
pub use membership_store::{MockMembershipStore, MockStoreTx};
#[cfg(test)]
pub use blob_area::MockBlobArea;
