//! # UShare Core - Domain Module
//! 
//! Domain entities for the file-sharing service.

pub mod user;
pub mod group;
pub mod membership;
pub mod file_info;

// Re-export all entities and id aliases
pub use user::{User, UserId};
pub use group::{Group, GroupId, GroupState};
pub use membership::Membership;
pub use file_info::{FileId, FileInfo};
