//! # UShare Core
//! 
//! Domain entities, store ports, the group/membership engine, and the reaper
//! that erases deactivated groups.

pub mod domain;
pub mod services;
pub mod repositories;
pub mod reaper;
pub mod error;

// Re-export domain entities
pub use domain::*;
pub use error::{DomainError, ErrorKind};
pub use reaper::{Reaper, ReapOutcome, ReapReport};
