//! Domain services (business logic)

mod access;
pub mod auth_service;
pub mod group_service;
pub mod file_service;

pub use auth_service::{AuthService, LoginResult};
pub use group_service::GroupService;
pub use file_service::{DownloadedFile, FileService};
