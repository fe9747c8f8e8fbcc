use std::sync::Arc;

use ushare_core::services::{AuthService, FileService, GroupService};
use ushare_security::JwtService;
use ushare_shared::config::AppConfig;

#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<AuthService>,
    pub groups: Arc<GroupService>,
    pub files: Arc<FileService>,
    pub jwt: Arc<JwtService>,
    pub config: Arc<AppConfig>,
}
