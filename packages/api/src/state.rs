use std::sync::Arc;

use arbiter::app::Services;
use arbiter::services::{
    AdminService, MatchmakingService, RefereeService, ResumeService, TokenService,
};

#[derive(Clone)]
pub struct AppState {
    pub token_service: Arc<TokenService>,
    pub matchmaking_service: Arc<MatchmakingService>,
    pub referee_service: Arc<RefereeService>,
    pub resume_service: Arc<ResumeService>,
    pub admin_service: Arc<AdminService>,
}

impl From<Services> for AppState {
    fn from(services: Services) -> Self {
        AppState {
            token_service: Arc::new(services.tokens),
            matchmaking_service: Arc::new(services.matchmaking),
            referee_service: Arc::new(services.referee),
            resume_service: Arc::new(services.resume),
            admin_service: Arc::new(services.admin),
        }
    }
}
