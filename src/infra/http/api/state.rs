use std::sync::Arc;

use crate::application::auth::AuthService;
use crate::application::images::ImageStore;
use crate::application::posts::ContentRepository;
use crate::application::repos::StoreHealth;

/// Cookie and bootstrap-key settings for the auth routes.
#[derive(Clone, Debug, Default)]
pub struct SessionSettings {
    pub cookie_secure: bool,
    /// Key expected in `X-API-Key` by the admin bootstrap route. When unset
    /// that route refuses every request.
    pub admin_api_key: Option<Arc<str>>,
}

#[derive(Clone)]
pub struct ApiState {
    pub content: Arc<ContentRepository>,
    pub auth: Arc<AuthService>,
    pub images: Arc<dyn ImageStore>,
    pub health: Arc<dyn StoreHealth>,
    pub session: SessionSettings,
    pub max_upload_bytes: usize,
}
