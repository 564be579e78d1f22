use vibe_core::{AppId, Did};

/// Verified owner identity for a request, with their resolved database name.
///
/// Attached by the identity middleware; present on every authenticated route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityContext {
    did: Did,
    user_db: String,
}

impl IdentityContext {
    pub fn new(did: Did, user_db: String) -> Self {
        Self { did, user_db }
    }

    pub fn did(&self) -> &Did {
        &self.did
    }

    pub fn user_db(&self) -> &str {
        &self.user_db
    }
}

/// Calling application for a request (data/blob routes only).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppContext {
    app_id: AppId,
}

impl AppContext {
    pub fn new(app_id: AppId) -> Self {
        Self { app_id }
    }

    pub fn app_id(&self) -> &AppId {
        &self.app_id
    }
}
