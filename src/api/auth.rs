//! Auth endpoints. Login and register persist the returned session; logout
//! is best-effort against the server but always clears local state.

use super::{ApiClient, ApiError};
use crate::model::{AuthResponse, Credentials, RegisterRequest, User};
use crate::session::Session;

impl ApiClient {
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthResponse, ApiError> {
        let credentials = Credentials {
            email: email.to_string(),
            password: password.to_string(),
        };
        let response: AuthResponse = self.post("/auth/login", &credentials).await?;
        self.store_session(&response);
        Ok(response)
    }

    pub async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse, ApiError> {
        let response: AuthResponse = self.post("/auth/register", request).await?;
        self.store_session(&response);
        Ok(response)
    }

    /// Tells the server, then clears local state regardless of the outcome.
    pub async fn logout(&self) {
        if let Err(e) = self.post_empty("/auth/logout").await {
            log::debug!("server-side logout failed (ignored): {}", e);
        }
        self.session().clear();
    }

    pub async fn current_user(&self) -> Result<User, ApiError> {
        self.get("/auth/me").await
    }

    fn store_session(&self, response: &AuthResponse) {
        let session = Session {
            token: response.access_token.clone(),
            user: response.user.clone(),
        };
        if let Err(e) = self.session().set(session) {
            log::warn!("failed to persist session: {}", e);
        }
    }
}
