use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{HeaderValue, AUTHORIZATION};
use reqwest::{Client, ClientBuilder, Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use url::Url;

use super::ApiError;
use crate::session::SessionState;
use crate::ClientConfig;

/// Thin typed wrapper around `reqwest::Client` for the Fetchbot API.
///
/// Owns the base URL and timeout, attaches the bearer token from the shared
/// `SessionState` to every request, and maps response status codes onto the
/// `ApiError` taxonomy. A 401 from any endpoint clears the session before the
/// error is returned.
pub struct ApiClient {
    inner: Client,
    base_url: Url,
    session: Arc<SessionState>,
}

impl ApiClient {
    pub fn new(config: &ClientConfig, session: Arc<SessionState>) -> anyhow::Result<Self> {
        // A trailing slash makes Url::join treat the base path as a directory.
        let mut base = config.base_url.clone();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url = Url::parse(&base)?;

        let inner = ClientBuilder::new()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            inner,
            base_url,
            session,
        })
    }

    pub fn session(&self) -> &Arc<SessionState> {
        &self.session
    }

    pub(crate) async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.request::<(), T>(Method::GET, path, None, &[]).await
    }

    pub(crate) async fn get_with_query<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(String, String)],
    ) -> Result<T, ApiError> {
        self.request::<(), T>(Method::GET, path, None, query).await
    }

    pub(crate) async fn post<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        self.request(Method::POST, path, Some(body), &[]).await
    }

    /// POST with no body and no interesting response payload.
    pub(crate) async fn post_empty(&self, path: &str) -> Result<(), ApiError> {
        let response = self.send::<()>(Method::POST, path, None, &[]).await?;
        self.check(response).await.map(|_| ())
    }

    pub(crate) async fn patch<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        self.request(Method::PATCH, path, Some(body), &[]).await
    }

    pub(crate) async fn delete(&self, path: &str) -> Result<(), ApiError> {
        let response = self.send::<()>(Method::DELETE, path, None, &[]).await?;
        self.check(response).await.map(|_| ())
    }

    /// GET returning the raw body, for endpoints serving rendered documents.
    pub(crate) async fn get_bytes(&self, path: &str) -> Result<Vec<u8>, ApiError> {
        let response = self.send::<()>(Method::GET, path, None, &[]).await?;
        let response = self.check(response).await?;
        Ok(response.bytes().await?.to_vec())
    }

    async fn request<B: Serialize, T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        query: &[(String, String)],
    ) -> Result<T, ApiError> {
        let response = self.send(method, path, body, query).await?;
        let response = self.check(response).await?;
        // Decode failures must be distinguishable from transport failures,
        // so the body is read whole and parsed explicitly.
        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn send<B: Serialize>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        query: &[(String, String)],
    ) -> Result<Response, ApiError> {
        let url = self
            .base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| ApiError::Validation(format!("bad request path '{}': {}", path, e)))?;

        let mut builder = self.inner.request(method, url);

        if !query.is_empty() {
            builder = builder.query(query);
        }

        if let Some(token) = self.session.token() {
            if let Ok(value) = HeaderValue::from_str(&format!("Bearer {}", token)) {
                builder = builder.header(AUTHORIZATION, value);
            }
        }

        if let Some(body) = body {
            builder = builder.json(body);
        }

        Ok(builder.send().await?)
    }

    /// Maps non-success statuses onto the error taxonomy. Consumes the body
    /// of failed responses to extract a server-provided message.
    async fn check(&self, response: Response) -> Result<Response, ApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        if status == StatusCode::UNAUTHORIZED {
            self.session.clear();
            return Err(ApiError::Unauthorized);
        }

        if status == StatusCode::NOT_FOUND {
            return Err(ApiError::NotFound);
        }

        let message = extract_message(response).await;

        if status == StatusCode::BAD_REQUEST || status == StatusCode::UNPROCESSABLE_ENTITY {
            return Err(ApiError::Validation(message));
        }

        Err(ApiError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

/// Pulls a human-readable message out of an error body. The backend uses
/// `{"message": ...}` for most errors and `{"detail": ...}` for validation.
async fn extract_message(response: Response) -> String {
    let text = response.text().await.unwrap_or_default();
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(&text) {
        for key in ["message", "detail", "error"] {
            if let Some(message) = value.get(key).and_then(|m| m.as_str()) {
                return message.to_string();
            }
        }
    }
    if text.is_empty() {
        "no error detail provided".to_string()
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    use crate::model::User;
    use crate::session::Session;

    /// Serves exactly one connection with a canned HTTP response.
    async fn serve_once(response: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            if let Ok((mut stream, _)) = listener.accept().await {
                let mut buf = [0u8; 2048];
                let _ = stream.read(&mut buf).await;
                let _ = stream.write_all(response.as_bytes()).await;
                let _ = stream.shutdown().await;
            }
        });
        format!("http://{}", addr)
    }

    fn logged_in_session(dir: &tempfile::TempDir) -> Arc<SessionState> {
        let state = SessionState::load(dir.path().join("session.json"));
        state
            .set(Session {
                token: "tok-1".to_string(),
                user: User {
                    id: 1,
                    email: "alice@example.com".to_string(),
                    organization_id: None,
                },
            })
            .unwrap();
        Arc::new(state)
    }

    fn client_for(base_url: String, session: Arc<SessionState>) -> ApiClient {
        let config = ClientConfig {
            base_url,
            ..Default::default()
        };
        ApiClient::new(&config, session).unwrap()
    }

    #[tokio::test]
    async fn test_401_clears_session_in_memory_and_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let session = logged_in_session(&dir);
        assert!(dir.path().join("session.json").exists());

        let base = serve_once(
            "HTTP/1.1 401 Unauthorized\r\ncontent-length: 0\r\nconnection: close\r\n\r\n",
        )
        .await;
        let client = client_for(base, Arc::clone(&session));

        let result = client.list_scans().await;
        assert!(matches!(result, Err(ApiError::Unauthorized)));
        assert!(!session.is_authenticated());
        assert!(!dir.path().join("session.json").exists());
    }

    #[tokio::test]
    async fn test_malformed_body_is_a_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let session = logged_in_session(&dir);

        let base = serve_once(
            "HTTP/1.1 200 OK\r\ncontent-length: 8\r\nconnection: close\r\n\r\nnot json",
        )
        .await;
        let client = client_for(base, Arc::clone(&session));

        let result = client.list_scans().await;
        assert!(matches!(result, Err(ApiError::Decode(_))));
        // Decode failures are not auth failures; the session survives.
        assert!(session.is_authenticated());
    }
}
