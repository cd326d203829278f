//! JSON client for the board backend.
//!
//! Every call goes to `{base_url}/{path}/`, sends a JSON content type and,
//! unless the call is anonymous, a `Token` authorization header. Failures are
//! decoded once here into [`ApiError`].

pub mod endpoints;
pub mod error;

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Client, Method};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::session::Session;

pub use error::{ApiError, ErrorContext, FieldErrors};

/// Whether a request carries the session token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Auth {
    Token,
    Anonymous,
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
    http: Client,
    session: Session,
}

impl ApiClient {
    pub fn new(base_url: &str, session: Session) -> Result<Self, ApiError> {
        let http = Client::builder().build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
            session,
        })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn url(&self, path: &str) -> String {
        let path = path.trim_matches('/');
        if path.is_empty() {
            format!("{}/", self.base_url)
        } else {
            format!("{}/{}/", self.base_url, path)
        }
    }

    /// Headers for one request. Fails with [`ApiError::Unauthenticated`] when
    /// a token is required and none is stored; redirecting is up to the caller.
    pub fn headers(&self, auth: Auth) -> Result<HeaderMap, ApiError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if auth == Auth::Token {
            let token = self.session.token()?;
            let value = HeaderValue::from_str(&format!("Token {}", token))
                .map_err(|_| ApiError::Unauthenticated)?;
            headers.insert(AUTHORIZATION, value);
        }
        Ok(headers)
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        auth: Auth,
    ) -> Result<Value, ApiError> {
        let url = self.url(path);
        let mut req = self
            .http
            .request(method.clone(), &url)
            .headers(self.headers(auth)?);
        if let Some(body) = body {
            req = req.body(serde_json::to_vec(&body)?);
        }

        log::debug!("{} {}", method, url);
        let resp = req.send().await.inspect_err(|e| {
            log::warn!("{} {} failed: {}", method, url, e);
        })?;

        let status = resp.status();
        let text = resp.text().await?;

        if !status.is_success() {
            let payload = serde_json::from_str::<Value>(&text)
                .unwrap_or_else(|_| Value::Object(Default::default()));
            log::warn!("{} {} returned {}: {}", method, url, status, payload);
            return Err(ApiError::from_response(status, &payload));
        }

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&text)?)
    }

    /// `GET` and decode.
    pub async fn load<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let value = self.send(Method::GET, path, None, Auth::Token).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// `POST` a JSON body and decode the reply.
    pub async fn create<B, T>(&self, path: &str, body: &B, auth: Auth) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let value = self
            .send(Method::POST, path, Some(serde_json::to_value(body)?), auth)
            .await?;
        Ok(serde_json::from_value(value)?)
    }

    /// `PUT` a full replacement.
    pub async fn replace<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let value = self
            .send(Method::PUT, path, Some(serde_json::to_value(body)?), Auth::Token)
            .await?;
        Ok(serde_json::from_value(value)?)
    }

    /// `PATCH` selected fields.
    pub async fn partial_update<B>(&self, path: &str, body: &B) -> Result<Value, ApiError>
    where
        B: Serialize + ?Sized,
    {
        self.send(Method::PATCH, path, Some(serde_json::to_value(body)?), Auth::Token)
            .await
    }

    /// `DELETE`. A `204 No Content` resolves to `Value::Null`.
    pub async fn remove(&self, path: &str) -> Result<Value, ApiError> {
        self.send(Method::DELETE, path, None, Auth::Token).await
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-process backend for exercising the client over real HTTP.

    use std::net::SocketAddr;
    use std::sync::{Arc, Mutex};

    use axum::Router;
    use tokio::net::TcpListener;

    /// Requests seen by the test server: `(method, path, authorization, body)`.
    pub type Seen = Arc<Mutex<Vec<(String, String, Option<String>, String)>>>;

    pub async fn serve(router: Router) -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        addr
    }

    pub fn base_url(addr: SocketAddr) -> String {
        format!("http://{}/api/auth/", addr)
    }
}

#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use crate::session::SessionState;
    use axum::Json;
    use axum::Router;
    use axum::body::Bytes;
    use axum::extract::State;
    use axum::http::{HeaderMap as AxumHeaders, StatusCode, Uri};
    use axum::routing::{any, get};
    use serde_json::json;

    fn client(base: &str, token: Option<&str>) -> ApiClient {
        let session = Session::in_memory(SessionState {
            session_token: token.map(str::to_string),
            ..SessionState::default()
        });
        ApiClient::new(base, session).unwrap()
    }

    async fn record(
        State(seen): State<Seen>,
        method: axum::http::Method,
        uri: Uri,
        headers: AxumHeaders,
        body: Bytes,
    ) -> Json<serde_json::Value> {
        let auth = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let content_type = headers
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        seen.lock().unwrap().push((
            method.to_string(),
            uri.path().to_string(),
            auth,
            String::from_utf8_lossy(&body).to_string(),
        ));
        Json(json!({"ok": true, "content_type": content_type}))
    }

    #[test]
    fn url_joins_with_single_slashes() {
        let c = client("http://host/api/auth/", None);
        assert_eq!(c.url("tasks"), "http://host/api/auth/tasks/");
        assert_eq!(c.url("/tasks/3/"), "http://host/api/auth/tasks/3/");
        assert_eq!(c.url(""), "http://host/api/auth/");
    }

    #[test]
    fn missing_token_fails_header_building() {
        let c = client("http://host", None);
        assert!(matches!(c.headers(Auth::Token), Err(ApiError::Unauthenticated)));
        let anon = c.headers(Auth::Anonymous).unwrap();
        assert_eq!(anon.get(CONTENT_TYPE).unwrap(), "application/json");
        assert!(anon.get(AUTHORIZATION).is_none());
    }

    #[tokio::test]
    async fn sends_token_and_json_body() {
        let seen: Seen = Default::default();
        let router = Router::new()
            .route("/api/auth/{*rest}", any(record))
            .with_state(seen.clone());
        let addr = serve(router).await;
        let c = client(&base_url(addr), Some("abc123"));

        let reply: serde_json::Value = c
            .create("contacts", &json!({"name": "Ann"}), Auth::Token)
            .await
            .unwrap();
        assert_eq!(reply["content_type"], "application/json");

        c.partial_update("tasks/4", &json!({"status": "done"})).await.unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen[0].0, "POST");
        assert_eq!(seen[0].1, "/api/auth/contacts/");
        assert_eq!(seen[0].2.as_deref(), Some("Token abc123"));
        assert_eq!(seen[0].3, r#"{"name":"Ann"}"#);
        assert_eq!(seen[1].0, "PATCH");
        assert_eq!(seen[1].1, "/api/auth/tasks/4/");
    }

    #[tokio::test]
    async fn anonymous_call_has_no_authorization() {
        let seen: Seen = Default::default();
        let router = Router::new()
            .route("/api/auth/{*rest}", any(record))
            .with_state(seen.clone());
        let addr = serve(router).await;
        let c = client(&base_url(addr), None);

        let _: serde_json::Value = c.create("guest-login", &json!({}), Auth::Anonymous).await.unwrap();
        assert_eq!(seen.lock().unwrap()[0].2, None);
    }

    #[tokio::test]
    async fn no_token_means_no_request() {
        let seen: Seen = Default::default();
        let router = Router::new()
            .route("/api/auth/{*rest}", any(record))
            .with_state(seen.clone());
        let addr = serve(router).await;
        let c = client(&base_url(addr), None);

        let err = c.load::<serde_json::Value>("tasks").await.unwrap_err();
        assert!(matches!(err, ApiError::Unauthenticated));
        assert!(seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn error_bodies_are_decoded() {
        let router = Router::new()
            .route(
                "/api/auth/contacts/",
                get(|| async {
                    (
                        StatusCode::BAD_REQUEST,
                        Json(json!({"email": ["Enter a valid email address."]})),
                    )
                }),
            )
            .route(
                "/api/auth/broken/",
                get(|| async { (StatusCode::BAD_GATEWAY, "<html>upstream</html>") }),
            );
        let addr = serve(router).await;
        let c = client(&base_url(addr), Some("t"));

        match c.load::<serde_json::Value>("contacts").await.unwrap_err() {
            ApiError::Validation(fields) => {
                assert_eq!(fields.first("email"), Some("Enter a valid email address."))
            }
            other => panic!("unexpected {:?}", other),
        }

        match c.load::<serde_json::Value>("broken").await.unwrap_err() {
            ApiError::Status { status, fields } => {
                assert_eq!(status, StatusCode::BAD_GATEWAY);
                assert!(fields.is_empty());
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn no_content_delete_resolves_to_null() {
        let router = Router::new().route(
            "/api/auth/tasks/{id}/",
            axum::routing::delete(|| async { StatusCode::NO_CONTENT }),
        );
        let addr = serve(router).await;
        let c = client(&base_url(addr), Some("t"));
        assert_eq!(c.remove("tasks/9").await.unwrap(), serde_json::Value::Null);
    }

    #[tokio::test]
    async fn unreachable_server_is_network_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let c = client(&base_url(addr), Some("t"));
        let err = c.load::<serde_json::Value>("tasks").await.unwrap_err();
        assert!(matches!(err, ApiError::Network(_)));
        assert_eq!(err.user_messages(ErrorContext::General), vec![error::FALLBACK_MESSAGE]);
    }
}
