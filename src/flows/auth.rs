use super::FlowError;
use crate::api::ApiClient;
use crate::core::contact::{emblem_for, random_color};
use crate::core::user::Registration;
use crate::session::StorageScope;

/// Sign-up form fields.
#[derive(Debug, Clone, Default)]
pub struct SignUp {
    pub username: String,
    pub email: String,
    pub phone: String,
    pub password: String,
    pub confirm_password: String,
}

impl SignUp {
    pub fn validate(&self) -> Result<(), FlowError> {
        let required = [&self.username, &self.email, &self.password, &self.confirm_password];
        if required.iter().any(|f| f.trim().is_empty()) {
            return Err(FlowError::Invalid("Please fill in all required fields".to_string()));
        }
        if self.password != self.confirm_password {
            return Err(FlowError::Invalid("Passwords are not the same".to_string()));
        }
        Ok(())
    }

    fn to_registration(&self) -> Registration {
        Registration {
            username: self.username.clone(),
            email: self.email.clone(),
            phone: self.phone.clone(),
            password: self.password.clone(),
            confirm_password: self.confirm_password.clone(),
            emblem: emblem_for(&self.username),
            color: random_color(),
        }
    }
}

/// Logs in and stores the token, in the keyring when `remember` is set.
pub async fn login(
    api: &ApiClient,
    email: &str,
    password: &str,
    remember: bool,
) -> Result<(), FlowError> {
    let reply = api.login(email, password).await?;
    let token = reply
        .token
        .filter(|t| !t.is_empty())
        .ok_or_else(|| {
            FlowError::Invalid("Login succeeded but no token was returned".to_string())
        })?;

    let scope = StorageScope::for_login(remember);
    api.session().update(|s| s.store_login(token, scope));
    api.session().persist().await?;
    log::info!("Logged in as {} ({:?} scope)", email, scope);
    Ok(())
}

/// Starts a guest session. Guests never touch the persistent scope.
pub async fn guest_login(api: &ApiClient) -> Result<(), FlowError> {
    api.session().update(|s| s.session_token = None);
    let reply = api.guest_login().await?;
    let token = reply
        .token
        .filter(|t| !t.is_empty())
        .ok_or_else(|| FlowError::Invalid("Guest login returned no token".to_string()))?;

    api.session().update(|s| s.store_guest(token));
    api.session().persist().await?;
    log::info!("Guest session started");
    Ok(())
}

pub async fn register(api: &ApiClient, form: &SignUp) -> Result<(), FlowError> {
    form.validate()?;
    api.register(&form.to_registration()).await?;
    log::info!("Registered {}", form.email);
    Ok(())
}

/// Tells the server goodbye and clears both scopes. A failing server call is
/// logged; the local session is cleared regardless.
pub async fn logout(api: &ApiClient) -> Result<(), FlowError> {
    let result = if api.session().is_guest() {
        api.guest_logout().await
    } else {
        api.logout().await
    };
    if let Err(e) = result {
        log::warn!("Logout request failed: {}", e);
    }
    api.session().logout_locally().await?;
    log::info!("Logged out");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ApiError;
    use crate::api::testing::{Seen, base_url, serve};
    use crate::session::{Session, SessionState};
    use axum::Router;
    use axum::extract::{Json, State};
    use axum::http::{HeaderMap, StatusCode, Uri};
    use axum::routing::post;
    use serde_json::{Value, json};

    async fn auth_endpoint(
        State(seen): State<Seen>,
        uri: Uri,
        headers: HeaderMap,
        Json(body): Json<Value>,
    ) -> (StatusCode, Json<Value>) {
        let auth = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let path = uri.path().to_string();
        seen.lock()
            .unwrap()
            .push(("POST".to_string(), path.clone(), auth, body.to_string()));
        match path.as_str() {
            "/api/auth/login/" if body["password"] == "right" => {
                (StatusCode::OK, Json(json!({"token": "user-token"})))
            }
            "/api/auth/login/" => (
                StatusCode::BAD_REQUEST,
                Json(json!({"non_field_errors": ["Unable to log in with provided credentials."]})),
            ),
            "/api/auth/guest-login/" => (StatusCode::OK, Json(json!({"token": "guest-token"}))),
            "/api/auth/registration/" => (StatusCode::CREATED, Json(json!({"id": 5}))),
            "/api/auth/logout/" => (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({}))),
            _ => (StatusCode::OK, Json(json!({}))),
        }
    }

    async fn setup(state: SessionState) -> (ApiClient, Seen) {
        let seen: Seen = Default::default();
        let router = Router::new()
            .route("/api/auth/{path}/", post(auth_endpoint))
            .with_state(seen.clone());
        let addr = serve(router).await;
        let api = ApiClient::new(&base_url(addr), Session::in_memory(state)).unwrap();
        (api, seen)
    }

    #[tokio::test]
    async fn remembered_login_uses_persistent_scope() {
        let (api, seen) = setup(SessionState::default()).await;
        login(&api, "me@example.com", "right", true).await.unwrap();
        let state = api.session().snapshot();
        assert_eq!(state.persistent_token.as_deref(), Some("user-token"));
        assert_eq!(state.session_token, None);
        assert_eq!(seen.lock().unwrap()[0].2, None);
    }

    #[tokio::test]
    async fn plain_login_uses_session_scope() {
        let (api, _seen) = setup(SessionState::default()).await;
        login(&api, "me@example.com", "right", false).await.unwrap();
        assert_eq!(api.session().snapshot().session_token.as_deref(), Some("user-token"));
    }

    #[tokio::test]
    async fn bad_credentials_surface_non_field_error() {
        let (api, _seen) = setup(SessionState::default()).await;
        let err = login(&api, "me@example.com", "wrong", false).await.unwrap_err();
        assert_eq!(
            err.user_messages(crate::api::ErrorContext::User),
            vec!["*Unable to log in with provided credentials."]
        );
        assert!(matches!(api.session().token(), Err(ApiError::Unauthenticated)));
    }

    #[tokio::test]
    async fn guest_login_replaces_tokens() {
        let (api, _seen) = setup(SessionState {
            session_token: Some("old".to_string()),
            persistent_token: Some("remembered".to_string()),
            guest: false,
        })
        .await;
        guest_login(&api).await.unwrap();
        let state = api.session().snapshot();
        assert!(state.guest);
        assert_eq!(state.session_token.as_deref(), Some("guest-token"));
        assert_eq!(state.persistent_token, None);
    }

    #[tokio::test]
    async fn mismatched_passwords_never_reach_the_server() {
        let (api, seen) = setup(SessionState::default()).await;
        let form = SignUp {
            username: "Ann Lee".to_string(),
            email: "ann@example.com".to_string(),
            phone: String::new(),
            password: "a".to_string(),
            confirm_password: "b".to_string(),
        };
        assert!(matches!(register(&api, &form).await, Err(FlowError::Invalid(_))));
        assert!(seen.lock().unwrap().is_empty());

        let form = SignUp {
            confirm_password: "a".to_string(),
            ..form
        };
        register(&api, &form).await.unwrap();
        let body: Value = serde_json::from_str(&seen.lock().unwrap()[0].3).unwrap();
        assert_eq!(body["emblem"], "AL");
        assert_eq!(body["color"].as_str().unwrap().len(), 7);
    }

    #[tokio::test]
    async fn logout_clears_even_when_server_fails() {
        let (api, seen) = setup(SessionState {
            persistent_token: Some("t".to_string()),
            ..SessionState::default()
        })
        .await;
        logout(&api).await.unwrap();
        assert_eq!(api.session().snapshot(), SessionState::default());
        let seen = seen.lock().unwrap();
        assert_eq!(seen[0].1, "/api/auth/logout/");
        assert_eq!(seen[0].2.as_deref(), Some("Token t"));
    }

    #[tokio::test]
    async fn guest_logout_uses_guest_endpoint() {
        let (api, seen) = setup(SessionState {
            session_token: Some("g".to_string()),
            guest: true,
            ..SessionState::default()
        })
        .await;
        logout(&api).await.unwrap();
        assert_eq!(seen.lock().unwrap()[0].1, "/api/auth/guest-logout/");
        assert!(!api.session().is_guest());
    }
}
