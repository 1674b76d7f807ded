use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderValue},
    response::Response,
};
use rand::{distributions::Alphanumeric, Rng};
use serde::Serialize;
use uuid::Uuid;

pub const SESSION_COOKIE: &str = "cacao_session";
const SESSION_TOKEN_LEN: usize = 32;

/// Authenticated user forwarded by the upstream auth layer as trusted
/// headers (`x-user-id`, `x-user-email`). Authentication itself is not this
/// service's concern.
#[derive(Debug, Clone, Serialize)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
}

/// The canonical owner of a cart: an authenticated user or an anonymous
/// browser session. Exactly one of the two.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartOwner {
    User(Uuid),
    Session(String),
}

impl CartOwner {
    /// Key used for the per-owner mutex registry.
    pub fn lock_key(&self) -> String {
        match self {
            CartOwner::User(id) => format!("user:{}", id),
            CartOwner::Session(token) => format!("session:{}", token),
        }
    }
}

/// Per-request identity, resolved before any cart lookup.
///
/// When neither a user nor a session cookie is present, a fresh session
/// token is minted here so that one request only ever creates one session.
/// Handlers attach the cookie to the response via [`apply_session_cookie`]
/// when `minted` is set.
#[derive(Debug, Clone)]
pub struct RequestIdentity {
    pub user: Option<AuthUser>,
    pub session_token: String,
    pub minted: bool,
}

impl RequestIdentity {
    pub fn owner(&self) -> CartOwner {
        match &self.user {
            Some(user) => CartOwner::User(user.id),
            None => CartOwner::Session(self.session_token.clone()),
        }
    }

    pub fn user_email(&self) -> Option<&str> {
        self.user.as_ref().map(|u| u.email.as_str())
    }

    pub fn is_guest(&self) -> bool {
        self.user.is_none()
    }
}

pub fn mint_session_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SESSION_TOKEN_LEN)
        .map(char::from)
        .collect()
}

fn session_token_from_cookies(parts: &Parts) -> Option<String> {
    let cookies = parts.headers.get(header::COOKIE)?.to_str().ok()?;
    cookies.split(';').find_map(|pair| {
        let mut it = pair.trim().splitn(2, '=');
        match (it.next(), it.next()) {
            (Some(name), Some(value)) if name == SESSION_COOKIE && !value.is_empty() => {
                Some(value.to_string())
            }
            _ => None,
        }
    })
}

fn auth_user_from_headers(parts: &Parts) -> Option<AuthUser> {
    let id = parts
        .headers
        .get("x-user-id")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| Uuid::parse_str(v).ok())?;
    let email = parts
        .headers
        .get("x-user-email")
        .and_then(|v| v.to_str().ok())?
        .to_string();
    Some(AuthUser { id, email })
}

#[async_trait]
impl<S> FromRequestParts<S> for RequestIdentity
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = auth_user_from_headers(parts);

        let (session_token, minted) = match session_token_from_cookies(parts) {
            Some(token) => (token, false),
            None => (mint_session_token(), true),
        };

        Ok(RequestIdentity {
            user,
            session_token,
            minted,
        })
    }
}

/// Attach the session cookie to a response when this request minted a new
/// session token.
pub fn apply_session_cookie(identity: &RequestIdentity, mut response: Response) -> Response {
    if identity.minted {
        let cookie = format!(
            "{}={}; Path=/; HttpOnly; SameSite=Lax",
            SESSION_COOKIE, identity.session_token
        );
        if let Ok(value) = HeaderValue::from_str(&cookie) {
            response.headers_mut().append(header::SET_COOKIE, value);
        }
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts_for(req: Request<()>) -> Parts {
        req.into_parts().0
    }

    #[tokio::test]
    async fn resolves_user_over_session() {
        let user_id = Uuid::new_v4();
        let req = Request::builder()
            .header("x-user-id", user_id.to_string())
            .header("x-user-email", "customer@example.com")
            .header(header::COOKIE, format!("{}=tok123", SESSION_COOKIE))
            .body(())
            .unwrap();

        let mut parts = parts_for(req);
        let identity = RequestIdentity::from_request_parts(&mut parts, &())
            .await
            .unwrap();

        assert_eq!(identity.owner(), CartOwner::User(user_id));
        assert_eq!(identity.user_email(), Some("customer@example.com"));
        assert!(!identity.minted);
    }

    #[tokio::test]
    async fn resolves_session_cookie() {
        let req = Request::builder()
            .header(header::COOKIE, format!("theme=dark; {}=tok456", SESSION_COOKIE))
            .body(())
            .unwrap();

        let mut parts = parts_for(req);
        let identity = RequestIdentity::from_request_parts(&mut parts, &())
            .await
            .unwrap();

        assert_eq!(identity.owner(), CartOwner::Session("tok456".to_string()));
        assert!(identity.is_guest());
        assert!(!identity.minted);
    }

    #[tokio::test]
    async fn mints_session_when_absent() {
        let req = Request::builder().body(()).unwrap();
        let mut parts = parts_for(req);
        let identity = RequestIdentity::from_request_parts(&mut parts, &())
            .await
            .unwrap();

        assert!(identity.minted);
        assert_eq!(identity.session_token.len(), SESSION_TOKEN_LEN);
        assert!(matches!(identity.owner(), CartOwner::Session(_)));
    }

    #[test]
    fn lock_keys_do_not_collide_across_kinds() {
        let user = CartOwner::User(Uuid::nil());
        let session = CartOwner::Session(Uuid::nil().to_string());
        assert_ne!(user.lock_key(), session.lock_key());
    }
}
