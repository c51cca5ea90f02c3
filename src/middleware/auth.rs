use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use time::Duration;
use crate::models::UserRecord;
use crate::state::AppState;

/// Cookie carrying the player's identity: base64 of the nickname, unsigned
/// and readable from scripts.
pub const IDENTITY_COOKIE: &str = "ctf_username";

/// Player resolved by `require_user`, with progress as of this request.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub UserRecord);

pub fn encode_identity(username: &str) -> String {
    STANDARD.encode(username)
}

pub fn decode_identity(token: &str) -> Option<String> {
    let bytes = STANDARD.decode(token).ok()?;
    String::from_utf8(bytes).ok()
}

pub fn identity_cookie(username: &str, max_age_days: i64) -> Cookie<'static> {
    Cookie::build((IDENTITY_COOKIE, encode_identity(username)))
        .path("/")
        .max_age(Duration::days(max_age_days))
        .build()
}

pub fn clear_identity(jar: CookieJar) -> CookieJar {
    jar.remove(Cookie::build(IDENTITY_COOKIE).path("/"))
}

fn is_public(path: &str) -> bool {
    path == "/register" || path == "/robots.txt" || path.starts_with("/static/")
}

/// Resolves the identity cookie to a stored player and attaches it to the
/// request. Anything unresolvable is sent back to registration with the
/// cookie cleared.
pub async fn require_user(
    State(state): State<AppState>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Response {
    if is_public(req.uri().path()) {
        return next.run(req).await;
    }

    let Some(token) = jar.get(IDENTITY_COOKIE).map(|c| c.value().to_string()) else {
        return Redirect::to("/register").into_response();
    };

    let Some(username) = decode_identity(&token) else {
        tracing::warn!("Invalid identity cookie (base64 decoding failed): {:?}", token);
        return (clear_identity(jar), Redirect::to("/register")).into_response();
    };

    let Some(record) = state.store.find_by_username(&username).await else {
        tracing::warn!("Identity cookie names unknown player {:?}", username);
        return (clear_identity(jar), Redirect::to("/register")).into_response();
    };

    tracing::debug!("Request from {} ({} points)", username, record.total_points());
    req.extensions_mut().insert(CurrentUser(record));
    next.run(req).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_token_is_plain_base64() {
        assert_eq!(encode_identity("alice"), "YWxpY2U=");
        assert_eq!(decode_identity("YWxpY2U=").as_deref(), Some("alice"));
        // Anyone can mint a token for anyone
        assert_eq!(decode_identity(&encode_identity("admin")).as_deref(), Some("admin"));
    }

    #[test]
    fn test_garbled_tokens_do_not_decode() {
        assert_eq!(decode_identity("%%%"), None);
        assert_eq!(decode_identity("gA=="), None); // 0x80 is not UTF-8
    }

    #[test]
    fn test_identity_cookie_attributes() {
        let cookie = identity_cookie("alicia", 7);
        assert_eq!(cookie.name(), IDENTITY_COOKIE);
        assert_eq!(cookie.value(), "YWxpY2lh");
        assert_eq!(cookie.path(), Some("/"));
        assert_ne!(cookie.http_only(), Some(true));
        assert_ne!(cookie.secure(), Some(true));
        let rendered = cookie.to_string();
        assert!(rendered.contains("Max-Age=604800"), "{}", rendered);
        assert_eq!(cookie.max_age(), Some(Duration::days(7)));

        let short = identity_cookie("alicia", 1);
        assert_eq!(short.max_age(), Some(Duration::seconds(86_400)));
    }

    #[test]
    fn test_public_paths() {
        assert!(is_public("/register"));
        assert!(is_public("/static/css/style.css"));
        assert!(is_public("/robots.txt"));
        assert!(!is_public("/"));
        assert!(!is_public("/challenge1"));
    }
}
