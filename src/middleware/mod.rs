mod auth;

pub use auth::{clear_identity, identity_cookie, require_user, CurrentUser};

#[cfg(test)]
pub use auth::encode_identity;
