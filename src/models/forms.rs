use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    pub username: String,
}

#[derive(Debug, Deserialize)]
pub struct FlagForm {
    pub flag: String,
}

#[derive(Debug, Deserialize, Default)]
pub struct ErrorQuery {
    pub error: Option<String>,
}

// Challenge forms keep every field optional so that a missing field reaches
// the vulnerable code as an empty string instead of a 422.

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct SearchForm {
    #[serde(default)]
    pub search: String,
}

#[derive(Debug, Deserialize)]
pub struct CommentForm {
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub text: String,
}
