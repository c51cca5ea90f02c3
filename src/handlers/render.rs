// Minimal `{{key}}` templating over the files in templates/.
use axum::response::Html;
use std::fs;
use crate::errors::{AppError, AppResult};

const TEMPLATE_DIR: &str = "templates";

/// Fills `template` with `vars`, then wraps it in the shared layout.
pub fn render_page(title: &str, template: &str, vars: &[(&str, &str)]) -> AppResult<Html<String>> {
    let body = fill(&load(template)?, vars);
    let page = fill(&load("layout")?, &[("title", title), ("content", &body)]);
    Ok(Html(page))
}

fn load(name: &str) -> AppResult<String> {
    fs::read_to_string(format!("{}/{}.html", TEMPLATE_DIR, name)).map_err(|e| {
        tracing::error!("Failed to read template {}: {}", name, e);
        AppError::Template(e)
    })
}

/// Replaces each `{{key}}` of `template` in one pass. Inserted values are
/// never scanned for placeholders themselves.
fn fill(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else {
            rest = &rest[start..];
            break;
        };
        let key = &after[..end];
        match vars.iter().find(|(name, _)| *name == key) {
            Some((_, value)) => out.push_str(value),
            None => out.push_str(&rest[start..start + 2 + end + 2]),
        }
        rest = &after[end + 2..];
    }
    out.push_str(rest);
    out
}

pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Flash message box; `kind` is one of success, info or error.
pub fn flash(kind: &str, text: &str) -> String {
    format!(r#"<div class="message {}">{}</div>"#, kind, escape_html(text))
}
