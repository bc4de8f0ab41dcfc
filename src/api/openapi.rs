use super::handlers::{csrf, forum_api, health};
use utoipa::{
    openapi::{Contact, License},
    OpenApi,
};

/// JSON API surface. Page loaders are not documented here.
#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        csrf::init,
        csrf::refresh,
        forum_api::me,
        forum_api::create_topic,
    ),
    components(schemas(
        health::Health,
        super::handlers::types::CsrfTokenResponse,
        crate::gate::RequestIdentity,
        crate::services::ForumTopic,
        crate::services::NewTopic,
    )),
    tags(
        (name = "health", description = "Service health"),
        (name = "csrf", description = "CSRF token issuance and rotation"),
        (name = "forum", description = "Authenticated forum API"),
    )
)]
pub struct ApiDoc;

#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    let mut doc = ApiDoc::openapi();
    doc.info.title = env!("CARGO_PKG_NAME").to_string();
    doc.info.version = env!("CARGO_PKG_VERSION").to_string();
    doc.info.description = optional_str(env!("CARGO_PKG_DESCRIPTION")).map(str::to_string);
    doc.info.contact = cargo_contact();
    doc.info.license = optional_str(env!("CARGO_PKG_LICENSE")).map(License::new);
    doc
}

fn cargo_contact() -> Option<Contact> {
    // Cargo authors are `;` separated and may include "Name <email>".
    let primary = env!("CARGO_PKG_AUTHORS").split(';').next().map(str::trim)?;
    let (name, email) = parse_author(primary);
    if name.is_none() && email.is_none() {
        return None;
    }

    let mut contact = Contact::new();
    contact.name = name.map(str::to_string);
    contact.email = email.map(str::to_string);
    Some(contact)
}

fn parse_author(author: &str) -> (Option<&str>, Option<&str>) {
    match author.split_once('<') {
        Some((name, rest)) => (
            optional_str(name.trim()),
            rest.strip_suffix('>').and_then(|email| optional_str(email.trim())),
        ),
        None => (optional_str(author), None),
    }
}

fn optional_str(value: &str) -> Option<&str> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn documents_json_api() {
        let doc = openapi();
        assert_eq!(doc.info.title, env!("CARGO_PKG_NAME"));
        for path in ["/health", "/api/csrf/init", "/api/csrf/refresh", "/api/me", "/api/forum/topics"] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }

    #[test]
    fn parse_author_splits_email() {
        assert_eq!(
            parse_author("Team LearnFlow <team@learnflow.com>"),
            (Some("Team LearnFlow"), Some("team@learnflow.com"))
        );
        assert_eq!(parse_author("Solo"), (Some("Solo"), None));
    }
}
