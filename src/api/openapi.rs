use super::handlers::{
    auth::{login, otp, password, register},
    health,
    user::{contact, profile},
};
use utoipa::openapi::{
    security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Components, Contact, InfoBuilder, License, OpenApiBuilder, Tag,
};
use utoipa_axum::{router::OpenApiRouter, routes};

#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    // Reuse the same router wiring and only return the generated OpenAPI document.
    let (_router, openapi) = api_router().split_for_parts();
    openapi
}

/// Build the router that also drives the `OpenAPI` document.
///
/// Add new endpoints here via `.routes(routes!(...))` so they are both served
/// and included in the generated `OpenAPI` document.
pub(crate) fn api_router() -> OpenApiRouter {
    let mut router = OpenApiRouter::with_openapi(cargo_openapi())
        .routes(routes!(health::health))
        .routes(routes!(otp::send_otp))
        .routes(routes!(otp::verify_otp))
        .routes(routes!(register::register))
        .routes(routes!(register::register_simple))
        .routes(routes!(login::login))
        .routes(routes!(login::logout))
        .routes(routes!(password::reset_password))
        .routes(routes!(profile::get_profile, profile::update_profile))
        .routes(routes!(profile::change_password))
        .routes(routes!(contact::request_update_email))
        .routes(routes!(contact::request_update_phone))
        .routes(routes!(contact::verify_update_email))
        .routes(routes!(contact::verify_update_phone));

    let mut auth_tag = Tag::new("auth");
    auth_tag.description = Some("One-time codes, registration, login and recovery".to_string());

    let mut user_tag = Tag::new("user");
    user_tag.description = Some("Profile, credential and contact changes".to_string());

    let mut health_tag = Tag::new("health");
    health_tag.description = Some("Service status".to_string());

    let openapi = router.get_openapi_mut();
    openapi.tags = Some(vec![auth_tag, user_tag, health_tag]);
    openapi
        .components
        .get_or_insert_with(Components::new)
        .add_security_scheme(
            "bearer",
            SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
        );

    router
}

fn cargo_openapi() -> utoipa::openapi::OpenApi {
    // Use Cargo.toml metadata instead of the utoipa-axum crate info defaults.
    let mut info = InfoBuilder::new()
        .title(env!("CARGO_PKG_NAME"))
        .version(env!("CARGO_PKG_VERSION"))
        .description(optional_str(env!("CARGO_PKG_DESCRIPTION")))
        .build();

    info.contact = cargo_contact();
    info.license = cargo_license();

    OpenApiBuilder::new().info(info).build()
}

fn cargo_contact() -> Option<Contact> {
    // Cargo authors are `;` separated and may include "Name <email>".
    let authors = env!("CARGO_PKG_AUTHORS");
    let primary = authors.split(';').next().map(str::trim)?;
    if primary.is_empty() {
        return None;
    }

    let (name, email) = parse_author(primary);
    if name.is_none() && email.is_none() {
        return None;
    }

    let mut contact = Contact::new();
    contact.name = name.map(str::to_string);
    contact.email = email.map(str::to_string);
    Some(contact)
}

fn cargo_license() -> Option<License> {
    let identifier = optional_str(env!("CARGO_PKG_LICENSE"))?;
    let mut license = License::new(identifier);
    license.identifier = Some(identifier.to_string());
    Some(license)
}

fn optional_str(value: &'static str) -> Option<&'static str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

fn parse_author(author: &str) -> (Option<&str>, Option<&str>) {
    if let Some(start) = author.find('<') {
        let name = author[..start].trim();
        let email = author[start + 1..].trim_end_matches('>').trim();
        let name = if name.is_empty() { None } else { Some(name) };
        let email = if email.is_empty() { None } else { Some(email) };
        (name, email)
    } else {
        let name = author.trim();
        (if name.is_empty() { None } else { Some(name) }, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_info_from_cargo() {
        let doc = openapi();
        assert_eq!(doc.info.title, env!("CARGO_PKG_NAME"));
        assert_eq!(doc.info.version, env!("CARGO_PKG_VERSION"));

        let contact = doc.info.contact;
        assert!(contact.is_some());
        if let Some(contact) = contact {
            assert_eq!(contact.name.as_deref(), Some("Team Otpgate"));
            assert_eq!(contact.email.as_deref(), Some("team@otpgate.dev"));
        }

        let license = doc.info.license;
        assert!(license.is_some());
        if let Some(license) = license {
            assert_eq!(license.name, "BSD-3-Clause");
        }
    }

    #[test]
    fn openapi_tags_and_paths() {
        let doc = openapi();
        let tags = doc.tags.clone().unwrap_or_default();
        for name in ["auth", "user", "health"] {
            assert!(tags.iter().any(|tag| tag.name == name), "missing tag {name}");
        }
        for path in [
            "/api/health",
            "/api/auth/send-otp",
            "/api/auth/verify-otp",
            "/api/auth/register",
            "/api/auth/register-simple",
            "/api/auth/login",
            "/api/auth/logout",
            "/api/auth/reset-password",
            "/api/user/profile",
            "/api/user/change-password",
            "/api/user/request-update-email",
            "/api/user/request-update-phone",
            "/api/user/verify-update-email",
            "/api/user/verify-update-phone",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing path {path}");
        }
        let profile = doc.paths.paths.get("/api/user/profile");
        assert!(profile.is_some_and(|item| item.get.is_some() && item.put.is_some()));
    }

    #[test]
    fn parse_author_variants() {
        assert_eq!(
            parse_author("Team Otpgate <team@otpgate.dev>"),
            (Some("Team Otpgate"), Some("team@otpgate.dev"))
        );
        assert_eq!(parse_author("Solo"), (Some("Solo"), None));
        assert_eq!(parse_author("<x@y.z>"), (None, Some("x@y.z")));
    }
}
