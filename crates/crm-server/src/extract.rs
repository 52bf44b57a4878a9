//! Request extractors.

use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum::http::HeaderMap;
use axum::http::request::Parts;
use crm_core::filter::parse_flag;
use crm_core::identity::IdentityContext;
use uuid::Uuid;

pub const ORGANIZATION_HEADER: &str = "x-organization-uuid";
pub const USER_HEADER: &str = "x-user-uuid";
pub const USERNAME_HEADER: &str = "x-username";
pub const SUPERUSER_HEADER: &str = "x-superuser";

/// The caller, as asserted by the upstream auth collaborator.
///
/// Never rejects: missing or malformed headers leave the claim unset and
/// the services decide what an incomplete identity may do.
#[derive(Debug, Clone)]
pub struct Identity(pub IdentityContext);

impl<S: Send + Sync> FromRequestParts<S> for Identity {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Identity(identity_from_headers(&parts.headers)))
    }
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

pub fn identity_from_headers(headers: &HeaderMap) -> IdentityContext {
    let uuid = |name: &str| header(headers, name).and_then(|v| Uuid::parse_str(v).ok());
    IdentityContext {
        organization_id: uuid(ORGANIZATION_HEADER),
        user_id: uuid(USER_HEADER),
        username: header(headers, USERNAME_HEADER).map(str::to_string),
        is_superuser: header(headers, SUPERUSER_HEADER).is_some_and(parse_flag),
    }
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn full_member_identity() {
        let org = Uuid::new_v4();
        let user = Uuid::new_v4();
        let mut headers = HeaderMap::new();
        headers.insert(ORGANIZATION_HEADER, HeaderValue::from_str(&org.to_string()).unwrap());
        headers.insert(USER_HEADER, HeaderValue::from_str(&user.to_string()).unwrap());
        headers.insert(USERNAME_HEADER, HeaderValue::from_static("Test User"));

        let identity = identity_from_headers(&headers);
        assert_eq!(identity, IdentityContext::member(org, user, "Test User"));
    }

    #[test]
    fn malformed_values_are_absent() {
        let mut headers = HeaderMap::new();
        headers.insert(ORGANIZATION_HEADER, HeaderValue::from_static("not-a-uuid"));
        headers.insert(USERNAME_HEADER, HeaderValue::from_static("  "));
        headers.insert(SUPERUSER_HEADER, HeaderValue::from_static("yes please"));

        assert_eq!(identity_from_headers(&headers), IdentityContext::anonymous());
    }

    #[test]
    fn superuser_flag_values() {
        for value in ["true", "1", "True"] {
            let mut headers = HeaderMap::new();
            headers.insert(SUPERUSER_HEADER, HeaderValue::from_static(value));
            assert!(identity_from_headers(&headers).is_superuser, "{value}");
        }
    }
}
