use actix_web::dev::Payload;
use actix_web::http::header::AUTHORIZATION;
use actix_web::{FromRequest, HttpRequest};
use futures::future::{ready, Ready};

use crate::errors::AppError;

/// The caller's user id, taken from `Authorization: Bearer <user-id>`.
///
/// Identity is resolved upstream by the bot gateway, so the token is the id
/// itself. Extract `Option<AuthenticatedUser>` for endpoints that also serve
/// anonymous callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser(pub String);

impl AuthenticatedUser {
    pub fn id(&self) -> &str {
        &self.0
    }
}

fn bearer_identity(req: &HttpRequest) -> Option<String> {
    let value = req.headers().get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then(|| token.to_string())
}

impl FromRequest for AuthenticatedUser {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        match bearer_identity(req) {
            Some(user_id) => ready(Ok(AuthenticatedUser(user_id))),
            None => {
                log::debug!("rejected {} {}: no bearer identity", req.method(), req.path());
                ready(Err(AppError::Unauthenticated))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use actix_web::test::TestRequest;

    use super::*;

    #[test]
    fn reads_the_bearer_token_as_user_id() {
        let req = TestRequest::default()
            .insert_header((AUTHORIZATION, "Bearer 42"))
            .to_http_request();
        assert_eq!(bearer_identity(&req), Some("42".to_string()));
    }

    #[test]
    fn scheme_is_case_insensitive() {
        let req = TestRequest::default()
            .insert_header((AUTHORIZATION, "bearer tg-7"))
            .to_http_request();
        assert_eq!(bearer_identity(&req), Some("tg-7".to_string()));
    }

    #[test]
    fn missing_empty_or_foreign_schemes_are_rejected() {
        let missing = TestRequest::default().to_http_request();
        let empty = TestRequest::default()
            .insert_header((AUTHORIZATION, "Bearer   "))
            .to_http_request();
        let basic = TestRequest::default()
            .insert_header((AUTHORIZATION, "Basic dXNlcjpwYXNz"))
            .to_http_request();
        assert_eq!(bearer_identity(&missing), None);
        assert_eq!(bearer_identity(&empty), None);
        assert_eq!(bearer_identity(&basic), None);
    }
}
