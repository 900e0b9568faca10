use crate::error::ApiError;
use crate::models::User;
use crate::state::AppState;
use rocket::http::Status;
use rocket::request::{FromRequest, Outcome, Request};
use tracing::error;

/// The user behind an `Authorization: Token <key>` header.
///
/// Tokens are issued elsewhere; this guard only resolves them.
pub struct CurrentUser(pub User);

/// The caller of a read-only route. Anonymous only when no `Authorization`
/// header is sent; a bad token is still rejected.
pub struct Viewer(pub Option<User>);

impl Viewer {
    pub fn user(&self) -> Option<&User> {
        self.0.as_ref()
    }
}

fn token(header: &str) -> Option<&str> {
    let (scheme, key) = header.trim().split_once(' ')?;
    let key = key.trim();
    if scheme.eq_ignore_ascii_case("token") && !key.is_empty() {
        Some(key)
    } else {
        None
    }
}

fn authenticate(request: &Request<'_>, header: &str) -> Outcome<User, ApiError> {
    let Some(key) = token(header) else {
        return Outcome::Error((Status::Unauthorized, ApiError::Unauthenticated));
    };
    let Some(state) = request.rocket().state::<AppState>() else {
        return Outcome::Forward(Status::InternalServerError);
    };
    match state.repo().user_by_token(key) {
        Ok(Some(user)) => Outcome::Success(user),
        Ok(None) => Outcome::Error((Status::Unauthorized, ApiError::Unauthenticated)),
        Err(e) => {
            error!(error = ?e, "token lookup failed");
            Outcome::Error((Status::InternalServerError, ApiError::Repo(e)))
        }
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for CurrentUser {
    type Error = ApiError;

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        match request.headers().get_one("Authorization") {
            Some(header) => authenticate(request, header).map(CurrentUser),
            None => Outcome::Error((Status::Unauthorized, ApiError::Unauthenticated)),
        }
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for Viewer {
    type Error = ApiError;

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        match request.headers().get_one("Authorization") {
            Some(header) => authenticate(request, header).map(|user| Viewer(Some(user))),
            None => Outcome::Success(Viewer(None)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::token;

    #[test]
    fn test_token_header() {
        assert_eq!(token("Token abc123"), Some("abc123"));
        assert_eq!(token("token   abc123 "), Some("abc123"));
        assert_eq!(token("Bearer abc123"), None);
        assert_eq!(token("Token "), None);
        assert_eq!(token("abc123"), None);
    }
}
