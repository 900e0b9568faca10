use crate::infra::RepoError;
use rocket::http::Status;
use rocket::response::{self, Responder};
use rocket::serde::json::{json, Json};
use rocket::Request;
use thiserror::Error;
use tracing::error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0} not found")]
    NotFound(String),
    #[error("{0}")]
    BadRequest(String),
    #[error("authentication credentials were not provided")]
    Unauthenticated,
    #[error("you do not have permission to perform this action")]
    Forbidden,
    #[error("short link keyspace exhausted after {attempts} attempts")]
    ResourceExhausted { attempts: u32 },
    #[error(transparent)]
    Repo(#[from] RepoError),
}

impl ApiError {
    pub fn status(&self) -> Status {
        match self {
            ApiError::NotFound(_) => Status::NotFound,
            ApiError::BadRequest(_) => Status::BadRequest,
            ApiError::Unauthenticated => Status::Unauthorized,
            ApiError::Forbidden => Status::Forbidden,
            ApiError::ResourceExhausted { .. } => Status::ServiceUnavailable,
            ApiError::Repo(_) => Status::InternalServerError,
        }
    }
}

impl<'r> Responder<'r, 'static> for ApiError {
    fn respond_to(self, request: &'r Request<'_>) -> response::Result<'static> {
        let status = self.status();
        // Repository failures are logged with their source, the body stays generic.
        let detail = match &self {
            ApiError::Repo(e) => {
                error!(uri = %request.uri(), error = ?e, "repository failure");
                "internal server error".to_string()
            }
            ApiError::ResourceExhausted { .. } => {
                error!(uri = %request.uri(), "{}", self);
                self.to_string()
            }
            _ => self.to_string(),
        };
        (status, Json(json!({ "detail": detail }))).respond_to(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::UniqueKey;

    #[test]
    fn test_status_mapping() {
        assert_eq!(ApiError::NotFound("recipe".into()).status(), Status::NotFound);
        assert_eq!(ApiError::Unauthenticated.status(), Status::Unauthorized);
        assert_eq!(
            ApiError::ResourceExhausted { attempts: 10 }.status(),
            Status::ServiceUnavailable
        );
        assert_eq!(
            ApiError::from(RepoError::Duplicate(UniqueKey::ShortLinkCode)).status(),
            Status::InternalServerError
        );
    }

    #[test]
    fn test_not_found_message() {
        assert_eq!(
            ApiError::NotFound("recipe 42".into()).to_string(),
            "recipe 42 not found"
        );
    }
}
