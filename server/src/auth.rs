use rocket::{
    http::Status,
    request::{FromRequest, Outcome},
    Request,
};
use shared::{SetupError, TrackerError};

/// GitHub access token supplied by the caller in `Authorization: Bearer <token>`.
pub struct GithubToken(pub String);

fn parse_bearer(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    let token = token.trim();
    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return None;
    }
    Some(token)
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for GithubToken {
    type Error = SetupError;

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        match request
            .headers()
            .get_one("Authorization")
            .and_then(parse_bearer)
        {
            Some(token) => Outcome::Success(GithubToken(token.to_string())),
            None => Outcome::Error((Status::Unauthorized, SetupError::MissingToken)),
        }
    }
}

pub fn setup_status(error: &SetupError) -> Status {
    match error {
        SetupError::MissingToken => Status::Unauthorized,
        SetupError::InvalidRepository(_) => Status::UnprocessableEntity,
        SetupError::Repository { source, .. } => match source {
            TrackerError::Unauthorized => Status::Unauthorized,
            TrackerError::NotFound => Status::NotFound,
            TrackerError::RateLimited => Status::TooManyRequests,
            TrackerError::Rejected(_) => Status::UnprocessableEntity,
            TrackerError::Network(_) => Status::BadGateway,
        },
        SetupError::Client(_) => Status::InternalServerError,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bearer_header_parsing() {
        assert_eq!(parse_bearer("Bearer ghp_abc"), Some("ghp_abc"));
        assert_eq!(parse_bearer("bearer   ghp_abc "), Some("ghp_abc"));
        assert_eq!(parse_bearer("Basic dXNlcg=="), None);
        assert_eq!(parse_bearer("Bearer "), None);
        assert_eq!(parse_bearer("ghp_abc"), None);
    }

    #[test]
    fn setup_failures_map_to_statuses() {
        assert_eq!(setup_status(&SetupError::MissingToken), Status::Unauthorized);
        assert_eq!(
            setup_status(&SetupError::InvalidRepository("a b/c".to_string())),
            Status::UnprocessableEntity
        );
        assert_eq!(
            setup_status(&SetupError::Repository {
                repository: "acme/app".to_string(),
                source: TrackerError::NotFound,
            }),
            Status::NotFound
        );
        assert_eq!(
            setup_status(&SetupError::Repository {
                repository: "acme/app".to_string(),
                source: TrackerError::Network("timeout".to_string()),
            }),
            Status::BadGateway
        );
    }
}
