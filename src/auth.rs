use std::time::SystemTime;

use rocket::{
    Outcome,
    request::{self, FromRequest, Request},
};

use crate::db::{self, models::User};
use crate::error::ApiError;


/// Caller identified by an OAuth2 bearer token issued elsewhere.
pub struct AuthUser(pub User);

impl AuthUser {
    pub fn id(&self) -> i32 {
        self.0.id
    }

    pub fn ensure_author(&self, author_id: i32) -> Result<(), ApiError> {
        if self.id() == author_id {
            Ok(())
        }
        else {
            Err(ApiError::PermissionDenied)
        }
    }
}

impl<'a, 'r> FromRequest<'a, 'r> for AuthUser {
    type Error = ApiError;

    fn from_request(request: &'a Request<'r>) -> request::Outcome<Self, Self::Error> {
        let token = match request.headers().get_one("Authorization").and_then(bearer_token) {
            Some(token) => token,
            None => {
                let err = ApiError::NotAuthenticated;
                return Outcome::Failure((err.status(), err));
            },
        };

        match db::find_user_by_token(token, SystemTime::now()) {
            Ok(user) => Outcome::Success(AuthUser(user)),
            Err(err) => {
                let err = match ApiError::from(err) {
                    ApiError::NotFound => ApiError::InvalidToken,
                    err => err,
                };
                if let ApiError::Database(ref db_err) = err {
                    error!("Fail to look up access token: {}", db_err);
                }
                Outcome::Failure((err.status(), err))
            },
        }
    }
}


fn bearer_token(header: &str) -> Option<&str> {
    let mut parts = header.splitn(2, ' ');
    let scheme = parts.next()?;
    let token = parts.next()?.trim();

    if scheme.eq_ignore_ascii_case("bearer") && !token.is_empty() {
        Some(token)
    }
    else {
        None
    }
}
