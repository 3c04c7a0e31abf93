use rocket::{
    http::Status,
    request::Request,
    response::{self, content::Json, status, Responder},
};
use serde_json::json;
use thiserror::Error;

use crate::geo::InputError;


#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    InvalidInput(#[from] InputError),

    #[error("{0}")]
    InvalidForm(&'static str),

    #[error("Authentication credentials were not provided.")]
    NotAuthenticated,

    #[error("Invalid token.")]
    InvalidToken,

    #[error("You do not have permission to perform this action.")]
    PermissionDenied,

    #[error("Not found.")]
    NotFound,

    #[error("Invalid page.")]
    InvalidPage,

    #[error("A server error occurred.")]
    Database(diesel::result::Error),
}

impl ApiError {
    pub fn status(&self) -> Status {
        match self {
            ApiError::InvalidInput(_) | ApiError::InvalidForm(_) => Status::BadRequest,
            ApiError::NotAuthenticated | ApiError::InvalidToken => Status::Unauthorized,
            ApiError::PermissionDenied => Status::Forbidden,
            ApiError::NotFound | ApiError::InvalidPage => Status::NotFound,
            ApiError::Database(_) => Status::InternalServerError,
        }
    }
}

impl From<diesel::result::Error> for ApiError {
    fn from(err: diesel::result::Error) -> Self {
        match err {
            diesel::result::Error::NotFound => ApiError::NotFound,
            err => ApiError::Database(err),
        }
    }
}

impl<'r> Responder<'r> for ApiError {
    fn respond_to(self, request: &Request) -> response::Result<'r> {
        let status = self.status();

        if let ApiError::Database(ref err) = self {
            error!("{} {}: {}", request.method(), request.uri(), err);
        }

        status::Custom(status, error_json(&self.to_string())).respond_to(request)
    }
}


pub fn error_json(detail: &str) -> Json<String> {
    Json(json!({ "detail": detail }).to_string())
}
