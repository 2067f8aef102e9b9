// src/errors.rs
use mongodb::bson::oid;
use mongodb::error::{ErrorKind, WriteFailure};
use rocket::http::Status;
use rocket::response::{self, Responder};
use rocket::serde::json::Json;
use rocket::Request;
use serde::Serialize;
use thiserror::Error;

/// Error taxonomy for the whole API surface. Store failures keep their cause
/// for logging but render as a generic server error.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Unauthorized Access")]
    Unauthorized,
    #[error("Forbidden Access")]
    Forbidden,
    #[error("Invalid id format")]
    InvalidId,
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("You have already placed a bid on this job")]
    DuplicateBid,
    #[error("Not Found")]
    NotFound,
    #[error("Internal Server Error")]
    TokenSigning(#[from] jsonwebtoken::errors::Error),
    #[error("Internal Server Error")]
    Store(#[from] mongodb::error::Error),
}

impl ApiError {
    pub fn status(&self) -> Status {
        match self {
            ApiError::Unauthorized => Status::Unauthorized,
            ApiError::Forbidden => Status::Forbidden,
            ApiError::InvalidId
            | ApiError::InvalidParameter(_)
            | ApiError::DuplicateBid => Status::BadRequest,
            ApiError::NotFound => Status::NotFound,
            ApiError::TokenSigning(_) | ApiError::Store(_) => Status::InternalServerError,
        }
    }

    /// True when the store rejected a write on a unique index (code 11000).
    pub fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
        matches!(
            &*err.kind,
            ErrorKind::Write(WriteFailure::WriteError(we)) if we.code == 11000
        )
    }
}

impl From<oid::Error> for ApiError {
    fn from(_: oid::Error) -> Self {
        ApiError::InvalidId
    }
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub message: String,
}

impl<'r> Responder<'r, 'static> for ApiError {
    fn respond_to(self, req: &'r Request<'_>) -> response::Result<'static> {
        if let ApiError::Store(ref e) = self {
            eprintln!("store error on {}: {:?}", req.uri(), e);
        }
        let status = self.status();
        let body = Json(ErrorBody {
            message: self.to_string(),
        });
        response::Response::build_from(body.respond_to(req)?)
            .status(status)
            .ok()
    }
}
