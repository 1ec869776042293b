use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use derive_more::Display;
use serde::Serialize;

use crate::uploads::UploadError;

#[derive(Debug, Display)]
pub enum ApiError {
    #[display("Pedido não encontrado")]
    NotFound,
    #[display("{_0}")]
    BadRequest(String),
    #[display("{message}")]
    Internal {
        message: String,
        details: Option<String>,
    },
}

impl ApiError {
    pub fn internal(message: impl Into<String>, details: Option<String>) -> Self {
        Self::Internal {
            message: message.into(),
            details,
        }
    }
}

#[derive(Serialize)]
struct ErrBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let details = match self {
            Self::Internal { details, .. } => details.clone(),
            _ => None,
        };
        HttpResponse::build(self.status_code()).json(ErrBody {
            error: self.to_string(),
            details,
        })
    }
}

impl From<UploadError> for ApiError {
    fn from(err: UploadError) -> Self {
        Self::BadRequest(err.to_string())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error("registro não encontrado")]
    NotFound,
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}
