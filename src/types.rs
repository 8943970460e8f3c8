use std::collections::HashMap;

use bcrypt::BcryptError;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use rocket::http::Status;
use rocket::request::Request;
use rocket::response::{self, Responder};
use rocket::serde::json::{self, Json};
use serde_derive::Serialize;
use serde_json::json;
use tracing::error;

use crate::db;
use crate::utils::try_respond;

pub trait Validate
where
    Self: Sized,
{
    type Error;
    fn validate(self) -> Result<Self, Self::Error>;
}

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Validation(ValidationError),
    Unauthorized(String),
    NotFound(String),
    Conflict(String),
    Internal,
}

impl ApiError {
    pub fn status(&self) -> Status {
        match self {
            ApiError::BadRequest(_) | ApiError::Validation(_) => Status::BadRequest,
            ApiError::Unauthorized(_) => Status::Unauthorized,
            ApiError::NotFound(_) => Status::NotFound,
            ApiError::Conflict(_) => Status::Conflict,
            ApiError::Internal => Status::InternalServerError,
        }
    }
}

impl From<db::Error> for ApiError {
    fn from(err: db::Error) -> ApiError {
        match err.kind() {
            db::ErrorKind::NotFound(what) => ApiError::NotFound(format!("{} not found", what)),
            db::ErrorKind::Conflict(what) => ApiError::Conflict(what.clone()),
            db::ErrorKind::Diesel(DieselError::NotFound) => {
                ApiError::NotFound("entity not found".to_string())
            }
            db::ErrorKind::Diesel(DieselError::DatabaseError(
                DatabaseErrorKind::UniqueViolation,
                info,
            )) => ApiError::Conflict(conflict_message(info.table_name()).to_string()),
            // a row referenced by the write is gone, e.g. the requester's account
            db::ErrorKind::Diesel(DieselError::DatabaseError(
                DatabaseErrorKind::ForeignKeyViolation,
                _,
            )) => ApiError::NotFound("entity not found".to_string()),
            _ => {
                error!(error = %err, "storage failure");
                ApiError::Internal
            }
        }
    }
}

fn conflict_message(table: Option<&str>) -> &'static str {
    match table {
        Some("users") => "this login is taken",
        Some("articles") => "user already has article with this title",
        Some("followers") => "you already follow this user",
        Some("saves") => "article is already saved",
        _ => "entity already exists",
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> ApiError {
        ApiError::Validation(err)
    }
}

impl From<BcryptError> for ApiError {
    fn from(err: BcryptError) -> ApiError {
        error!(error = %err, "password hashing failed");
        ApiError::Internal
    }
}

impl<'a> From<json::Error<'a>> for ApiError {
    fn from(err: json::Error<'a>) -> ApiError {
        ApiError::BadRequest(err.to_string())
    }
}

pub type ApiResult<T> = Result<Json<T>, ApiError>;

/// Result of a handler that creates a resource: `201 Created` with the body.
pub type Created<T> = Result<(Status, Json<T>), ApiError>;

#[derive(Debug, Serialize, Default)]
pub struct ValidationError(HashMap<String, Vec<String>>);

impl ValidationError {
    pub fn add_error<K: Into<String>, V: Into<String>>(&mut self, key: K, val: V) {
        let entry = self.0.entry(key.into()).or_default();
        entry.push(val.into());
    }

    pub fn from<K: Into<String>, V: Into<String>>(key: K, val: V) -> Self {
        let mut error = ValidationError::default();
        error.add_error(key, val);
        error
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn merge(&mut self, other: ValidationError) {
        for (key, errors) in other.0.into_iter() {
            let entry = self.0.entry(key).or_default();
            entry.extend(errors);
        }
    }

    pub fn empty(&self) -> bool {
        self.len() == 0
    }

    pub fn field(&self, key: &str) -> Option<&[String]> {
        self.0.get(key).map(|errors| errors.as_slice())
    }
}

impl<'r> Responder<'r, 'static> for ApiError {
    fn respond_to(self, req: &'r Request<'_>) -> response::Result<'static> {
        let status = self.status();
        let body = match self {
            ApiError::Validation(errors) => json!({
                "message": "invalid input",
                "errors": errors,
            }),
            ApiError::BadRequest(message)
            | ApiError::Unauthorized(message)
            | ApiError::NotFound(message)
            | ApiError::Conflict(message) => json!({ "message": message }),
            ApiError::Internal => json!({ "message": "internal server error" }),
        };
        try_respond(req, body, status)
    }
}

impl<T> Validate for Json<T>
where
    T: Validate,
{
    type Error = <T as Validate>::Error;
    fn validate(self) -> Result<Self, Self::Error> {
        let inner = self.into_inner();
        let validated = inner.validate()?;
        Ok(Json(validated))
    }
}
