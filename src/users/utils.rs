use lazy_static::lazy_static;
use regex::Regex;

use crate::types::ValidationError;

lazy_static! {
    static ref LOGIN_RE: Regex = Regex::new(r"\A[A-Za-z0-9_.-]{3,100}\z").unwrap();
}

pub fn validate_login(login: &str) -> Result<(), ValidationError> {
    if !LOGIN_RE.is_match(login) {
        Err(ValidationError::from(
            "login",
            format!("Invalid login: {}", login),
        ))
    } else {
        Ok(())
    }
}

pub fn validate_full_name(full_name: &str) -> Result<(), ValidationError> {
    let length = full_name.trim().chars().count();
    if length == 0 {
        Err(ValidationError::from("fullname", "Full name is empty"))
    } else if length > 300 {
        Err(ValidationError::from("fullname", "Full name is too long"))
    } else {
        Ok(())
    }
}

pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    if password.len() < 5 {
        Err(ValidationError::from("password", "Password to short"))
    } else {
        Ok(())
    }
}
