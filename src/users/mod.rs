use rocket::http::{CookieJar, Status};
use rocket::serde::json::{self, Json};
use rocket::{delete, get, post, put, State};
use serde_derive::Deserialize;
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::auth::{self, Access, Identity, Refresh, TokenPair};
use crate::config::Config;
use crate::db::{Db, FollowCounts};
use crate::types::{ApiError, ApiResult, Created, Validate, ValidationError};

pub mod models;
mod utils;

use self::models::{NewUser, User, UserChanges, UserProfile};
use self::utils::*;

#[derive(Debug, Deserialize)]
pub struct Signup {
    login: String,
    fullname: String,
    password: String,
}

impl Validate for Signup {
    type Error = ValidationError;
    fn validate(self) -> Result<Self, ValidationError> {
        let mut errors = ValidationError::default();
        if let Err(e) = validate_login(&self.login) {
            errors.merge(e);
        }
        if let Err(e) = validate_full_name(&self.fullname) {
            errors.merge(e);
        }
        if let Err(e) = validate_password(&self.password) {
            errors.merge(e);
        }

        if errors.empty() {
            Ok(self)
        } else {
            Err(errors)
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Credentials {
    login: String,
    password: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateUser {
    fullname: Option<String>,
    password: Option<String>,
}

impl Validate for UpdateUser {
    type Error = ValidationError;
    fn validate(self) -> Result<Self, ValidationError> {
        let mut errors = ValidationError::default();
        if let Some(fullname) = &self.fullname {
            if let Err(e) = validate_full_name(fullname) {
                errors.merge(e);
            }
        }
        if let Some(password) = &self.password {
            if let Err(e) = validate_password(password) {
                errors.merge(e);
            }
        }

        if errors.empty() {
            Ok(self)
        } else {
            Err(errors)
        }
    }
}

/// Renders `user` with follow counts and the articles `requester` may see.
pub fn full_profile(store: &Db, user: User, requester: Option<i32>) -> Result<UserProfile, ApiError> {
    let is_owner = requester == Some(user.id);
    let articles = store.articles_by_author(user.id, is_owner)?;
    let counts = store.follow_counts(user.id)?;
    Ok(user.profile(counts, Some(articles)))
}

/// Renders each user with follow counts only.
pub fn list_profiles(store: &Db, users: Vec<User>) -> Result<Vec<UserProfile>, ApiError> {
    users
        .into_iter()
        .map(|user| {
            let counts = store.follow_counts(user.id)?;
            Ok(user.profile(counts, None))
        })
        .collect()
}

#[get("/")]
pub fn list(store: &State<Db>) -> ApiResult<Value> {
    let users = list_profiles(store, store.users()?)?;
    Ok(Json(json!({ "users": users })))
}

#[get("/<id>", rank = 2)]
pub fn get(id: i32, store: &State<Db>, identity: Identity) -> ApiResult<UserProfile> {
    let user = store.user(id)?;
    Ok(Json(full_profile(store, user, identity.user_id())?))
}

#[post("/signup", data = "<signup>")]
pub fn signup(
    store: &State<Db>,
    config: &State<Config>,
    signup: Result<Json<Signup>, json::Error<'_>>,
) -> Created<UserProfile> {
    let signup = signup?.validate()?.into_inner();

    if store.user_by_login(&signup.login)?.is_some() {
        return Err(ApiError::Conflict("this login is taken".to_string()));
    }

    let new_user = NewUser {
        login: signup.login,
        full_name: signup.fullname.trim().to_string(),
        password_hash: User::make_password(&signup.password, config.bcrypt_cost)?,
    };
    let user = store.create_user(new_user)?;
    info!(user_id = user.id, login = %user.login, "user signed up");

    let profile = user.profile(FollowCounts::default(), Some(Vec::new()));
    Ok((Status::Created, Json(profile)))
}

#[post("/signin", data = "<credentials>")]
pub fn signin(
    store: &State<Db>,
    config: &State<Config>,
    cookies: &CookieJar<'_>,
    credentials: Result<Json<Credentials>, json::Error<'_>>,
) -> ApiResult<TokenPair> {
    let credentials = credentials?.into_inner();
    let user = store
        .user_by_login(&credentials.login)?
        .ok_or_else(|| ApiError::NotFound("user with this login doesn't exist".to_string()))?;

    if !user.verify_password(&credentials.password)? {
        warn!(user_id = user.id, "sign-in with a wrong password");
        return Err(ApiError::Unauthorized("invalid password".to_string()));
    }

    let pair = config.secrets.issue_pair(&user.id.to_string())?;
    auth::set_cookies(cookies, &pair);
    info!(user_id = user.id, "user signed in");
    Ok(Json(pair))
}

#[post("/refresh")]
pub fn refresh(
    token: Refresh,
    config: &State<Config>,
    cookies: &CookieJar<'_>,
) -> ApiResult<TokenPair> {
    let claims = token?.0;
    let pair = config.secrets.issue_pair(&claims.sub)?;
    auth::set_cookies(cookies, &pair);
    info!(subject = %claims.sub, "token pair refreshed");
    Ok(Json(pair))
}

#[get("/me")]
pub fn me(token: Access, store: &State<Db>) -> ApiResult<UserProfile> {
    let user_id = token?.user_id()?;
    let user = store.user(user_id)?;
    Ok(Json(full_profile(store, user, Some(user_id))?))
}

#[put("/", data = "<update>")]
pub fn update(
    token: Access,
    store: &State<Db>,
    config: &State<Config>,
    update: Result<Json<UpdateUser>, json::Error<'_>>,
) -> ApiResult<UserProfile> {
    let user_id = token?.user_id()?;
    let update = update?.validate()?.into_inner();

    let password_hash = match update.password {
        Some(password) => Some(User::make_password(&password, config.bcrypt_cost)?),
        None => None,
    };
    let changes = UserChanges {
        full_name: update.fullname.map(|name| name.trim().to_string()),
        password_hash,
    };
    let user = store.update_user(user_id, changes)?;
    Ok(Json(full_profile(store, user, Some(user_id))?))
}

#[delete("/")]
pub fn delete(token: Access, store: &State<Db>) -> ApiResult<User> {
    let user_id = token?.user_id()?;
    let user = store.delete_user(user_id)?;
    info!(user_id, login = %user.login, "account deleted");
    Ok(Json(user))
}
