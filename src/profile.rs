use rocket::serde::json::Json;
use rocket::{get, post, State};
use serde_json::{json, Value};
use tracing::info;

use crate::auth::Access;
use crate::db::{Db, ErrorKind};
use crate::types::{ApiError, ApiResult};
use crate::users::list_profiles;
use crate::users::models::UserProfile;

#[post("/follow/<id>")]
pub fn follow(token: Access, store: &State<Db>, id: i32) -> ApiResult<UserProfile> {
    let current = token?.user_id()?;
    let followed = store.user(id)?;
    if followed.id == current {
        return Err(ApiError::BadRequest("you cannot follow yourself".to_string()));
    }

    store.follow(current, followed.id)?;
    info!(follower = current, followed = followed.id, "user followed");

    let counts = store.follow_counts(followed.id)?;
    Ok(Json(followed.profile(counts, None)))
}

#[post("/unfollow/<id>")]
pub fn unfollow(token: Access, store: &State<Db>, id: i32) -> ApiResult<UserProfile> {
    let current = token?.user_id()?;
    let followed = store.user(id)?;
    if let Err(e) = store.unfollow(current, followed.id) {
        return Err(if matches!(e.kind(), ErrorKind::NotFound(_)) {
            ApiError::NotFound("you don't follow this user".to_string())
        } else {
            e.into()
        });
    }

    let counts = store.follow_counts(followed.id)?;
    Ok(Json(followed.profile(counts, None)))
}

#[get("/<id>/followers")]
pub fn followers(store: &State<Db>, id: i32) -> ApiResult<Value> {
    let user = store.user(id)?;
    let followers = list_profiles(store, store.followers(user.id)?)?;
    Ok(Json(json!({ "followers": followers })))
}

#[get("/<id>/following")]
pub fn following(store: &State<Db>, id: i32) -> ApiResult<Value> {
    let user = store.user(id)?;
    let following = list_profiles(store, store.following(user.id)?)?;
    Ok(Json(json!({ "following": following })))
}

#[get("/<id>/isfollowed")]
pub fn is_followed(token: Access, store: &State<Db>, id: i32) -> ApiResult<Value> {
    let current = token?.user_id()?;
    let user = store.user(id)?;
    let followed = store.is_following(current, user.id)?;
    Ok(Json(json!({ "followed": followed })))
}
