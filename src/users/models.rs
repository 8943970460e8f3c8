use bcrypt::BcryptError;
use diesel::prelude::*;
use serde_derive::Serialize;

use crate::articles::models::Article;
use crate::db::schema::users;
use crate::db::FollowCounts;
use crate::types::ApiError;

#[derive(Debug, Clone, PartialEq, Eq, Queryable, Selectable, Identifiable, Serialize)]
#[diesel(table_name = users)]
pub struct User {
    pub id: i32,
    pub login: String,
    #[serde(rename = "fullname")]
    pub full_name: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
}

impl User {
    pub fn make_password(password: &str, cost: u32) -> Result<String, BcryptError> {
        bcrypt::hash(password, cost)
    }

    pub fn verify_password(&self, password_to_verify: &str) -> Result<bool, ApiError> {
        bcrypt::verify(password_to_verify, &self.password_hash).map_err(ApiError::from)
    }

    pub fn profile(self, counts: FollowCounts, articles: Option<Vec<Article>>) -> UserProfile {
        UserProfile {
            user: self,
            followers: counts.followers,
            following: counts.following,
            articles,
        }
    }
}

/// A user as rendered by the API: account fields, follow counts and,
/// when the user is viewed on their own, their articles.
#[derive(Debug, Serialize)]
pub struct UserProfile {
    #[serde(flatten)]
    pub user: User,
    pub followers: i64,
    pub following: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub articles: Option<Vec<Article>>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = users)]
pub struct NewUser {
    pub login: String,
    pub full_name: String,
    pub password_hash: String,
}

#[derive(Debug, Default, AsChangeset)]
#[diesel(table_name = users)]
pub struct UserChanges {
    pub full_name: Option<String>,
    pub password_hash: Option<String>,
}

impl UserChanges {
    pub fn is_empty(&self) -> bool {
        self.full_name.is_none() && self.password_hash.is_none()
    }
}
