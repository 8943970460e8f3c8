use chrono::Utc;
use rocket::http::Status;
use rocket::serde::json::{self, Json};
use rocket::{delete, get, post, put, State};
use serde_derive::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use crate::auth::{Access, Identity};
use crate::db::{Db, ErrorKind};
use crate::types::{ApiError, ApiResult, Created, Validate, ValidationError};

pub mod models;

use self::models::{Article, ArticleChanges, NewArticle};

const MAX_TITLE_LENGTH: usize = 300;

fn validate_title(title: &str, errors: &mut ValidationError) {
    let length = title.trim().chars().count();
    if length == 0 {
        errors.add_error("title", "empty title");
    } else if length > MAX_TITLE_LENGTH {
        errors.add_error("title", "title is too long");
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateArticle {
    title: String,
    content: String,
    #[serde(default)]
    published: bool,
}

impl Validate for CreateArticle {
    type Error = ValidationError;
    fn validate(self) -> Result<Self, ValidationError> {
        let mut error = ValidationError::default();
        validate_title(&self.title, &mut error);
        if self.content.trim().is_empty() {
            error.add_error("content", "empty content");
        }

        if error.empty() {
            Ok(self)
        } else {
            Err(error)
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateArticle {
    title: Option<String>,
    content: Option<String>,
    published: Option<bool>,
}

impl Validate for UpdateArticle {
    type Error = ValidationError;
    fn validate(self) -> Result<Self, ValidationError> {
        let mut error = ValidationError::default();
        if let Some(title) = &self.title {
            validate_title(title, &mut error);
        }
        if let Some(content) = &self.content {
            if content.trim().is_empty() {
                error.add_error("content", "empty content");
            }
        }

        if error.empty() {
            Ok(self)
        } else {
            Err(error)
        }
    }
}

/// Loads an article, refusing private ones to anyone but their author.
fn visible_article(store: &Db, id: i32, requester: Option<i32>) -> Result<Article, ApiError> {
    let article = store.article(id)?;
    if !article.is_visible_to(requester) {
        return Err(ApiError::Unauthorized("article is private".to_string()));
    }
    Ok(article)
}

/// Loads an article the requester is allowed to modify.
fn owned_article(store: &Db, id: i32, requester: i32) -> Result<Article, ApiError> {
    let article = visible_article(store, id, Some(requester))?;
    if article.author_id != requester {
        return Err(ApiError::Unauthorized("access denied".to_string()));
    }
    Ok(article)
}

/// Like `visible_article` but reports anything the requester can't see as
/// missing, for the bookmarking endpoints.
fn bookmarkable_article(store: &Db, id: i32, requester: i32) -> Result<Article, ApiError> {
    match store.article(id) {
        Ok(article) if article.is_visible_to(Some(requester)) => Ok(article),
        Ok(_) => Err(ApiError::NotFound("article was not found".to_string())),
        Err(e) => {
            if matches!(e.kind(), ErrorKind::NotFound(_)) {
                Err(ApiError::NotFound("article was not found".to_string()))
            } else {
                Err(e.into())
            }
        }
    }
}

#[get("/")]
pub fn list(store: &State<Db>) -> ApiResult<Vec<Article>> {
    Ok(Json(store.published_articles()?))
}

#[get("/<id>", rank = 2)]
pub fn get(id: i32, store: &State<Db>, identity: Identity) -> ApiResult<Article> {
    Ok(Json(visible_article(store, id, identity.user_id())?))
}

#[post("/", data = "<create>")]
pub fn create(
    token: Access,
    store: &State<Db>,
    create: Result<Json<CreateArticle>, json::Error<'_>>,
) -> Created<Article> {
    let author_id = token?.user_id()?;
    let create = create?.validate()?.into_inner();
    let title = create.title.trim().to_string();

    if store.article_by_title(author_id, &title)?.is_some() {
        return Err(ApiError::Conflict(
            "user already has article with this title".to_string(),
        ));
    }

    let now = Utc::now();
    let article = store.create_article(NewArticle {
        author_id,
        title,
        content: create.content,
        published: create.published,
        created_at: now,
        updated_at: now,
    })?;
    info!(article_id = article.id, author_id, "article created");
    Ok((Status::Created, Json(article)))
}

#[put("/<id>", data = "<update>")]
pub fn update(
    id: i32,
    token: Access,
    store: &State<Db>,
    update: Result<Json<UpdateArticle>, json::Error<'_>>,
) -> ApiResult<Article> {
    let user_id = token?.user_id()?;
    let article = owned_article(store, id, user_id)?;
    let update = update?.validate()?.into_inner();

    let title = update.title.map(|title| title.trim().to_string());
    if let Some(title) = &title {
        if *title != article.title && store.article_by_title(user_id, title)?.is_some() {
            return Err(ApiError::Conflict(
                "user already has article with this title".to_string(),
            ));
        }
    }

    let changes = ArticleChanges {
        title,
        content: update.content,
        published: update.published,
        updated_at: Utc::now(),
    };
    Ok(Json(store.update_article(article.id, changes)?))
}

#[delete("/<id>")]
pub fn delete(id: i32, token: Access, store: &State<Db>) -> ApiResult<Article> {
    let user_id = token?.user_id()?;
    let article = owned_article(store, id, user_id)?;
    let deleted = store.delete_article(article.id)?;
    info!(article_id = deleted.id, author_id = user_id, "article deleted");
    Ok(Json(deleted))
}

#[post("/save/<id>")]
pub fn save(id: i32, token: Access, store: &State<Db>) -> ApiResult<Article> {
    let user_id = token?.user_id()?;
    let article = bookmarkable_article(store, id, user_id)?;
    store.save(user_id, article.id)?;
    Ok(Json(article))
}

#[post("/unsave/<id>")]
pub fn unsave(id: i32, token: Access, store: &State<Db>) -> ApiResult<Article> {
    let user_id = token?.user_id()?;
    let article = bookmarkable_article(store, id, user_id)?;
    if let Err(e) = store.unsave(user_id, article.id) {
        return Err(if matches!(e.kind(), ErrorKind::NotFound(_)) {
            ApiError::NotFound("article is not saved".to_string())
        } else {
            e.into()
        });
    }
    Ok(Json(article))
}

#[get("/saves")]
pub fn saves(token: Access, store: &State<Db>) -> ApiResult<Vec<Article>> {
    let user_id = token?.user_id()?;
    Ok(Json(store.saved_articles(user_id)?))
}

#[get("/issaved/<id>")]
pub fn is_saved(id: i32, token: Access, store: &State<Db>) -> ApiResult<Value> {
    let user_id = token?.user_id()?;
    let saved = store.is_saved(user_id, id)?;
    Ok(Json(json!({ "saved": saved })))
}

#[get("/for-you")]
pub fn for_you(token: Access, store: &State<Db>) -> ApiResult<Vec<Article>> {
    let user_id = token?.user_id()?;
    Ok(Json(store.feed(user_id)?))
}
