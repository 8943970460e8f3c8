use diesel::dsl::exists;
use diesel::prelude::*;
use diesel::{delete, insert_into, select, update};

use super::schema::{articles, followers, saves, users};
use super::{DbConnection, ErrorKind, FollowCounts, Pool, Result, Store};
use crate::articles::models::{Article, ArticleChanges, NewArticle};
use crate::users::models::{NewUser, User, UserChanges};

/// `Store` backed by PostgreSQL through an r2d2 pool of Diesel connections.
pub struct PgStore {
    pool: Pool,
}

impl PgStore {
    pub fn new(pool: Pool) -> Self {
        PgStore { pool }
    }

    fn connection(&self) -> Result<DbConnection> {
        Ok(self.pool.get()?)
    }
}

impl Store for PgStore {
    fn users(&self) -> Result<Vec<User>> {
        let mut connection = self.connection()?;
        Ok(users::table
            .order(users::id)
            .select(User::as_select())
            .load(&mut connection)?)
    }

    fn user(&self, id: i32) -> Result<User> {
        let mut connection = self.connection()?;
        users::table
            .find(id)
            .select(User::as_select())
            .first(&mut connection)
            .optional()?
            .ok_or_else(|| ErrorKind::NotFound("user").into())
    }

    fn user_by_login(&self, login: &str) -> Result<Option<User>> {
        let mut connection = self.connection()?;
        Ok(users::table
            .filter(users::login.eq(login))
            .select(User::as_select())
            .first(&mut connection)
            .optional()?)
    }

    fn create_user(&self, user: NewUser) -> Result<User> {
        let mut connection = self.connection()?;
        insert_into(users::table)
            .values(&user)
            .on_conflict(users::login)
            .do_nothing()
            .returning(User::as_returning())
            .get_result(&mut connection)
            .optional()?
            .ok_or_else(|| ErrorKind::Conflict("this login is taken".to_string()).into())
    }

    fn update_user(&self, id: i32, changes: UserChanges) -> Result<User> {
        if changes.is_empty() {
            return self.user(id);
        }
        let mut connection = self.connection()?;
        update(users::table.find(id))
            .set(&changes)
            .returning(User::as_returning())
            .get_result(&mut connection)
            .optional()?
            .ok_or_else(|| ErrorKind::NotFound("user").into())
    }

    fn delete_user(&self, id: i32) -> Result<User> {
        let mut connection = self.connection()?;
        // articles, follow edges and saves go with the user through ON DELETE CASCADE
        delete(users::table.find(id))
            .returning(User::as_returning())
            .get_result(&mut connection)
            .optional()?
            .ok_or_else(|| ErrorKind::NotFound("user").into())
    }

    fn follow(&self, follower: i32, followed: i32) -> Result<()> {
        let mut connection = self.connection()?;
        let inserted = insert_into(followers::table)
            .values((
                followers::follower_id.eq(follower),
                followers::follows_id.eq(followed),
            ))
            .on_conflict_do_nothing()
            .execute(&mut connection)?;
        if inserted == 0 {
            bail!(ErrorKind::Conflict(
                "you already follow this user".to_string()
            ));
        }
        Ok(())
    }

    fn unfollow(&self, follower: i32, followed: i32) -> Result<()> {
        let mut connection = self.connection()?;
        let deleted = delete(
            followers::table
                .filter(followers::follower_id.eq(follower))
                .filter(followers::follows_id.eq(followed)),
        )
        .execute(&mut connection)?;
        if deleted == 0 {
            bail!(ErrorKind::NotFound("follow"));
        }
        Ok(())
    }

    fn is_following(&self, follower: i32, followed: i32) -> Result<bool> {
        let mut connection = self.connection()?;
        Ok(select(exists(
            followers::table
                .filter(followers::follower_id.eq(follower))
                .filter(followers::follows_id.eq(followed)),
        ))
        .get_result::<bool>(&mut connection)?)
    }

    fn followers(&self, id: i32) -> Result<Vec<User>> {
        let mut connection = self.connection()?;
        let follower_ids = followers::table
            .filter(followers::follows_id.eq(id))
            .select(followers::follower_id);
        Ok(users::table
            .filter(users::id.eq_any(follower_ids))
            .order(users::id)
            .select(User::as_select())
            .load(&mut connection)?)
    }

    fn following(&self, id: i32) -> Result<Vec<User>> {
        let mut connection = self.connection()?;
        let followed_ids = followers::table
            .filter(followers::follower_id.eq(id))
            .select(followers::follows_id);
        Ok(users::table
            .filter(users::id.eq_any(followed_ids))
            .order(users::id)
            .select(User::as_select())
            .load(&mut connection)?)
    }

    fn follow_counts(&self, id: i32) -> Result<FollowCounts> {
        let mut connection = self.connection()?;
        let followers = followers::table
            .filter(followers::follows_id.eq(id))
            .count()
            .get_result::<i64>(&mut connection)?;
        let following = followers::table
            .filter(followers::follower_id.eq(id))
            .count()
            .get_result::<i64>(&mut connection)?;
        Ok(FollowCounts {
            followers,
            following,
        })
    }

    fn published_articles(&self) -> Result<Vec<Article>> {
        let mut connection = self.connection()?;
        Ok(articles::table
            .filter(articles::published.eq(true))
            .order((articles::created_at.desc(), articles::id.desc()))
            .select(Article::as_select())
            .load(&mut connection)?)
    }

    fn articles_by_author(&self, author: i32, include_private: bool) -> Result<Vec<Article>> {
        let mut connection = self.connection()?;
        let mut query = articles::table
            .filter(articles::author_id.eq(author))
            .order((articles::created_at.desc(), articles::id.desc()))
            .select(Article::as_select())
            .into_boxed();
        if !include_private {
            query = query.filter(articles::published.eq(true));
        }
        Ok(query.load(&mut connection)?)
    }

    fn article(&self, id: i32) -> Result<Article> {
        let mut connection = self.connection()?;
        articles::table
            .find(id)
            .select(Article::as_select())
            .first(&mut connection)
            .optional()?
            .ok_or_else(|| ErrorKind::NotFound("article").into())
    }

    fn article_by_title(&self, author: i32, title: &str) -> Result<Option<Article>> {
        let mut connection = self.connection()?;
        Ok(articles::table
            .filter(articles::author_id.eq(author))
            .filter(articles::title.eq(title))
            .select(Article::as_select())
            .first(&mut connection)
            .optional()?)
    }

    fn create_article(&self, article: NewArticle) -> Result<Article> {
        let mut connection = self.connection()?;
        Ok(insert_into(articles::table)
            .values(&article)
            .returning(Article::as_returning())
            .get_result(&mut connection)?)
    }

    fn update_article(&self, id: i32, changes: ArticleChanges) -> Result<Article> {
        let mut connection = self.connection()?;
        update(articles::table.find(id))
            .set(&changes)
            .returning(Article::as_returning())
            .get_result(&mut connection)
            .optional()?
            .ok_or_else(|| ErrorKind::NotFound("article").into())
    }

    fn delete_article(&self, id: i32) -> Result<Article> {
        let mut connection = self.connection()?;
        delete(articles::table.find(id))
            .returning(Article::as_returning())
            .get_result(&mut connection)
            .optional()?
            .ok_or_else(|| ErrorKind::NotFound("article").into())
    }

    fn save(&self, user: i32, article: i32) -> Result<()> {
        let mut connection = self.connection()?;
        let inserted = insert_into(saves::table)
            .values((saves::user_id.eq(user), saves::article_id.eq(article)))
            .on_conflict_do_nothing()
            .execute(&mut connection)?;
        if inserted == 0 {
            bail!(ErrorKind::Conflict(
                "article is already saved".to_string()
            ));
        }
        Ok(())
    }

    fn unsave(&self, user: i32, article: i32) -> Result<()> {
        let mut connection = self.connection()?;
        let deleted = delete(
            saves::table
                .filter(saves::user_id.eq(user))
                .filter(saves::article_id.eq(article)),
        )
        .execute(&mut connection)?;
        if deleted == 0 {
            bail!(ErrorKind::NotFound("save"));
        }
        Ok(())
    }

    fn is_saved(&self, user: i32, article: i32) -> Result<bool> {
        let mut connection = self.connection()?;
        Ok(select(exists(
            saves::table
                .filter(saves::user_id.eq(user))
                .filter(saves::article_id.eq(article)),
        ))
        .get_result::<bool>(&mut connection)?)
    }

    fn saved_articles(&self, user: i32) -> Result<Vec<Article>> {
        let mut connection = self.connection()?;
        let saved_ids = saves::table
            .filter(saves::user_id.eq(user))
            .select(saves::article_id);
        Ok(articles::table
            .filter(articles::id.eq_any(saved_ids))
            .filter(
                articles::published
                    .eq(true)
                    .or(articles::author_id.eq(user)),
            )
            .order((articles::created_at.desc(), articles::id.desc()))
            .select(Article::as_select())
            .load(&mut connection)?)
    }

    fn feed(&self, user: i32) -> Result<Vec<Article>> {
        let mut connection = self.connection()?;
        let followed_ids = followers::table
            .filter(followers::follower_id.eq(user))
            .select(followers::follows_id);
        Ok(articles::table
            .filter(articles::published.eq(true))
            .filter(articles::author_id.eq_any(followed_ids))
            .order((articles::created_at.desc(), articles::id.desc()))
            .select(Article::as_select())
            .load(&mut connection)?)
    }
}
