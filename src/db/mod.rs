use diesel::pg::PgConnection;
use diesel::r2d2::ConnectionManager;
use diesel::result::Error as DieselError;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use serde_derive::Serialize;

use crate::articles::models::{Article, ArticleChanges, NewArticle};
use crate::users::models::{NewUser, User, UserChanges};

pub mod memory;
pub mod pg;
pub mod schema;

pub use self::memory::MemoryStore;
pub use self::pg::PgStore;

// An alias to the type for a pool of Diesel Postgres connections.
pub type Pool = r2d2::Pool<ConnectionManager<PgConnection>>;

pub type DbConnection = r2d2::PooledConnection<ConnectionManager<PgConnection>>;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

error_chain! {
    foreign_links {
        R2D2(r2d2::Error);
        Diesel(DieselError);
    }

    errors {
        NotFound(what: &'static str) {
            description("entity not found")
            display("{} not found", what)
        }
        Conflict(what: String) {
            description("uniqueness conflict")
            display("{}", what)
        }
        Migration(reason: String) {
            description("migration failed")
            display("migration failed: {}", reason)
        }
        Poisoned {
            description("store lock poisoned")
            display("store lock poisoned")
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FollowCounts {
    pub followers: i64,
    pub following: i64,
}

/// Persistence interface the HTTP handlers are written against.
///
/// Lookups of a single entity fail with `ErrorKind::NotFound`; inserting a
/// duplicate follow or save edge fails with `ErrorKind::Conflict`. Article
/// listings are ordered newest first, user listings by id.
pub trait Store: Send + Sync {
    fn users(&self) -> Result<Vec<User>>;
    fn user(&self, id: i32) -> Result<User>;
    fn user_by_login(&self, login: &str) -> Result<Option<User>>;
    fn create_user(&self, user: NewUser) -> Result<User>;
    fn update_user(&self, id: i32, changes: UserChanges) -> Result<User>;
    /// Removes the user together with their articles, follow edges and saves.
    fn delete_user(&self, id: i32) -> Result<User>;

    fn follow(&self, follower: i32, followed: i32) -> Result<()>;
    fn unfollow(&self, follower: i32, followed: i32) -> Result<()>;
    fn is_following(&self, follower: i32, followed: i32) -> Result<bool>;
    /// Users following `id`.
    fn followers(&self, id: i32) -> Result<Vec<User>>;
    /// Users `id` follows.
    fn following(&self, id: i32) -> Result<Vec<User>>;
    fn follow_counts(&self, id: i32) -> Result<FollowCounts>;

    fn published_articles(&self) -> Result<Vec<Article>>;
    fn articles_by_author(&self, author: i32, include_private: bool) -> Result<Vec<Article>>;
    fn article(&self, id: i32) -> Result<Article>;
    fn article_by_title(&self, author: i32, title: &str) -> Result<Option<Article>>;
    fn create_article(&self, article: NewArticle) -> Result<Article>;
    fn update_article(&self, id: i32, changes: ArticleChanges) -> Result<Article>;
    fn delete_article(&self, id: i32) -> Result<Article>;

    fn save(&self, user: i32, article: i32) -> Result<()>;
    fn unsave(&self, user: i32, article: i32) -> Result<()>;
    fn is_saved(&self, user: i32, article: i32) -> Result<bool>;
    /// Saved articles that are still visible to `user`.
    fn saved_articles(&self, user: i32) -> Result<Vec<Article>>;
    /// Published articles written by the authors `user` follows.
    fn feed(&self, user: i32) -> Result<Vec<Article>>;
}

/// The store as it is handed to Rocket's managed state.
pub type Db = Box<dyn Store>;

pub fn init_pool(database_url: &str, max_size: u32) -> Result<Pool> {
    let manager = ConnectionManager::<PgConnection>::new(database_url);
    Ok(Pool::builder().max_size(max_size).build(manager)?)
}

pub fn run_migrations(pool: &Pool) -> Result<()> {
    let mut connection = pool.get()?;
    let applied = connection
        .run_pending_migrations(MIGRATIONS)
        .map_err(|e| ErrorKind::Migration(e.to_string()))?;
    for migration in applied {
        tracing::info!(%migration, "applied migration");
    }
    Ok(())
}
