use std::sync::{Mutex, MutexGuard};

use super::{ErrorKind, FollowCounts, Result, Store};
use crate::articles::models::{Article, ArticleChanges, NewArticle};
use crate::users::models::{NewUser, User, UserChanges};

#[derive(Debug, Default)]
struct Tables {
    users: Vec<User>,
    articles: Vec<Article>,
    // (follower_id, follows_id)
    followers: Vec<(i32, i32)>,
    // (user_id, article_id)
    saves: Vec<(i32, i32)>,
    last_user_id: i32,
    last_article_id: i32,
}

impl Tables {
    fn user(&self, id: i32) -> Result<&User> {
        self.users
            .iter()
            .find(|user| user.id == id)
            .ok_or_else(|| ErrorKind::NotFound("user").into())
    }

    fn users_where<F>(&self, predicate: F) -> Vec<User>
    where
        F: Fn(&User) -> bool,
    {
        self.users.iter().filter(|u| predicate(u)).cloned().collect()
    }

    fn articles_where<F>(&self, predicate: F) -> Vec<Article>
    where
        F: Fn(&Article) -> bool,
    {
        let mut found: Vec<Article> = self
            .articles
            .iter()
            .filter(|a| predicate(a))
            .cloned()
            .collect();
        found.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        found
    }

    fn title_taken(&self, author: i32, title: &str, except: Option<i32>) -> bool {
        self.articles
            .iter()
            .any(|a| a.author_id == author && a.title == title && Some(a.id) != except)
    }
}

/// In-process `Store` with the same uniqueness rules and cascades as the
/// Postgres schema.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>> {
        self.tables.lock().map_err(|_| ErrorKind::Poisoned.into())
    }
}

impl Store for MemoryStore {
    fn users(&self) -> Result<Vec<User>> {
        Ok(self.lock()?.users.clone())
    }

    fn user(&self, id: i32) -> Result<User> {
        self.lock()?.user(id).cloned()
    }

    fn user_by_login(&self, login: &str) -> Result<Option<User>> {
        let tables = self.lock()?;
        Ok(tables.users.iter().find(|u| u.login == login).cloned())
    }

    fn create_user(&self, user: NewUser) -> Result<User> {
        let mut tables = self.lock()?;
        if tables.users.iter().any(|u| u.login == user.login) {
            bail!(ErrorKind::Conflict("this login is taken".to_string()));
        }
        tables.last_user_id += 1;
        let created = User {
            id: tables.last_user_id,
            login: user.login,
            full_name: user.full_name,
            password_hash: user.password_hash,
        };
        tables.users.push(created.clone());
        Ok(created)
    }

    fn update_user(&self, id: i32, changes: UserChanges) -> Result<User> {
        let mut tables = self.lock()?;
        let user = tables
            .users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or(ErrorKind::NotFound("user"))?;
        if let Some(full_name) = changes.full_name {
            user.full_name = full_name;
        }
        if let Some(password_hash) = changes.password_hash {
            user.password_hash = password_hash;
        }
        Ok(user.clone())
    }

    fn delete_user(&self, id: i32) -> Result<User> {
        let mut tables = self.lock()?;
        let user = tables.user(id)?.clone();
        let owned: Vec<i32> = tables
            .articles
            .iter()
            .filter(|a| a.author_id == id)
            .map(|a| a.id)
            .collect();
        tables.users.retain(|u| u.id != id);
        tables.articles.retain(|a| a.author_id != id);
        tables
            .followers
            .retain(|&(follower, followed)| follower != id && followed != id);
        tables
            .saves
            .retain(|&(user_id, article_id)| user_id != id && !owned.contains(&article_id));
        Ok(user)
    }

    fn follow(&self, follower: i32, followed: i32) -> Result<()> {
        let mut tables = self.lock()?;
        tables.user(follower)?;
        tables.user(followed)?;
        if tables.followers.contains(&(follower, followed)) {
            bail!(ErrorKind::Conflict(
                "you already follow this user".to_string()
            ));
        }
        tables.followers.push((follower, followed));
        Ok(())
    }

    fn unfollow(&self, follower: i32, followed: i32) -> Result<()> {
        let mut tables = self.lock()?;
        let before = tables.followers.len();
        tables.followers.retain(|&edge| edge != (follower, followed));
        if tables.followers.len() == before {
            bail!(ErrorKind::NotFound("follow"));
        }
        Ok(())
    }

    fn is_following(&self, follower: i32, followed: i32) -> Result<bool> {
        Ok(self.lock()?.followers.contains(&(follower, followed)))
    }

    fn followers(&self, id: i32) -> Result<Vec<User>> {
        let tables = self.lock()?;
        Ok(tables.users_where(|u| tables.followers.contains(&(u.id, id))))
    }

    fn following(&self, id: i32) -> Result<Vec<User>> {
        let tables = self.lock()?;
        Ok(tables.users_where(|u| tables.followers.contains(&(id, u.id))))
    }

    fn follow_counts(&self, id: i32) -> Result<FollowCounts> {
        let tables = self.lock()?;
        let followers = tables
            .followers
            .iter()
            .filter(|&&(_, followed)| followed == id)
            .count();
        let following = tables
            .followers
            .iter()
            .filter(|&&(follower, _)| follower == id)
            .count();
        Ok(FollowCounts {
            followers: followers as i64,
            following: following as i64,
        })
    }

    fn published_articles(&self) -> Result<Vec<Article>> {
        Ok(self.lock()?.articles_where(|a| a.published))
    }

    fn articles_by_author(&self, author: i32, include_private: bool) -> Result<Vec<Article>> {
        Ok(self
            .lock()?
            .articles_where(|a| a.author_id == author && (include_private || a.published)))
    }

    fn article(&self, id: i32) -> Result<Article> {
        let tables = self.lock()?;
        tables
            .articles
            .iter()
            .find(|a| a.id == id)
            .cloned()
            .ok_or_else(|| ErrorKind::NotFound("article").into())
    }

    fn article_by_title(&self, author: i32, title: &str) -> Result<Option<Article>> {
        let tables = self.lock()?;
        Ok(tables
            .articles
            .iter()
            .find(|a| a.author_id == author && a.title == title)
            .cloned())
    }

    fn create_article(&self, article: NewArticle) -> Result<Article> {
        let mut tables = self.lock()?;
        tables.user(article.author_id)?;
        if tables.title_taken(article.author_id, &article.title, None) {
            bail!(ErrorKind::Conflict(
                "user already has article with this title".to_string()
            ));
        }
        tables.last_article_id += 1;
        let created = Article {
            id: tables.last_article_id,
            author_id: article.author_id,
            title: article.title,
            content: article.content,
            published: article.published,
            created_at: article.created_at,
            updated_at: article.updated_at,
        };
        tables.articles.push(created.clone());
        Ok(created)
    }

    fn update_article(&self, id: i32, changes: ArticleChanges) -> Result<Article> {
        let mut tables = self.lock()?;
        let author = tables
            .articles
            .iter()
            .find(|a| a.id == id)
            .map(|a| a.author_id)
            .ok_or(ErrorKind::NotFound("article"))?;
        if let Some(title) = &changes.title {
            if tables.title_taken(author, title, Some(id)) {
                bail!(ErrorKind::Conflict(
                    "user already has article with this title".to_string()
                ));
            }
        }
        let article = tables
            .articles
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or(ErrorKind::NotFound("article"))?;
        if let Some(title) = changes.title {
            article.title = title;
        }
        if let Some(content) = changes.content {
            article.content = content;
        }
        if let Some(published) = changes.published {
            article.published = published;
        }
        article.updated_at = changes.updated_at;
        Ok(article.clone())
    }

    fn delete_article(&self, id: i32) -> Result<Article> {
        let mut tables = self.lock()?;
        let position = tables
            .articles
            .iter()
            .position(|a| a.id == id)
            .ok_or(ErrorKind::NotFound("article"))?;
        let article = tables.articles.remove(position);
        tables.saves.retain(|&(_, article_id)| article_id != id);
        Ok(article)
    }

    fn save(&self, user: i32, article: i32) -> Result<()> {
        let mut tables = self.lock()?;
        tables.user(user)?;
        if !tables.articles.iter().any(|a| a.id == article) {
            bail!(ErrorKind::NotFound("article"));
        }
        if tables.saves.contains(&(user, article)) {
            bail!(ErrorKind::Conflict("article is already saved".to_string()));
        }
        tables.saves.push((user, article));
        Ok(())
    }

    fn unsave(&self, user: i32, article: i32) -> Result<()> {
        let mut tables = self.lock()?;
        let before = tables.saves.len();
        tables.saves.retain(|&edge| edge != (user, article));
        if tables.saves.len() == before {
            bail!(ErrorKind::NotFound("save"));
        }
        Ok(())
    }

    fn is_saved(&self, user: i32, article: i32) -> Result<bool> {
        Ok(self.lock()?.saves.contains(&(user, article)))
    }

    fn saved_articles(&self, user: i32) -> Result<Vec<Article>> {
        let tables = self.lock()?;
        Ok(tables.articles_where(|a| {
            tables.saves.contains(&(user, a.id)) && (a.published || a.author_id == user)
        }))
    }

    fn feed(&self, user: i32) -> Result<Vec<Article>> {
        let tables = self.lock()?;
        Ok(tables
            .articles_where(|a| a.published && tables.followers.contains(&(user, a.author_id))))
    }
}
