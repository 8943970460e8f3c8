#![allow(dead_code)]

use blog::auth::{TokenPair, TokenSecrets, ACCESS_COOKIE, REFRESH_COOKIE};
use blog::config::Config;
use blog::db::MemoryStore;
use rocket::http::{ContentType, Cookie, Status};
use rocket::local::blocking::{Client, LocalRequest};
use serde_json::{json, Value};

pub const ACCESS_SECRET: &str = "test-access-secret";
pub const REFRESH_SECRET: &str = "test-refresh-secret";
pub const PASSWORD: &str = "correct-horse";

pub fn secrets() -> TokenSecrets {
    TokenSecrets::new(ACCESS_SECRET, REFRESH_SECRET)
}

pub fn client() -> Client {
    let mut config = Config::new("", secrets());
    config.bcrypt_cost = 4;
    Client::untracked(blog::server(Box::new(MemoryStore::new()), config))
        .expect("valid rocket instance")
}

pub fn post_json<'c>(client: &'c Client, uri: &'c str, body: Value) -> LocalRequest<'c> {
    client
        .post(uri)
        .header(ContentType::JSON)
        .body(body.to_string())
}

pub fn with_access<'c>(request: LocalRequest<'c>, pair: &TokenPair) -> LocalRequest<'c> {
    request.cookie(Cookie::new(ACCESS_COOKIE, pair.access_token.clone()))
}

pub fn with_refresh<'c>(request: LocalRequest<'c>, pair: &TokenPair) -> LocalRequest<'c> {
    request.cookie(Cookie::new(REFRESH_COOKIE, pair.refresh_token.clone()))
}

/// Signs a user up and returns their id.
pub fn sign_up(client: &Client, login: &str) -> i32 {
    let response = post_json(
        client,
        "/users/signup",
        json!({ "login": login, "fullname": format!("{} Example", login), "password": PASSWORD }),
    )
    .dispatch();
    assert_eq!(response.status(), Status::Created);
    let body: Value = response.into_json().expect("user body");
    body["id"].as_i64().expect("user id") as i32
}

pub fn sign_in(client: &Client, login: &str) -> TokenPair {
    let response = post_json(
        client,
        "/users/signin",
        json!({ "login": login, "password": PASSWORD }),
    )
    .dispatch();
    assert_eq!(response.status(), Status::Ok);
    let body: Value = response.into_json().expect("token body");
    TokenPair {
        access_token: body["access_token"].as_str().expect("access token").to_string(),
        refresh_token: body["refresh_token"].as_str().expect("refresh token").to_string(),
    }
}

/// Signs up and in; returns the user id and their tokens.
pub fn user(client: &Client, login: &str) -> (i32, TokenPair) {
    let id = sign_up(client, login);
    (id, sign_in(client, login))
}

/// Creates an article as `pair`'s user and returns its id.
pub fn create_article(client: &Client, pair: &TokenPair, title: &str, published: bool) -> i32 {
    let request = post_json(
        client,
        "/articles",
        json!({ "title": title, "content": "Some content", "published": published }),
    );
    let response = with_access(request, pair).dispatch();
    assert_eq!(response.status(), Status::Created);
    let body: Value = response.into_json().expect("article body");
    body["id"].as_i64().expect("article id") as i32
}
