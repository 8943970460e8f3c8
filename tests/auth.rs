mod common;

use blog::auth::{TokenKind, TokenPair, TokenSecrets, ACCESS_COOKIE, REFRESH_COOKIE};
use chrono::{Duration, Utc};
use rocket::http::{Cookie, Status};
use serde_json::{json, Value};

use common::*;

#[test]
fn sign_in_issues_a_pair_in_body_and_cookies() {
    let client = client();
    let id = sign_up(&client, "alice");

    let response = post_json(
        &client,
        "/users/signin",
        json!({ "login": "alice", "password": PASSWORD }),
    )
    .dispatch();
    assert_eq!(response.status(), Status::Ok);

    let access = response.cookies().get(ACCESS_COOKIE).expect("access cookie").clone();
    let refresh = response.cookies().get(REFRESH_COOKIE).expect("refresh cookie").clone();
    assert_eq!(access.path(), Some("/"));
    assert_eq!(refresh.path(), Some("/"));
    assert_eq!(access.max_age(), Some(rocket::time::Duration::minutes(15)));
    assert_eq!(refresh.max_age(), Some(rocket::time::Duration::days(21)));

    let body: Value = response.into_json().unwrap();
    assert_eq!(body["access_token"], access.value());
    assert_eq!(body["refresh_token"], refresh.value());

    let secrets = secrets();
    let claims = secrets.verify(TokenKind::Access, access.value()).unwrap();
    assert_eq!(claims.user_id(), Ok(id));
    let claims = secrets.verify(TokenKind::Refresh, refresh.value()).unwrap();
    assert_eq!(claims.user_id(), Ok(id));
}

#[test]
fn sign_in_failures() {
    let client = client();
    sign_up(&client, "alice");

    let unknown = post_json(
        &client,
        "/users/signin",
        json!({ "login": "nobody", "password": PASSWORD }),
    )
    .dispatch();
    assert_eq!(unknown.status(), Status::NotFound);

    let wrong = post_json(
        &client,
        "/users/signin",
        json!({ "login": "alice", "password": "not-the-password" }),
    )
    .dispatch();
    assert_eq!(wrong.status(), Status::Unauthorized);
    assert!(wrong.cookies().get(ACCESS_COOKIE).is_none());

    let malformed = client
        .post("/users/signin")
        .header(rocket::http::ContentType::JSON)
        .body("{ not json")
        .dispatch();
    assert_eq!(malformed.status(), Status::BadRequest);
    let body: Value = malformed.into_json().unwrap();
    assert!(body["message"].is_string());
}

#[test]
fn refresh_yields_a_pair_for_the_same_subject() {
    let client = client();
    let (id, pair) = user(&client, "alice");

    let response = with_refresh(client.post("/users/refresh"), &pair).dispatch();
    assert_eq!(response.status(), Status::Ok);
    assert!(response.cookies().get(ACCESS_COOKIE).is_some());
    let body: Value = response.into_json().unwrap();

    let secrets = secrets();
    let access = secrets
        .verify(TokenKind::Access, body["access_token"].as_str().unwrap())
        .unwrap();
    let refresh = secrets
        .verify(TokenKind::Refresh, body["refresh_token"].as_str().unwrap())
        .unwrap();
    assert_eq!(access.user_id(), Ok(id));
    assert_eq!(refresh.user_id(), Ok(id));

    // the previous refresh token is not revoked
    let again = with_refresh(client.post("/users/refresh"), &pair).dispatch();
    assert_eq!(again.status(), Status::Ok);
}

#[test]
fn refresh_rejects_access_tokens_and_missing_cookies() {
    let client = client();
    let (_, pair) = user(&client, "alice");

    let missing = client.post("/users/refresh").dispatch();
    assert_eq!(missing.status(), Status::Unauthorized);

    let swapped = client
        .post("/users/refresh")
        .cookie(Cookie::new(REFRESH_COOKIE, pair.access_token.clone()))
        .dispatch();
    assert_eq!(swapped.status(), Status::Unauthorized);
}

#[test]
fn protected_routes_reject_bad_tokens() {
    let client = client();
    let (id, _) = user(&client, "alice");

    assert_eq!(client.get("/users/me").dispatch().status(), Status::Unauthorized);

    let foreign = TokenSecrets::new("someone-elses-secret", "and-another")
        .issue_pair(&id.to_string())
        .unwrap();
    let response = with_access(client.get("/users/me"), &foreign).dispatch();
    assert_eq!(response.status(), Status::Unauthorized);

    let expired = TokenPair {
        access_token: secrets()
            .issue_expiring(TokenKind::Access, &id.to_string(), Utc::now() - Duration::minutes(1))
            .unwrap(),
        refresh_token: String::new(),
    };
    let response = with_access(client.get("/users/me"), &expired).dispatch();
    assert_eq!(response.status(), Status::Unauthorized);

    let garbage = client
        .get("/users/me")
        .cookie(Cookie::new(ACCESS_COOKIE, "garbage"))
        .dispatch();
    assert_eq!(garbage.status(), Status::BadRequest);
}

#[test]
fn me_returns_the_requester() {
    let client = client();
    let (id, pair) = user(&client, "alice");

    let response = with_access(client.get("/users/me"), &pair).dispatch();
    assert_eq!(response.status(), Status::Ok);
    let body: Value = response.into_json().unwrap();
    assert_eq!(body["id"], id);
    assert_eq!(body["login"], "alice");
    assert!(body.get("password").is_none());
    assert!(body.get("password_hash").is_none());
}
