mod common;

use rocket::http::Status;
use serde_json::{json, Value};

use common::*;

#[test]
fn sign_up_validates_and_rejects_taken_logins() {
    let client = client();

    let response = post_json(
        &client,
        "/users/signup",
        json!({ "login": "alice", "fullname": "Alice", "password": PASSWORD }),
    )
    .dispatch();
    assert_eq!(response.status(), Status::Created);
    let body: Value = response.into_json().unwrap();
    assert_eq!(body["login"], "alice");
    assert_eq!(body["fullname"], "Alice");
    assert_eq!(body["followers"], 0);
    assert!(body.get("password").is_none());
    assert!(body.get("password_hash").is_none());

    let taken = post_json(
        &client,
        "/users/signup",
        json!({ "login": "alice", "fullname": "Other", "password": PASSWORD }),
    )
    .dispatch();
    assert_eq!(taken.status(), Status::Conflict);

    let invalid = post_json(
        &client,
        "/users/signup",
        json!({ "login": "a b", "fullname": "", "password": "123" }),
    )
    .dispatch();
    assert_eq!(invalid.status(), Status::BadRequest);
    let body: Value = invalid.into_json().unwrap();
    for field in ["login", "fullname", "password"] {
        assert!(body["errors"][field].is_array(), "no error for {}", field);
    }

    let missing_field = post_json(&client, "/users/signup", json!({ "login": "carol" })).dispatch();
    assert_eq!(missing_field.status(), Status::BadRequest);
}

#[test]
fn listing_and_viewing_users() {
    let client = client();
    let (alice_id, alice) = user(&client, "alice");
    let (_, bob) = user(&client, "bob");
    create_article(&client, &alice, "Public", true);
    create_article(&client, &alice, "Private", false);

    let response = client.get("/users").dispatch();
    assert_eq!(response.status(), Status::Ok);
    let body: Value = response.into_json().unwrap();
    let users = body["users"].as_array().unwrap();
    assert_eq!(users.len(), 2);
    assert!(users.iter().all(|u| u.get("articles").is_none()));

    let uri = format!("/users/{}", alice_id);
    let anonymous: Value = client.get(uri.as_str()).dispatch().into_json().unwrap();
    assert_eq!(anonymous["articles"].as_array().unwrap().len(), 1);

    let other: Value = with_access(client.get(uri.as_str()), &bob)
        .dispatch()
        .into_json()
        .unwrap();
    assert_eq!(other["articles"].as_array().unwrap().len(), 1);

    let owner: Value = with_access(client.get(uri.as_str()), &alice)
        .dispatch()
        .into_json()
        .unwrap();
    assert_eq!(owner["articles"].as_array().unwrap().len(), 2);

    assert_eq!(client.get("/users/4242").dispatch().status(), Status::NotFound);
}

#[test]
fn updating_the_account() {
    let client = client();
    let (_, alice) = user(&client, "alice");

    let edit = json!({ "fullname": "Alice Liddell", "password": "new-password" }).to_string();
    let response = with_access(client.put("/users").body(edit), &alice).dispatch();
    assert_eq!(response.status(), Status::Ok);
    let body: Value = response.into_json().unwrap();
    assert_eq!(body["fullname"], "Alice Liddell");

    let old = post_json(
        &client,
        "/users/signin",
        json!({ "login": "alice", "password": PASSWORD }),
    )
    .dispatch();
    assert_eq!(old.status(), Status::Unauthorized);

    let new = post_json(
        &client,
        "/users/signin",
        json!({ "login": "alice", "password": "new-password" }),
    )
    .dispatch();
    assert_eq!(new.status(), Status::Ok);

    let short = json!({ "password": "1" }).to_string();
    let response = with_access(client.put("/users").body(short), &alice).dispatch();
    assert_eq!(response.status(), Status::BadRequest);

    let anonymous = client.put("/users").body("{}").dispatch();
    assert_eq!(anonymous.status(), Status::Unauthorized);
}

#[test]
fn following_users() {
    let client = client();
    let (alice_id, alice) = user(&client, "alice");
    let (bob_id, bob) = user(&client, "bob");

    let follow = |uri: String| with_access(client.post(uri), &alice).dispatch();

    let response = follow(format!("/users/follow/{}", bob_id));
    assert_eq!(response.status(), Status::Ok);
    let body: Value = response.into_json().unwrap();
    assert_eq!(body["id"], bob_id);
    assert_eq!(body["followers"], 1);

    assert_eq!(
        follow(format!("/users/follow/{}", bob_id)).status(),
        Status::Conflict
    );
    assert_eq!(
        follow(format!("/users/follow/{}", alice_id)).status(),
        Status::BadRequest
    );
    assert_eq!(
        follow("/users/follow/4242".to_string()).status(),
        Status::NotFound
    );

    let is_followed: Value = with_access(
        client.get(format!("/users/{}/isfollowed", bob_id)),
        &alice,
    )
    .dispatch()
    .into_json()
    .unwrap();
    assert_eq!(is_followed["followed"], true);

    let reverse: Value = with_access(client.get(format!("/users/{}/isfollowed", alice_id)), &bob)
        .dispatch()
        .into_json()
        .unwrap();
    assert_eq!(reverse["followed"], false);

    let followers: Value = client
        .get(format!("/users/{}/followers", bob_id))
        .dispatch()
        .into_json()
        .unwrap();
    assert_eq!(followers["followers"][0]["id"], alice_id);

    let following: Value = client
        .get(format!("/users/{}/following", alice_id))
        .dispatch()
        .into_json()
        .unwrap();
    assert_eq!(following["following"][0]["id"], bob_id);

    let me: Value = with_access(client.get("/users/me"), &alice)
        .dispatch()
        .into_json()
        .unwrap();
    assert_eq!(me["following"], 1);
    assert_eq!(me["followers"], 0);

    assert_eq!(
        follow(format!("/users/unfollow/{}", bob_id)).status(),
        Status::Ok
    );
    assert_eq!(
        follow(format!("/users/unfollow/{}", bob_id)).status(),
        Status::NotFound
    );
}

#[test]
fn deleting_the_account() {
    let client = client();
    let (alice_id, alice) = user(&client, "alice");
    let (bob_id, bob) = user(&client, "bob");
    let article = create_article(&client, &alice, "Soon gone", true);
    with_access(client.post(format!("/users/follow/{}", alice_id)), &bob).dispatch();

    let response = with_access(client.delete("/users"), &alice).dispatch();
    assert_eq!(response.status(), Status::Ok);
    let body: Value = response.into_json().unwrap();
    assert_eq!(body["login"], "alice");

    assert_eq!(
        client.get(format!("/users/{}", alice_id)).dispatch().status(),
        Status::NotFound
    );
    assert_eq!(
        client.get(format!("/articles/{}", article)).dispatch().status(),
        Status::NotFound
    );
    let bob_view: Value = client
        .get(format!("/users/{}", bob_id))
        .dispatch()
        .into_json()
        .unwrap();
    assert_eq!(bob_view["following"], 0);

    // a still-valid token of a deleted account no longer resolves to a user
    let me = with_access(client.get("/users/me"), &alice).dispatch();
    assert_eq!(me.status(), Status::NotFound);
}

#[test]
fn deleted_account_cannot_write() {
    let client = client();
    let (_, alice) = user(&client, "alice");
    let (bob_id, bob) = user(&client, "bob");
    let article = create_article(&client, &bob, "Bob's post", true);

    let response = with_access(client.delete("/users"), &alice).dispatch();
    assert_eq!(response.status(), Status::Ok);

    let create = with_access(
        post_json(&client, "/articles", json!({ "title": "Ghost", "content": "boo" })),
        &alice,
    )
    .dispatch();
    assert_eq!(create.status(), Status::NotFound);

    let follow = with_access(client.post(format!("/users/follow/{}", bob_id)), &alice).dispatch();
    assert_eq!(follow.status(), Status::NotFound);

    let save = with_access(client.post(format!("/articles/save/{}", article)), &alice).dispatch();
    assert_eq!(save.status(), Status::NotFound);
}

#[test]
fn unknown_routes_answer_json() {
    let client = client();
    let response = client.get("/nowhere").dispatch();
    assert_eq!(response.status(), Status::NotFound);
    let body: Value = response.into_json().unwrap();
    assert!(body["message"].is_string());
}

#[test]
fn root_greets() {
    let client = client();
    let response = client.get("/").dispatch();
    assert_eq!(response.status(), Status::Ok);
    let body: Value = response.into_json().unwrap();
    assert_eq!(body["message"], "hello world!");
}
