#[macro_use]
extern crate error_chain;

use rocket::http::Status;
use rocket::request::Request;
use rocket::serde::json::Json;
use rocket::{catch, catchers, get, routes, Build, Rocket};
use serde_json::{json, Value};

pub mod articles;
pub mod auth;
pub mod config;
pub mod db;
pub mod profile;
pub mod types;
pub mod users;
mod utils;

use crate::config::Config;
use crate::db::Db;

#[get("/")]
fn index() -> Json<Value> {
    Json(json!({ "message": "hello world!" }))
}

#[catch(404)]
fn not_found(_req: &Request<'_>) -> Json<Value> {
    Json(json!({ "message": "entity not found" }))
}

#[catch(default)]
fn default_catcher(status: Status, _req: &Request<'_>) -> Json<Value> {
    let message = status.reason().unwrap_or("unexpected error");
    Json(json!({ "message": message }))
}

/// Assembles the server around an injected store and configuration.
pub fn server(store: Db, config: Config) -> Rocket<Build> {
    rocket::build()
        .manage(store)
        .manage(config)
        .mount("/", routes![index])
        .mount(
            "/users",
            routes![
                users::list,
                users::get,
                users::signup,
                users::signin,
                users::refresh,
                users::me,
                users::update,
                users::delete,
                profile::follow,
                profile::unfollow,
                profile::followers,
                profile::following,
                profile::is_followed,
            ],
        )
        .mount(
            "/articles",
            routes![
                articles::list,
                articles::get,
                articles::create,
                articles::update,
                articles::delete,
                articles::save,
                articles::unsave,
                articles::saves,
                articles::is_saved,
                articles::for_you,
            ],
        )
        .register("/", catchers![not_found, default_catcher])
}
