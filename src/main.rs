#![feature(proc_macro_hygiene, decl_macro)]


#[macro_use] extern crate rocket;
#[macro_use] extern crate diesel;
#[macro_use] extern crate log;


mod auth;
mod config;
mod db;
mod error;
mod geo;
mod help_request_route;
mod logger;
mod pagination;
mod reply_route;
mod util;


use std::process;
use rocket::{
    Rocket,
    request::Request,
    response::content::Json,
};

use config::Settings;
use error::error_json;


#[get("/")]
fn index() -> &'static str {
    "Help Me Server"
}

#[catch(400)]
fn bad_request() -> Json<String> {
    error_json("Bad request.")
}

#[catch(401)]
fn unauthorized() -> Json<String> {
    error_json("Authentication credentials were not provided or are invalid.")
}

#[catch(404)]
fn not_found(req: &Request) -> Json<String> {
    error_json(&format!("Not found: {}", req.uri()))
}

#[catch(422)]
fn unprocessable() -> Json<String> {
    error_json("Invalid form")
}

#[catch(500)]
fn internal_error() -> Json<String> {
    error_json("A server error occurred.")
}


fn rocket(settings: Settings) -> Rocket {
    rocket::ignite()
        .manage(settings)
        .mount("/", routes![index])
        .mount("/", routes![
            help_request_route::list_help_requests,
            help_request_route::get_help_request,
            help_request_route::post_help_request,
            help_request_route::put_help_request,
            help_request_route::patch_help_request,
            help_request_route::delete_help_request,
        ])
        .mount("/", routes![
            reply_route::get_replies,
            reply_route::post_reply,
            reply_route::delete_reply,
        ])
        .register(catchers![
            bad_request,
            unauthorized,
            not_found,
            unprocessable,
            internal_error,
        ])
}


fn main() {
    let settings = match Settings::from_env() {
        Ok(settings) => settings,
        Err(err) => {
            eprintln!("Configuration error: {}", err);
            process::exit(1);
        },
    };

    if let Err(err) = logger::init(settings.log_level) {
        eprintln!("Fail to init logger: {}", err);
    }

    let dsn = settings.sentry_dsn.as_ref().and_then(|dsn| {
        dsn.parse::<sentry::types::Dsn>()
            .map_err(|err| warn!("Invalid SENTRY_DSN: {}", err))
            .ok()
    });
    let _sentry = sentry::init(sentry::ClientOptions {
        dsn,
        ..Default::default()
    });

    info!("Default radius {} miles, page size {} (max {})",
        settings.default_radius.miles(), settings.page_size, settings.max_page_size);

    let err = rocket(settings).launch();
    error!("Launch failed: {}", err);
    process::exit(1);
}
