mod config;
mod domain;
mod error;
mod infra;
mod models;
mod state;

use config::{Config, ConfigError};
use infra::routes::{api_routes, json_catchers, short_link_routes};
use infra::RepoError;
use rocket::fairing::{Fairing, Info, Kind};
use rocket::http::Header;
use rocket::{Build, Request, Response, Rocket};
use state::AppState;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

#[macro_use]
extern crate rocket;
pub struct CORS;

#[rocket::async_trait]
impl Fairing for CORS {
    fn info(&self) -> Info {
        Info {
            name: "Attaching CORS headers to responses",
            kind: Kind::Response,
        }
    }

    async fn on_response<'r>(&self, _request: &'r Request<'_>, response: &mut Response<'r>) {
        response.set_header(Header::new("Access-Control-Allow-Origin", "*"));
        response.set_header(Header::new(
            "Access-Control-Allow-Methods",
            "POST, GET, DELETE, OPTIONS",
        ));
        response.set_header(Header::new("Access-Control-Allow-Headers", "*"));
        response.set_header(Header::new("Access-Control-Allow-Credentials", "true"));
    }
}

#[derive(Error, Debug)]
enum StartupError {
    #[error("configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("storage: {0}")]
    Repo(#[from] RepoError),
    #[error("server: {0}")]
    Launch(#[from] rocket::Error),
}

pub fn build(state: AppState) -> Rocket<Build> {
    rocket::build()
        .manage(state)
        .mount("/api", api_routes())
        .mount("/", short_link_routes())
        .register("/", json_catchers())
        .attach(CORS)
}

#[rocket::main]
async fn main() -> Result<(), StartupError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = Config::load()?;
    let state = AppState::from_config(&config)?;
    let _rocket = build(state).launch().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::MemoryRep;
    use rocket::http::Status;
    use rocket::local::blocking::Client;

    #[test]
    fn test_cors_headers_attached() {
        let client = Client::tracked(build(AppState::new(MemoryRep::new(), "http://test.local")))
            .expect("valid rocket instance");
        let response = client.get("/api/tags").dispatch();
        assert_eq!(response.status(), Status::Ok);
        assert_eq!(
            response.headers().get_one("Access-Control-Allow-Origin"),
            Some("*")
        );
    }

    #[test]
    fn test_unknown_route_is_json_404() {
        let client = Client::tracked(build(AppState::new(MemoryRep::new(), "http://test.local")))
            .expect("valid rocket instance");
        let response = client.get("/api/nothing/here").dispatch();
        assert_eq!(response.status(), Status::NotFound);
        assert_eq!(response.content_type(), Some(rocket::http::ContentType::JSON));
    }
}
