use std::io;
use std::sync::Arc;

use actix_cors::Cors;
use actix_web::http::header;
use actix_web::{middleware, web, App, HttpServer};

mod cache;
mod config;
mod error;
mod handlers;
mod memory;
mod models;
mod password;
mod query;
mod routes;
mod schema;
mod store;
#[cfg(test)]
mod test_support;

use crate::cache::FoodCache;
use crate::config::{Config, StoreBackend};
use crate::memory::MemoryStore;
use crate::password::PasswordHasher;
use crate::query::MongoStore;
use crate::store::Store;

const CORS_MAX_AGE_SECONDS: usize = 3600;

fn cors(origins: &[String]) -> Cors {
    origins
        .iter()
        .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
        .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
        .allowed_headers(vec![
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::ACCEPT,
            header::ORIGIN,
        ])
        .allowed_header("x-requested-with")
        .supports_credentials()
        .max_age(CORS_MAX_AGE_SECONDS)
}

async fn open_store(config: &Config) -> io::Result<Store> {
    let store = match config.store_backend {
        StoreBackend::Mongo => {
            let mongo = MongoStore::connect(&config.mongo_url, &config.mongo_database)
                .await
                .map_err(|e| {
                    log::error!("could not connect to MongoDB at {}: {e}", config.mongo_url);
                    io::Error::new(io::ErrorKind::Other, e)
                })?;
            log::info!("connected to MongoDB database {}", config.mongo_database);
            Store::new(Arc::new(mongo))
        }
        StoreBackend::Memory => {
            log::warn!("using the in-memory store, data is lost on restart");
            Store::new(Arc::new(MemoryStore::default()))
        }
    };
    Ok(store.with_timeout(config.store_timeout))
}

fn open_cache(redis_url: Option<&str>) -> FoodCache {
    let Some(url) = redis_url else {
        return FoodCache::disabled();
    };
    match FoodCache::connect(url) {
        Ok(cache) => cache,
        Err(e) => {
            log::warn!("redis unavailable, food list cache disabled: {e}");
            FoodCache::disabled()
        }
    }
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = Config::load().map_err(|e| {
        log::error!("{e}");
        io::Error::new(io::ErrorKind::InvalidInput, e)
    })?;

    let store = open_store(&config).await?;
    let cache = open_cache(config.redis_url.as_deref());
    log::info!("food list cache enabled: {}", cache.is_enabled());
    let hasher = PasswordHasher::new(config.bcrypt_cost);
    let origins = config.cors_origins.clone();

    log::info!("starting HTTP server at http://{}:{}", config.host, config.port);

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(store.clone()))
            .app_data(web::Data::new(cache.clone()))
            .app_data(web::Data::new(hasher))
            .wrap(cors(&origins))
            .wrap(middleware::Logger::default())
            .configure(routes::configure)
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await
}

#[cfg(test)]
mod tests {
    use actix_web::dev::Service;
    use actix_web::http::{header, Method, StatusCode};
    use actix_web::{test, App};

    use super::*;
    use crate::test_support::{memory_store, TEST_BCRYPT_COST};

    const ALLOWED: &str = "http://localhost:3000";

    macro_rules! init_cors_app {
        () => {
            test::init_service(
                App::new()
                    .app_data(web::Data::new(memory_store()))
                    .app_data(web::Data::new(FoodCache::disabled()))
                    .app_data(web::Data::new(PasswordHasher::new(TEST_BCRYPT_COST)))
                    .wrap(cors(&[
                        "http://localhost:3000".to_string(),
                        "http://localhost:3001".to_string(),
                    ]))
                    .configure(routes::configure),
            )
            .await
        };
    }

    fn preflight(origin: &str) -> test::TestRequest {
        test::TestRequest::default()
            .method(Method::OPTIONS)
            .uri("/api/foods")
            .insert_header((header::ORIGIN, origin))
            .insert_header((header::ACCESS_CONTROL_REQUEST_METHOD, "PUT"))
            .insert_header((header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type"))
    }

    #[actix_web::test]
    async fn preflight_from_allowed_origin_accepts_credentials() {
        let app = init_cors_app!();

        let resp = test::call_service(&app, preflight(ALLOWED).to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let headers = resp.headers();
        assert_eq!(headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(), ALLOWED);
        assert_eq!(headers.get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS).unwrap(), "true");

        let methods = headers
            .get(header::ACCESS_CONTROL_ALLOW_METHODS)
            .unwrap()
            .to_str()
            .unwrap();
        for method in ["GET", "POST", "PUT", "DELETE", "OPTIONS"] {
            assert!(methods.contains(method), "{method} missing from {methods}");
        }
    }

    #[actix_web::test]
    async fn simple_request_from_allowed_origin_is_tagged() {
        let app = init_cors_app!();

        let req = test::TestRequest::get()
            .uri("/api/foods")
            .insert_header((header::ORIGIN, "http://localhost:3001"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "http://localhost:3001"
        );
    }

    #[actix_web::test]
    async fn unknown_origin_is_rejected() {
        let app = init_cors_app!();

        for req in [
            preflight("http://evil.example").to_request(),
            test::TestRequest::get()
                .uri("/api/foods")
                .insert_header((header::ORIGIN, "http://evil.example"))
                .to_request(),
        ] {
            let status = match app.call(req).await {
                Ok(resp) => {
                    assert!(resp.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
                    resp.status()
                }
                Err(err) => err.as_response_error().status_code(),
            };
            assert!(status.is_client_error(), "got {status}");
        }
    }
}
