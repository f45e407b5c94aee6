use actix_cors::Cors;
use actix_web::{middleware::Compress, App, HttpServer};
use utoipa_swagger_ui::SwaggerUi;

mod assignments;
mod auth;
mod error;
mod forum;
mod gateway;
mod idp;
mod models;
mod openapi;
mod repo;
mod roles;
mod routes;
mod security;
mod session;
mod tenant;

use idp::IdentityProvider;
use openapi::ApiDoc;
use routes::{config, AppState};
use security::SecurityHeaders;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_actix_web::TracingLogger;
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // .env is only read in debug builds; deployments configure the
    // environment externally.
    if cfg!(debug_assertions) {
        let _ = dotenv::dotenv();
    }

    validate_env_vars();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .init();

    info!("Bootstrapping aula backend");

    #[cfg(all(feature = "inmem-store", not(feature = "rest-store")))]
    let repo = repo::inmem::InMemRepo::new();
    #[cfg(all(feature = "inmem-store", not(feature = "rest-store")))]
    info!("Using in-memory repository backend");

    #[cfg(feature = "rest-store")]
    let repo = match gateway::rest::RestRepo::from_env() {
        Ok(repo) => {
            info!("Using REST gateway repository backend");
            repo
        }
        Err(e) => {
            eprintln!("REST gateway configuration error: {e}");
            std::process::exit(1);
        }
    };

    let idp = match IdentityProvider::from_env() {
        Ok(idp) => Arc::new(idp),
        Err(e) => {
            eprintln!("Identity provider configuration error: {e}");
            std::process::exit(1);
        }
    };

    let openapi = ApiDoc::openapi();
    let state = AppState { repo: Arc::new(repo), idp };

    let server = HttpServer::new(move || {
        let cors = {
            let mut c = Cors::default()
                .allowed_origin("http://localhost:5173")
                .allowed_origin("http://127.0.0.1:5173")
                .allowed_origin("http://localhost:3000")
                .allowed_origin("http://127.0.0.1:3000")
                .allow_any_header()
                .allowed_methods(["GET", "POST", "PUT", "DELETE", "OPTIONS"])
                .supports_credentials()
                .max_age(3600);
            if let Ok(front) = std::env::var("FRONTEND_URL") {
                c = c.allowed_origin(&front);
            }
            c
        };

        App::new()
            .wrap(TracingLogger::default())
            .wrap(Compress::default())
            .wrap(SecurityHeaders::from_env())
            .wrap(cors)
            .configure(config)
            .service(SwaggerUi::new("/docs").url("/docs/openapi.json", openapi.clone()))
            .app_data(actix_web::web::Data::new(state.clone()))
    })
    .bind(("0.0.0.0", 8080))?;

    info!("Listening on http://0.0.0.0:8080");

    server.run().await
}

fn validate_env_vars() {
    use std::env;

    let mut missing = Vec::new();
    for var in ["JWT_SECRET", "SUPABASE_URL", "SUPABASE_ANON_KEY"] {
        if env::var(var).is_err() {
            missing.push(var);
        }
    }
    if !missing.is_empty() {
        eprintln!("Missing required environment variables: {missing:?}");
        eprintln!("Copy .env.example to .env and configure it");
        std::process::exit(1);
    }

    if let Ok(secret) = env::var("JWT_SECRET") {
        if secret.len() < 32 {
            eprintln!("JWT_SECRET must be at least 32 characters long");
            std::process::exit(1);
        }
    }
}
