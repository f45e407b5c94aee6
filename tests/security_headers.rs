#![cfg(feature = "inmem-store")]

use actix_web::{test, App};
use aula::idp::IdentityProvider;
use aula::repo::inmem::InMemRepo;
use aula::routes::{config, AppState};
use aula::security::SecurityHeaders;
use serial_test::serial;
use std::sync::Arc;

#[actix_web::test]
#[serial]
async fn api_responses_carry_hardening_headers() {
    std::env::set_var("JWT_SECRET", "test-secret-must-be-32-bytes-long!!");
    std::env::remove_var("ENABLE_HSTS");
    let state = AppState {
        repo: Arc::new(InMemRepo::new()),
        idp: Arc::new(IdentityProvider::new("http://127.0.0.1:1", "test-anon-key")),
    };
    let app = test::init_service(
        App::new()
            .wrap(SecurityHeaders::from_env())
            .app_data(actix_web::web::Data::new(state))
            .configure(config),
    )
    .await;

    let req = test::TestRequest::get().uri("/health").to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());
    let headers = resp.headers();
    assert_eq!(
        headers.get("content-security-policy").unwrap(),
        "default-src 'none'; base-uri 'none'; frame-ancestors 'none'"
    );
    assert_eq!(headers.get("x-content-type-options").unwrap(), "nosniff");
    assert_eq!(headers.get("x-frame-options").unwrap(), "DENY");
    assert_eq!(headers.get("referrer-policy").unwrap(), "no-referrer");
    assert!(headers.get("strict-transport-security").is_none());
}

#[actix_web::test]
#[serial]
async fn hsts_enabled_from_env() {
    std::env::set_var("JWT_SECRET", "test-secret-must-be-32-bytes-long!!");
    std::env::set_var("ENABLE_HSTS", "1");
    let state = AppState {
        repo: Arc::new(InMemRepo::new()),
        idp: Arc::new(IdentityProvider::new("http://127.0.0.1:1", "test-anon-key")),
    };
    let app = test::init_service(
        App::new()
            .wrap(SecurityHeaders::from_env())
            .app_data(actix_web::web::Data::new(state))
            .configure(config),
    )
    .await;

    let req = test::TestRequest::get().uri("/health").to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.headers().get("strict-transport-security").is_some());
    std::env::remove_var("ENABLE_HSTS");
}
