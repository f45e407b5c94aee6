#![cfg(feature = "inmem-store")]

use actix_web::{test, App};
use aula::auth::create_jwt;
use aula::idp::IdentityProvider;
use aula::models::Role;
use aula::repo::inmem::InMemRepo;
use aula::routes::{config, AppState};
use aula::tenant::Tenant;
use serde_json::{json, Value};
use serial_test::serial;
use std::sync::Arc;

fn set_secret() {
    std::env::set_var("JWT_SECRET", "test-secret-must-be-32-bytes-long!!");
}

fn state_with(repo: &InMemRepo) -> AppState {
    AppState {
        repo: Arc::new(repo.clone()),
        idp: Arc::new(IdentityProvider::new("http://127.0.0.1:1", "test-anon-key")),
    }
}

async fn body_json(resp: actix_web::dev::ServiceResponse) -> Value {
    let body = test::read_body(resp).await;
    serde_json::from_slice(&body).expect("json body")
}

fn bearer(email: &str) -> (&'static str, String) {
    ("Authorization", format!("Bearer {}", create_jwt("uid", email, None).unwrap()))
}

#[actix_web::test]
#[serial]
async fn mi_tenant_lists_only_the_callers_tenant() {
    set_secret();
    let repo = InMemRepo::new();
    repo.seed_user(Tenant::Ucb, "Ana", "Perez", "ana@ucb.edu.bo", Role::Director);
    repo.seed_user(Tenant::Ucb, "Luis", "Soto", "luis@ucb.edu.bo", Role::Estudiante);
    repo.seed_user(Tenant::Gmail, "Maria", "Lopez", "maria@gmail.com", Role::Estudiante);
    let app = test::init_service(
        App::new()
            .app_data(actix_web::web::Data::new(state_with(&repo)))
            .configure(config),
    )
    .await;

    let req = test::TestRequest::get()
        .uri("/api/usuarios/mi-tenant")
        .insert_header(bearer("ana@ucb.edu.bo"))
        .to_request();
    let v = body_json(test::call_service(&app, req).await).await;
    assert_eq!(v["tenant"], "ucb");
    assert_eq!(v["total"], 2);
    let emails: Vec<&str> = v["usuarios"]
        .as_array()
        .unwrap()
        .iter()
        .map(|u| u["email"].as_str().unwrap())
        .collect();
    assert!(!emails.contains(&"maria@gmail.com"));
}

#[actix_web::test]
#[serial]
async fn filtrar_by_role() {
    set_secret();
    let repo = InMemRepo::new();
    repo.seed_user(Tenant::Ucb, "Ana", "Perez", "ana@ucb.edu.bo", Role::Profesor);
    repo.seed_user(Tenant::Ucb, "Luis", "Soto", "luis@ucb.edu.bo", Role::Estudiante);
    let app = test::init_service(
        App::new()
            .app_data(actix_web::web::Data::new(state_with(&repo)))
            .configure(config),
    )
    .await;

    let req = test::TestRequest::get()
        .uri("/api/usuarios/mi-tenant/filtrar?rol=Profesor")
        .insert_header(bearer("ana@ucb.edu.bo"))
        .to_request();
    let v = body_json(test::call_service(&app, req).await).await;
    assert_eq!(v["total"], 1);
    assert_eq!(v["usuarios"][0]["rol"], "Profesor");
    assert_eq!(v["filtroRol"], "Profesor");

    let req = test::TestRequest::get()
        .uri("/api/usuarios/mi-tenant/filtrar?rol=Pirata")
        .insert_header(bearer("ana@ucb.edu.bo"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
}

#[actix_web::test]
#[serial]
async fn update_role_validates_and_persists() {
    set_secret();
    let repo = InMemRepo::new();
    repo.seed_user(Tenant::Ucb, "Ana", "Perez", "ana@ucb.edu.bo", Role::Director);
    let target = repo.seed_user(Tenant::Ucb, "Luis", "Soto", "luis@ucb.edu.bo", Role::Estudiante);
    let app = test::init_service(
        App::new()
            .app_data(actix_web::web::Data::new(state_with(&repo)))
            .configure(config),
    )
    .await;

    // unknown role never reaches the store
    let req = test::TestRequest::put()
        .uri(&format!("/api/usuarios/{}/rol", target.id))
        .insert_header(bearer("ana@ucb.edu.bo"))
        .set_json(&json!({ "rol": "SuperAdmin" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 400);

    let req = test::TestRequest::put()
        .uri(&format!("/api/usuarios/{}/rol", target.id))
        .insert_header(bearer("ana@ucb.edu.bo"))
        .set_json(&json!({ "rol": "Profesor" }))
        .to_request();
    let v = body_json(test::call_service(&app, req).await).await;
    assert_eq!(v["usuario"]["rol"], "Profesor");

    // unknown id in the caller's tenant
    let req = test::TestRequest::put()
        .uri("/api/usuarios/9999/rol")
        .insert_header(bearer("ana@ucb.edu.bo"))
        .set_json(&json!({ "rol": "Profesor" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 404);
}

#[actix_web::test]
#[serial]
async fn crear_requires_fields_and_same_tenant() {
    set_secret();
    let repo = InMemRepo::new();
    repo.seed_user(Tenant::Ucb, "Ana", "Perez", "ana@ucb.edu.bo", Role::Director);
    let app = test::init_service(
        App::new()
            .app_data(actix_web::web::Data::new(state_with(&repo)))
            .configure(config),
    )
    .await;

    // missing apellido
    let req = test::TestRequest::post()
        .uri("/api/crear")
        .insert_header(bearer("ana@ucb.edu.bo"))
        .set_json(&json!({ "nombre": "Luis", "apellido": "", "email": "luis@ucb.edu.bo" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 400);

    // email belongs to another tenant
    let req = test::TestRequest::post()
        .uri("/api/crear")
        .insert_header(bearer("ana@ucb.edu.bo"))
        .set_json(&json!({ "nombre": "Maria", "apellido": "Lopez", "email": "maria@gmail.com" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 400);

    // valid, role defaults to Estudiante
    let req = test::TestRequest::post()
        .uri("/api/crear")
        .insert_header(bearer("ana@ucb.edu.bo"))
        .set_json(&json!({ "nombre": "Luis", "apellido": "Soto", "email": "luis@ucb.edu.bo" }))
        .to_request();
    let v = body_json(test::call_service(&app, req).await).await;
    assert_eq!(v["usuario"]["rol"], "Estudiante");

    // duplicate email conflicts
    let req = test::TestRequest::post()
        .uri("/api/crear")
        .insert_header(bearer("ana@ucb.edu.bo"))
        .set_json(&json!({ "nombre": "Luis", "apellido": "Soto", "email": "luis@ucb.edu.bo" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 409);
}

#[actix_web::test]
#[serial]
async fn tenant_from_email_reports_unknown() {
    set_secret();
    let repo = InMemRepo::new();
    let app = test::init_service(
        App::new()
            .app_data(actix_web::web::Data::new(state_with(&repo)))
            .configure(config),
    )
    .await;

    let req = test::TestRequest::get()
        .uri("/api/usuarios/tenant-from-email/ana@ucb.edu.bo")
        .to_request();
    let v = body_json(test::call_service(&app, req).await).await;
    assert_eq!(v["tenant"], "ucb");

    let req = test::TestRequest::get()
        .uri("/api/usuarios/tenant-from-email/x@hotmail.com")
        .to_request();
    let v = body_json(test::call_service(&app, req).await).await;
    assert_eq!(v["tenant"], "unknown");
}

#[actix_web::test]
#[serial]
async fn roles_endpoint_lists_the_three_roles() {
    set_secret();
    let repo = InMemRepo::new();
    let app = test::init_service(
        App::new()
            .app_data(actix_web::web::Data::new(state_with(&repo)))
            .configure(config),
    )
    .await;

    let req = test::TestRequest::get().uri("/api/roles").to_request();
    let v = body_json(test::call_service(&app, req).await).await;
    assert_eq!(v["roles"], json!(["Estudiante", "Profesor", "Director"]));
}
