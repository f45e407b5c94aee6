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

/// One UCB course taught by Ana, with Luis enrolled and Carla not.
struct Fixture {
    repo: InMemRepo,
    course_id: i64,
    student_id: i64,
}

fn fixture() -> Fixture {
    let repo = InMemRepo::new();
    let teacher = repo.seed_user(Tenant::Ucb, "Ana", "Perez", "ana@ucb.edu.bo", Role::Profesor);
    let student = repo.seed_user(Tenant::Ucb, "Luis", "Soto", "luis@ucb.edu.bo", Role::Estudiante);
    repo.seed_user(Tenant::Ucb, "Carla", "Rios", "carla@ucb.edu.bo", Role::Estudiante);
    let course = repo.seed_course(Tenant::Ucb, "Algebra I", "MAT-101", teacher.id);
    repo.seed_enrollment(Tenant::Ucb, student.id, course.id);
    Fixture { repo, course_id: course.id, student_id: student.id }
}

macro_rules! create_assignment {
    ($app:expr, $course:expr, $body:expr) => {{
        let req = test::TestRequest::post()
            .uri(&format!("/api/courses/{}/assignments", $course))
            .insert_header(bearer("ana@ucb.edu.bo"))
            .set_json(&$body)
            .to_request();
        test::call_service($app, req).await
    }};
}

#[actix_web::test]
#[serial]
async fn teacher_creates_and_both_roles_list() {
    set_secret();
    let fx = fixture();
    let app = test::init_service(
        App::new()
            .app_data(actix_web::web::Data::new(state_with(&fx.repo)))
            .configure(config),
    )
    .await;

    let resp = create_assignment!(&app, fx.course_id, json!({ "title": "Practica 1" }));
    assert!(resp.status().is_success());
    let v = body_json(resp).await;
    assert_eq!(v["success"], true);
    let assignment_id = v["assignmentId"].as_i64().unwrap();
    assert!(assignment_id > 0);

    fx.repo.seed_completion(Tenant::Ucb, assignment_id, fx.student_id, "completed");

    // teacher rows carry aggregate stats
    let req = test::TestRequest::get()
        .uri(&format!("/api/courses/{}/assignments", fx.course_id))
        .insert_header(bearer("ana@ucb.edu.bo"))
        .to_request();
    let v = body_json(test::call_service(&app, req).await).await;
    assert_eq!(v["userRole"], "Profesor");
    assert_eq!(v["total"], 1);
    assert_eq!(v["assignments"][0]["stats"]["total"], 1);
    assert_eq!(v["assignments"][0]["stats"]["completed"], 1);
    assert_eq!(v["assignments"][0]["assignment"]["assignment_type"], "tarea");
    assert_eq!(v["assignments"][0]["course_codigo"], "MAT-101");

    // student rows carry their own completion
    let req = test::TestRequest::get()
        .uri(&format!("/api/courses/{}/assignments", fx.course_id))
        .insert_header(bearer("luis@ucb.edu.bo"))
        .to_request();
    let v = body_json(test::call_service(&app, req).await).await;
    assert_eq!(v["userRole"], "Estudiante");
    assert_eq!(v["assignments"][0]["completion"]["status"], "completed");
}

#[actix_web::test]
#[serial]
async fn unenrolled_student_is_rejected_before_any_rows() {
    set_secret();
    let fx = fixture();
    let app = test::init_service(
        App::new()
            .app_data(actix_web::web::Data::new(state_with(&fx.repo)))
            .configure(config),
    )
    .await;

    let req = test::TestRequest::get()
        .uri(&format!("/api/courses/{}/assignments", fx.course_id))
        .insert_header(bearer("carla@ucb.edu.bo"))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 403);
}

#[actix_web::test]
#[serial]
async fn create_validations_leave_no_row_behind() {
    set_secret();
    let fx = fixture();
    let app = test::init_service(
        App::new()
            .app_data(actix_web::web::Data::new(state_with(&fx.repo)))
            .configure(config),
    )
    .await;

    // empty title
    let resp = create_assignment!(&app, fx.course_id, json!({ "title": "   " }));
    assert_eq!(resp.status(), 400);

    // unknown course
    let resp = create_assignment!(&app, 9999, json!({ "title": "Practica" }));
    assert_eq!(resp.status(), 404);

    // a student cannot create at all
    let req = test::TestRequest::post()
        .uri(&format!("/api/courses/{}/assignments", fx.course_id))
        .insert_header(bearer("luis@ucb.edu.bo"))
        .set_json(&json!({ "title": "Practica" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 403);

    // nothing was persisted
    let req = test::TestRequest::get()
        .uri(&format!("/api/courses/{}/assignments", fx.course_id))
        .insert_header(bearer("ana@ucb.edu.bo"))
        .to_request();
    let v = body_json(test::call_service(&app, req).await).await;
    assert_eq!(v["total"], 0);
}

#[actix_web::test]
#[serial]
async fn teacher_must_own_the_course() {
    set_secret();
    let fx = fixture();
    fx.repo.seed_user(Tenant::Ucb, "Jorge", "Mamani", "jorge@ucb.edu.bo", Role::Profesor);
    let app = test::init_service(
        App::new()
            .app_data(actix_web::web::Data::new(state_with(&fx.repo)))
            .configure(config),
    )
    .await;

    let req = test::TestRequest::post()
        .uri(&format!("/api/courses/{}/assignments", fx.course_id))
        .insert_header(bearer("jorge@ucb.edu.bo"))
        .set_json(&json!({ "title": "Practica" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 403);

    let req = test::TestRequest::get()
        .uri(&format!("/api/courses/{}/assignments", fx.course_id))
        .insert_header(bearer("jorge@ucb.edu.bo"))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 403);
}

#[actix_web::test]
#[serial]
async fn my_courses_and_assignments_follow_the_role() {
    set_secret();
    let fx = fixture();
    let app = test::init_service(
        App::new()
            .app_data(actix_web::web::Data::new(state_with(&fx.repo)))
            .configure(config),
    )
    .await;

    let resp = create_assignment!(&app, fx.course_id, json!({ "title": "Practica 1" }));
    assert!(resp.status().is_success());

    let req = test::TestRequest::get()
        .uri("/api/my-courses")
        .insert_header(bearer("ana@ucb.edu.bo"))
        .to_request();
    let v = body_json(test::call_service(&app, req).await).await;
    assert_eq!(v["userRole"], "Profesor");
    assert_eq!(v["cursos"].as_array().unwrap().len(), 1);

    let req = test::TestRequest::get()
        .uri("/api/my-courses")
        .insert_header(bearer("carla@ucb.edu.bo"))
        .to_request();
    let v = body_json(test::call_service(&app, req).await).await;
    assert_eq!(v["cursos"].as_array().unwrap().len(), 0);

    // cross-course rollup for the enrolled student
    let req = test::TestRequest::get()
        .uri("/api/assignments")
        .insert_header(bearer("luis@ucb.edu.bo"))
        .to_request();
    let v = body_json(test::call_service(&app, req).await).await;
    assert_eq!(v["userRole"], "Estudiante");
    assert_eq!(v["total"], 1);
    assert!(v["assignments"][0]["completion"].is_null());
}
