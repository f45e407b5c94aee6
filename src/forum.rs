//! Forum endpoints. One shared namespace across tenants; author identity
//! is the caller's user row in their own tenant, captured on write.

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::auth::Auth;
use crate::error::ApiError;
use crate::models::{Category, NewReply, NewThread, Thread, ThreadDto};
use crate::repo::{Author, Repo};
use crate::routes::{resolve_caller, AppState, Caller};

fn author_of(caller: &Caller) -> Author {
    Author {
        user_id: caller.user.id,
        name: caller.user.full_name(),
        role: caller.user.rol.as_str().to_string(),
    }
}

fn category_name(categories: &[Category], id: Uuid) -> String {
    categories
        .iter()
        .find(|c| c.id == id)
        .map(|c| c.name.clone())
        .unwrap_or_default()
}

fn to_dto(thread: Thread, categories: &[Category]) -> ThreadDto {
    let name = category_name(categories, thread.category_id);
    ThreadDto::from_thread(thread, name)
}

#[derive(Debug, Deserialize)]
pub struct ThreadQuery {
    pub category: Option<String>,
    pub search: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/forum/threads",
    params(
        ("category" = Option<String>, Query, description = "Category name, or \"all\""),
        ("search" = Option<String>, Query, description = "Substring over title, content and tags")
    ),
    responses((status = 200, description = "Threads, pinned first then by last activity", body = [ThreadDto]))
)]
pub async fn list_threads(
    data: web::Data<AppState>,
    query: web::Query<ThreadQuery>,
) -> Result<HttpResponse, ApiError> {
    let categories = data.repo.list_categories().await?;
    let category_id = match query.category.as_deref() {
        None | Some("") | Some("all") => None,
        Some(name) => match categories.iter().find(|c| c.name == name) {
            Some(c) => Some(c.id),
            // unknown category matches nothing
            None => return Ok(HttpResponse::Ok().json(Vec::<ThreadDto>::new())),
        },
    };
    let search = query.search.as_deref().filter(|s| !s.is_empty());
    let threads = data.repo.list_threads(category_id, search).await?;
    let dtos: Vec<ThreadDto> = threads.into_iter().map(|t| to_dto(t, &categories)).collect();
    Ok(HttpResponse::Ok().json(dtos))
}

/// Reading a thread counts as a view; the counter bump is atomic at the
/// store, not read-then-write here.
#[utoipa::path(
    get,
    path = "/api/forum/threads/{id}",
    responses(
        (status = 200, description = "The thread, view counter already bumped", body = ThreadDto),
        (status = 404, description = "No such thread")
    )
)]
pub async fn get_thread(
    data: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    let thread = data.repo.increment_thread_views(path.into_inner()).await?;
    let categories = data.repo.list_categories().await?;
    Ok(HttpResponse::Ok().json(to_dto(thread, &categories)))
}

#[utoipa::path(
    post,
    path = "/api/forum/threads",
    request_body = NewThread,
    responses(
        (status = 201, description = "Thread created", body = ThreadDto),
        (status = 400, description = "Empty title or content"),
        (status = 401, description = "Missing or invalid token")
    )
)]
pub async fn create_thread(
    auth: Auth,
    data: web::Data<AppState>,
    body: web::Json<NewThread>,
) -> Result<HttpResponse, ApiError> {
    let caller = resolve_caller(&data, &auth.0).await?;
    let new = body.into_inner();
    if new.title.trim().is_empty() || new.content.trim().is_empty() {
        return Err(ApiError::BadRequest);
    }
    let thread = data.repo.create_thread(new, &author_of(&caller)).await?;
    let categories = data.repo.list_categories().await?;
    Ok(HttpResponse::Created().json(to_dto(thread, &categories)))
}

#[utoipa::path(
    get,
    path = "/api/forum/threads/{id}/replies",
    responses(
        (status = 200, description = "Replies in posting order", body = [crate::models::Reply]),
        (status = 404, description = "No such thread")
    )
)]
pub async fn list_replies(
    data: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    data.repo.get_thread(id).await?;
    let replies = data.repo.list_replies(id).await?;
    Ok(HttpResponse::Ok().json(replies))
}

#[utoipa::path(
    post,
    path = "/api/forum/threads/{id}/replies",
    request_body = NewReply,
    responses(
        (status = 201, description = "Reply created; parent counters bumped", body = crate::models::Reply),
        (status = 400, description = "Empty content"),
        (status = 404, description = "No such thread")
    )
)]
pub async fn create_reply(
    auth: Auth,
    data: web::Data<AppState>,
    path: web::Path<Uuid>,
    body: web::Json<NewReply>,
) -> Result<HttpResponse, ApiError> {
    let caller = resolve_caller(&data, &auth.0).await?;
    let new = body.into_inner();
    if new.content.trim().is_empty() {
        return Err(ApiError::BadRequest);
    }
    let reply = data
        .repo
        .create_reply(path.into_inner(), new, &author_of(&caller))
        .await?;
    Ok(HttpResponse::Created().json(reply))
}

/// Only the stored author may delete, role notwithstanding; the replies
/// go with the thread.
#[utoipa::path(
    delete,
    path = "/api/forum/threads/{id}",
    responses(
        (status = 200, description = "Thread and its replies deleted"),
        (status = 404, description = "Absent, or not owned by the caller")
    )
)]
pub async fn delete_thread(
    auth: Auth,
    data: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    let caller = resolve_caller(&data, &auth.0).await?;
    data.repo.delete_thread(path.into_inner(), caller.user.id).await?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "message": "Hilo eliminado" })))
}

#[utoipa::path(
    delete,
    path = "/api/forum/replies/{id}",
    responses(
        (status = 200, description = "Reply deleted"),
        (status = 404, description = "Absent, or not owned by the caller")
    )
)]
pub async fn delete_reply(
    auth: Auth,
    data: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    let caller = resolve_caller(&data, &auth.0).await?;
    data.repo.delete_reply(path.into_inner(), caller.user.id).await?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "message": "Respuesta eliminada" })))
}

#[utoipa::path(
    get,
    path = "/api/forum/categories",
    responses((status = 200, description = "All categories", body = [Category]))
)]
pub async fn list_categories(data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let categories = data.repo.list_categories().await?;
    Ok(HttpResponse::Ok().json(categories))
}
