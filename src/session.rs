//! Session endpoints: user provisioning on first login and the HttpOnly
//! session cookie lifecycle. One cookie policy everywhere; issuance and
//! clearing always use the same attributes.

use actix_web::cookie::{time::Duration, Cookie, SameSite};
use actix_web::{web, HttpRequest, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use utoipa::ToSchema;

use crate::auth::{raw_token, split_full_name, Auth, SESSION_COOKIE};
use crate::error::ApiError;
use crate::models::{NewUser, Role};
use crate::repo::Repo;
use crate::routes::{resolve_caller, AppState};

fn cookie_secure() -> bool {
    std::env::var("COOKIE_SECURE")
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

fn session_cookie(token: &str, max_age_secs: i64) -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE, token.to_string())
        .http_only(true)
        .path("/")
        .same_site(SameSite::Lax)
        .secure(cookie_secure())
        .max_age(Duration::seconds(max_age_secs))
        .finish()
}

fn clearing_cookie() -> Cookie<'static> {
    session_cookie("", 0)
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SyncUserRequest {
    /// Tenant domain the frontend resolved for this login, e.g. `gmail.com`.
    pub tenant: String,
}

#[utoipa::path(
    post,
    path = "/auth/sync-user",
    request_body = SyncUserRequest,
    responses(
        (status = 200, description = "User present or created in the tenant's user table"),
        (status = 401, description = "Missing or invalid token"),
        (status = 404, description = "Unknown tenant domain")
    )
)]
pub async fn sync_user(
    auth: Auth,
    data: web::Data<AppState>,
    body: web::Json<SyncUserRequest>,
) -> Result<HttpResponse, ApiError> {
    let claims = auth.0;
    let info = data.repo.tenant_info(&body.tenant).await?;
    if let Some(existing) = data.repo.find_user_by_email(&info, &claims.email).await? {
        return Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "message": "Usuario ya registrado",
            "email": existing.email,
            "schema": info.schema_name,
            "isNewUser": false,
        })));
    }
    let (nombre, apellido) = split_full_name(claims.display_name());
    let created = data
        .repo
        .create_user(
            &info,
            NewUser {
                nombre,
                apellido,
                email: claims.email.clone(),
                rol: Role::Estudiante,
            },
        )
        .await?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Usuario creado exitosamente",
        "email": created.email,
        "schema": info.schema_name,
        "isNewUser": true,
    })))
}

#[utoipa::path(
    post,
    path = "/auth/session-cookie",
    responses(
        (status = 200, description = "Cookie set from a provider-validated token"),
        (status = 401, description = "Token missing or rejected by the identity provider")
    )
)]
pub async fn set_session_cookie(
    req: HttpRequest,
    data: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let token = raw_token(&req).ok_or(ApiError::Unauthorized)?;
    let session = data.idp.validate_token(&token).await?;
    Ok(HttpResponse::Ok()
        .cookie(session_cookie(&token, session.expires_in))
        .json(json!({
            "success": true,
            "message": "Sesión establecida",
            "email": session.user.email,
            "expiresIn": session.expires_in,
        })))
}

/// Always 200. A present-but-invalid cookie is cleared in the same
/// response so the browser stops sending it.
#[utoipa::path(
    get,
    path = "/auth/check-cookie",
    responses((status = 200, description = "Whether the session cookie is valid"))
)]
pub async fn check_cookie(
    req: HttpRequest,
    data: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let Some(cookie) = req.cookie(SESSION_COOKIE) else {
        return Ok(HttpResponse::Ok().json(json!({ "authenticated": false })));
    };
    match data.idp.validate_token(cookie.value()).await {
        Ok(session) => Ok(HttpResponse::Ok().json(json!({
            "authenticated": true,
            "user": { "id": session.user.id, "email": session.user.email },
        }))),
        Err(_) => Ok(HttpResponse::Ok()
            .cookie(clearing_cookie())
            .json(json!({ "authenticated": false }))),
    }
}

#[utoipa::path(
    post,
    path = "/auth/clear-cookie",
    responses((status = 200, description = "Session cookie expired"))
)]
pub async fn clear_cookie() -> Result<HttpResponse, ApiError> {
    Ok(HttpResponse::Ok()
        .cookie(clearing_cookie())
        .json(json!({ "success": true, "message": "Sesión cerrada" })))
}

#[utoipa::path(
    get,
    path = "/auth/user-profile",
    responses(
        (status = 200, description = "Caller's user row", body = crate::models::User),
        (status = 401, description = "Missing or invalid token"),
        (status = 404, description = "No user row for this email in its tenant")
    )
)]
pub async fn user_profile(auth: Auth, data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let caller = resolve_caller(&data, &auth.0).await?;
    Ok(HttpResponse::Ok().json(caller.user))
}
