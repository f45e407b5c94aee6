//! Role administration over the caller's own tenant. Identity is always
//! the verified token; no request header can select another tenant.

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use utoipa::ToSchema;

use crate::auth::Auth;
use crate::error::ApiError;
use crate::models::{Id, NewUser, Role};
use crate::repo::Repo;
use crate::routes::{resolve_caller, AppState};
use crate::tenant::Tenant;

#[utoipa::path(
    get,
    path = "/api/usuarios/mi-tenant",
    responses(
        (status = 200, description = "All users of the caller's tenant"),
        (status = 400, description = "Caller's email suffix is not a known tenant")
    )
)]
pub async fn list_tenant_users(auth: Auth, data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let caller = resolve_caller(&data, &auth.0).await?;
    let usuarios = data.repo.list_users(&caller.info, None).await?;
    let total = usuarios.len();
    Ok(HttpResponse::Ok().json(json!({
        "usuarios": usuarios,
        "tenant": caller.tenant.key(),
        "total": total,
    })))
}

#[derive(Debug, Deserialize)]
pub struct RoleFilter {
    pub rol: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/usuarios/mi-tenant/filtrar",
    params(("rol" = Option<String>, Query, description = "Role to filter by")),
    responses(
        (status = 200, description = "Users of the caller's tenant, optionally filtered by role"),
        (status = 400, description = "Unknown role")
    )
)]
pub async fn filter_tenant_users(
    auth: Auth,
    data: web::Data<AppState>,
    query: web::Query<RoleFilter>,
) -> Result<HttpResponse, ApiError> {
    let caller = resolve_caller(&data, &auth.0).await?;
    let filtro = query.into_inner().rol;
    let rol = match filtro.as_deref() {
        None | Some("") => None,
        Some(s) => Some(Role::parse(s).ok_or(ApiError::BadRequest)?),
    };
    let usuarios = data.repo.list_users(&caller.info, rol).await?;
    let total = usuarios.len();
    Ok(HttpResponse::Ok().json(json!({
        "usuarios": usuarios,
        "tenant": caller.tenant.key(),
        "total": total,
        "filtroRol": filtro,
    })))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RoleUpdate {
    pub rol: String,
}

#[utoipa::path(
    put,
    path = "/api/usuarios/{id}/rol",
    request_body = RoleUpdate,
    responses(
        (status = 200, description = "Role updated"),
        (status = 400, description = "Role is not one of the known roles"),
        (status = 404, description = "No such user in the caller's tenant")
    )
)]
pub async fn update_user_role(
    auth: Auth,
    data: web::Data<AppState>,
    path: web::Path<Id>,
    body: web::Json<RoleUpdate>,
) -> Result<HttpResponse, ApiError> {
    let caller = resolve_caller(&data, &auth.0).await?;
    let rol = Role::parse(&body.rol).ok_or(ApiError::BadRequest)?;
    let updated = data
        .repo
        .update_user_role(&caller.info, path.into_inner(), rol)
        .await?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Rol actualizado",
        "usuario": updated,
    })))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateUserRequest {
    pub nombre: String,
    pub apellido: String,
    pub email: String,
    pub rol: Option<String>,
}

#[utoipa::path(
    post,
    path = "/api/crear",
    request_body = CreateUserRequest,
    responses(
        (status = 200, description = "User created in the caller's tenant"),
        (status = 400, description = "Missing field, unknown role, or email outside the caller's tenant"),
        (status = 409, description = "Email already registered")
    )
)]
pub async fn create_user(
    auth: Auth,
    data: web::Data<AppState>,
    body: web::Json<CreateUserRequest>,
) -> Result<HttpResponse, ApiError> {
    let caller = resolve_caller(&data, &auth.0).await?;
    let body = body.into_inner();
    if body.nombre.trim().is_empty() || body.apellido.trim().is_empty() || body.email.trim().is_empty() {
        return Err(ApiError::BadRequest);
    }
    let rol = match body.rol.as_deref() {
        None | Some("") => Role::Estudiante,
        Some(s) => Role::parse(s).ok_or(ApiError::BadRequest)?,
    };
    // the new account must live in the caller's own tenant
    if Tenant::from_email(&body.email) != Some(caller.tenant) {
        return Err(ApiError::BadRequest);
    }
    let created = data
        .repo
        .create_user(
            &caller.info,
            NewUser {
                nombre: body.nombre.trim().to_string(),
                apellido: body.apellido.trim().to_string(),
                email: body.email.trim().to_string(),
                rol,
            },
        )
        .await?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Usuario creado",
        "usuario": created,
    })))
}

/// The one endpoint where an unrecognized suffix is reported as
/// `"unknown"` instead of rejected.
#[utoipa::path(
    get,
    path = "/api/usuarios/tenant-from-email/{email}",
    responses((status = 200, description = "Tenant key for an email, or \"unknown\""))
)]
pub async fn tenant_from_email(path: web::Path<String>) -> Result<HttpResponse, ApiError> {
    let email = path.into_inner();
    let tenant = Tenant::from_email(&email).map(|t| t.key()).unwrap_or("unknown");
    Ok(HttpResponse::Ok().json(json!({ "email": email, "tenant": tenant })))
}

#[utoipa::path(
    get,
    path = "/api/roles",
    responses((status = 200, description = "The static role list"))
)]
pub async fn list_roles() -> Result<HttpResponse, ApiError> {
    Ok(HttpResponse::Ok().json(json!({ "roles": Role::ALL })))
}
