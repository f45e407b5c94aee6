use std::sync::Arc;

use actix_web::{web, HttpResponse};
use chrono::Utc;

use crate::auth::Claims;
use crate::error::ApiError;
use crate::idp::IdentityProvider;
use crate::models::User;
use crate::repo::Repo;
use crate::tenant::{Tenant, TenantInfo};

#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<dyn Repo>,
    pub idp: Arc<IdentityProvider>,
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/auth")
            .service(web::resource("/sync-user").route(web::post().to(crate::session::sync_user)))
            .service(
                web::resource("/session-cookie")
                    .route(web::post().to(crate::session::set_session_cookie)),
            )
            .service(
                web::resource("/check-cookie").route(web::get().to(crate::session::check_cookie)),
            )
            .service(
                web::resource("/clear-cookie").route(web::post().to(crate::session::clear_cookie)),
            )
            .service(
                web::resource("/user-profile").route(web::get().to(crate::session::user_profile)),
            ),
    );
    cfg.service(
        web::scope("/api")
            // literal segments before the {id} capture
            .service(
                web::resource("/usuarios/mi-tenant")
                    .route(web::get().to(crate::roles::list_tenant_users)),
            )
            .service(
                web::resource("/usuarios/mi-tenant/filtrar")
                    .route(web::get().to(crate::roles::filter_tenant_users)),
            )
            .service(
                web::resource("/usuarios/tenant-from-email/{email}")
                    .route(web::get().to(crate::roles::tenant_from_email)),
            )
            .service(
                web::resource("/usuarios/{id}/rol")
                    .route(web::put().to(crate::roles::update_user_role)),
            )
            .service(web::resource("/crear").route(web::post().to(crate::roles::create_user)))
            .service(web::resource("/roles").route(web::get().to(crate::roles::list_roles)))
            .service(
                web::scope("/forum")
                    .service(
                        web::resource("/threads")
                            .route(web::get().to(crate::forum::list_threads))
                            .route(web::post().to(crate::forum::create_thread)),
                    )
                    .service(
                        web::resource("/threads/{id}")
                            .route(web::get().to(crate::forum::get_thread))
                            .route(web::delete().to(crate::forum::delete_thread)),
                    )
                    .service(
                        web::resource("/threads/{id}/replies")
                            .route(web::get().to(crate::forum::list_replies))
                            .route(web::post().to(crate::forum::create_reply)),
                    )
                    .service(
                        web::resource("/replies/{id}")
                            .route(web::delete().to(crate::forum::delete_reply)),
                    )
                    .service(
                        web::resource("/categories")
                            .route(web::get().to(crate::forum::list_categories)),
                    ),
            )
            .service(
                web::resource("/assignments")
                    .route(web::get().to(crate::assignments::list_my_assignments)),
            )
            .service(
                web::resource("/courses/{course_id}/assignments")
                    .route(web::get().to(crate::assignments::list_course_assignments))
                    .route(web::post().to(crate::assignments::create_assignment)),
            )
            .service(
                web::resource("/my-courses")
                    .route(web::get().to(crate::assignments::list_my_courses)),
            ),
    );
    cfg.route("/health", web::get().to(health));
}

#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is up"))
)]
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "service": "aula-backend",
        "timestamp": Utc::now(),
    }))
}

/// Fully resolved request identity: tenant, directory row, user row.
pub struct Caller {
    pub tenant: Tenant,
    pub info: TenantInfo,
    pub user: User,
}

/// Claims -> tenant -> directory -> user row. Unknown email suffix is a
/// 400, missing directory entry a 404, missing user row a 404; identity
/// never comes from anywhere but the verified token.
pub async fn resolve_caller(state: &AppState, claims: &Claims) -> Result<Caller, ApiError> {
    let tenant = Tenant::from_email(&claims.email).ok_or(ApiError::BadRequest)?;
    let info = state.repo.tenant_info(tenant.domain()).await?;
    let user = state
        .repo
        .find_user_by_email(&info, &claims.email)
        .await?
        .ok_or(ApiError::NotFound)?;
    Ok(Caller { tenant, info, user })
}
