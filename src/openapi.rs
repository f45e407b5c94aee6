use utoipa::OpenApi;

use crate::models::{
    Assignment, Category, Completion, CompletionStats, Course, NewAssignment, NewReply, NewThread,
    NewUser, Reply, Role, Thread, ThreadDto, User,
};
use crate::tenant::TenantInfo;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::session::sync_user,
        crate::session::set_session_cookie,
        crate::session::check_cookie,
        crate::session::clear_cookie,
        crate::session::user_profile,
        crate::roles::list_tenant_users,
        crate::roles::filter_tenant_users,
        crate::roles::update_user_role,
        crate::roles::create_user,
        crate::roles::tenant_from_email,
        crate::roles::list_roles,
        crate::forum::list_threads,
        crate::forum::get_thread,
        crate::forum::create_thread,
        crate::forum::list_replies,
        crate::forum::create_reply,
        crate::forum::delete_thread,
        crate::forum::delete_reply,
        crate::forum::list_categories,
        crate::assignments::list_my_assignments,
        crate::assignments::list_course_assignments,
        crate::assignments::create_assignment,
        crate::assignments::list_my_courses,
        crate::routes::health,
    ),
    components(schemas(
        User, NewUser, Role, Course, Assignment, NewAssignment, Completion, CompletionStats,
        Thread, ThreadDto, NewThread, Reply, NewReply, Category, TenantInfo,
        crate::session::SyncUserRequest,
        crate::roles::RoleUpdate, crate::roles::CreateUserRequest,
        crate::assignments::CreateAssignmentRequest,
        crate::assignments::StudentAssignmentRow, crate::assignments::TeacherAssignmentRow,
    )),
    tags(
        (name = "auth", description = "Session and identity"),
        (name = "usuarios", description = "Tenant user administration"),
        (name = "forum", description = "Shared forum"),
        (name = "assignments", description = "Course assignments"),
    )
)]
pub struct ApiDoc;
