use crate::models::*;
use crate::tenant::TenantInfo;

#[derive(thiserror::Error, Debug)]
pub enum RepoError {
    #[error("not found")] NotFound,
    #[error("conflict")] Conflict,
    #[error("upstream: {0}")] Upstream(String),
}

pub type RepoResult<T> = Result<T, RepoError>;

use async_trait::async_trait;

/// Verified author identity threaded into forum writes.
#[derive(Debug, Clone)]
pub struct Author {
    pub user_id: Id,
    pub name: String,
    pub role: String,
}

/// Tenant directory: domain -> schema prefix. Seeded, read-only at
/// request time.
#[async_trait]
pub trait DirectoryRepo: Send + Sync {
    async fn tenant_info(&self, domain: &str) -> RepoResult<TenantInfo>;
}

#[async_trait]
pub trait UserRepo: Send + Sync {
    async fn find_user_by_email(&self, t: &TenantInfo, email: &str) -> RepoResult<Option<User>>;
    async fn list_users(&self, t: &TenantInfo, rol: Option<Role>) -> RepoResult<Vec<User>>;
    async fn create_user(&self, t: &TenantInfo, new: NewUser) -> RepoResult<User>;
    async fn update_user_role(&self, t: &TenantInfo, id: Id, rol: Role) -> RepoResult<User>;
}

#[async_trait]
pub trait CourseRepo: Send + Sync {
    async fn course_by_id(&self, t: &TenantInfo, id: Id) -> RepoResult<Option<Course>>;
    async fn courses_by_teacher(&self, t: &TenantInfo, profesor_id: Id) -> RepoResult<Vec<Course>>;
    async fn courses_by_student(&self, t: &TenantInfo, usuario_id: Id) -> RepoResult<Vec<Course>>;
    async fn is_enrolled(&self, t: &TenantInfo, usuario_id: Id, curso_id: Id) -> RepoResult<bool>;
}

#[async_trait]
pub trait AssignmentRepo: Send + Sync {
    /// Active assignments of one course.
    async fn assignments_by_course(&self, t: &TenantInfo, curso_id: Id) -> RepoResult<Vec<Assignment>>;
    /// Insert and return the generated id.
    async fn create_assignment(&self, t: &TenantInfo, new: NewAssignment, profesor_id: Id) -> RepoResult<Id>;
    async fn completion_for(&self, t: &TenantInfo, assignment_id: Id, student_id: Id) -> RepoResult<Option<Completion>>;
    async fn completion_stats(&self, t: &TenantInfo, assignment_id: Id) -> RepoResult<CompletionStats>;
}

#[async_trait]
pub trait ForumRepo: Send + Sync {
    /// Threads filtered by category id and/or substring (title, content,
    /// tags), sorted pinned-first then by last activity descending.
    async fn list_threads(&self, category_id: Option<uuid::Uuid>, search: Option<&str>) -> RepoResult<Vec<Thread>>;
    async fn get_thread(&self, id: uuid::Uuid) -> RepoResult<Thread>;
    /// Atomic view-counter bump; returns the updated thread.
    async fn increment_thread_views(&self, id: uuid::Uuid) -> RepoResult<Thread>;
    async fn create_thread(&self, new: NewThread, author: &Author) -> RepoResult<Thread>;
    async fn list_replies(&self, thread_id: uuid::Uuid) -> RepoResult<Vec<Reply>>;
    /// Creates the reply and atomically bumps the parent's reply_count
    /// and last_activity.
    async fn create_reply(&self, thread_id: uuid::Uuid, new: NewReply, author: &Author) -> RepoResult<Reply>;
    /// Deletes only when the stored author id matches; cascades to
    /// replies. `NotFound` covers both "absent" and "not yours".
    async fn delete_thread(&self, id: uuid::Uuid, user_id: Id) -> RepoResult<()>;
    async fn delete_reply(&self, id: uuid::Uuid, user_id: Id) -> RepoResult<()>;
    async fn list_categories(&self) -> RepoResult<Vec<Category>>;
}

pub trait Repo: DirectoryRepo + UserRepo + CourseRepo + AssignmentRepo + ForumRepo {}

impl<T> Repo for T where T: DirectoryRepo + UserRepo + CourseRepo + AssignmentRepo + ForumRepo {}

#[cfg(feature = "inmem-store")]
pub mod inmem {
    use super::*;
    use crate::tenant::Tenant;
    use chrono::Utc;
    use std::collections::HashMap;
    use std::sync::{Arc, RwLock};
    use uuid::Uuid;

    /// One tenant's parallel table set.
    #[derive(Default)]
    struct TenantTables {
        users: HashMap<Id, User>,
        courses: HashMap<Id, Course>,
        enrollments: Vec<Enrollment>,
        assignments: HashMap<Id, Assignment>,
        completions: Vec<Completion>,
        next_id: Id,
    }

    impl TenantTables {
        fn next_id(&mut self) -> Id {
            self.next_id += 1;
            self.next_id
        }
    }

    #[derive(Default)]
    struct State {
        directory: HashMap<String, TenantInfo>,
        tenants: HashMap<String, TenantTables>,
        threads: HashMap<Uuid, Thread>,
        replies: HashMap<Uuid, Reply>,
        categories: HashMap<Uuid, Category>,
    }

    /// In-memory backend for dev and the test suite. A single lock guards
    /// the whole state, so counter bumps are atomic by construction.
    #[derive(Clone)]
    pub struct InMemRepo {
        state: Arc<RwLock<State>>,
    }

    impl InMemRepo {
        pub fn new() -> Self {
            let mut state = State::default();
            for tenant in Tenant::ALL {
                state.directory.insert(
                    tenant.domain().to_string(),
                    TenantInfo {
                        domain: tenant.domain().to_string(),
                        schema_name: tenant.default_schema().to_string(),
                    },
                );
                state.tenants.insert(tenant.default_schema().to_string(), TenantTables::default());
            }
            Self { state: Arc::new(RwLock::new(state)) }
        }

        // ---- seeding helpers (dev fixtures / tests) ----

        pub fn seed_user(&self, tenant: Tenant, nombre: &str, apellido: &str, email: &str, rol: Role) -> User {
            let mut s = self.state.write().unwrap();
            let tables = s.tenants.get_mut(tenant.default_schema()).unwrap();
            let id = tables.next_id();
            let user = User {
                id,
                nombre: nombre.into(),
                apellido: apellido.into(),
                email: email.into(),
                rol,
            };
            tables.users.insert(id, user.clone());
            user
        }

        pub fn seed_course(&self, tenant: Tenant, nombre: &str, codigo: &str, profesor_id: Id) -> Course {
            let mut s = self.state.write().unwrap();
            let tables = s.tenants.get_mut(tenant.default_schema()).unwrap();
            let id = tables.next_id();
            let course = Course { id, nombre: nombre.into(), codigo: codigo.into(), profesor_id };
            tables.courses.insert(id, course.clone());
            course
        }

        pub fn seed_enrollment(&self, tenant: Tenant, usuario_id: Id, curso_id: Id) -> Enrollment {
            let mut s = self.state.write().unwrap();
            let tables = s.tenants.get_mut(tenant.default_schema()).unwrap();
            let id = tables.next_id();
            let row = Enrollment { id, usuario_id, curso_id };
            tables.enrollments.push(row.clone());
            row
        }

        pub fn seed_completion(&self, tenant: Tenant, assignment_id: Id, student_id: Id, status: &str) -> Completion {
            let mut s = self.state.write().unwrap();
            let tables = s.tenants.get_mut(tenant.default_schema()).unwrap();
            let id = tables.next_id();
            let row = Completion {
                id,
                assignment_id,
                student_id,
                completed_at: if status == "completed" { Some(Utc::now()) } else { None },
                status: status.into(),
                submitted_content: None,
                grade: None,
                feedback: None,
            };
            tables.completions.push(row.clone());
            row
        }

        pub fn seed_category(&self, name: &str) -> Category {
            let mut s = self.state.write().unwrap();
            let cat = Category {
                id: Uuid::new_v4(),
                name: name.into(),
                description: None,
                icon: None,
                color: None,
            };
            s.categories.insert(cat.id, cat.clone());
            cat
        }

        pub fn seed_thread(
            &self,
            category_id: Uuid,
            author: &Author,
            title: &str,
            content: &str,
            pinned: bool,
        ) -> Thread {
            let mut s = self.state.write().unwrap();
            let now = Utc::now();
            let thread = Thread {
                id: Uuid::new_v4(),
                title: title.into(),
                content: content.into(),
                excerpt: Some(excerpt_of(None, content)),
                category_id,
                user_id: author.user_id,
                author_name: author.name.clone(),
                author_role: author.role.clone(),
                tags: Vec::new(),
                is_pinned: pinned,
                views: 0,
                reply_count: 0,
                last_activity: now,
                created_at: now,
                updated_at: now,
            };
            s.threads.insert(thread.id, thread.clone());
            thread
        }

        fn with_tables<R>(&self, t: &TenantInfo, f: impl FnOnce(&TenantTables) -> R) -> RepoResult<R> {
            let s = self.state.read().unwrap();
            let tables = s.tenants.get(&t.schema_name).ok_or(RepoError::NotFound)?;
            Ok(f(tables))
        }

        fn with_tables_mut<R>(&self, t: &TenantInfo, f: impl FnOnce(&mut TenantTables) -> R) -> RepoResult<R> {
            let mut s = self.state.write().unwrap();
            let tables = s.tenants.get_mut(&t.schema_name).ok_or(RepoError::NotFound)?;
            Ok(f(tables))
        }
    }

    impl Default for InMemRepo {
        fn default() -> Self { Self::new() }
    }

    #[async_trait]
    impl DirectoryRepo for InMemRepo {
        async fn tenant_info(&self, domain: &str) -> RepoResult<TenantInfo> {
            let s = self.state.read().unwrap();
            s.directory.get(domain).cloned().ok_or(RepoError::NotFound)
        }
    }

    #[async_trait]
    impl UserRepo for InMemRepo {
        async fn find_user_by_email(&self, t: &TenantInfo, email: &str) -> RepoResult<Option<User>> {
            self.with_tables(t, |tb| tb.users.values().find(|u| u.email == email).cloned())
        }

        async fn list_users(&self, t: &TenantInfo, rol: Option<Role>) -> RepoResult<Vec<User>> {
            self.with_tables(t, |tb| {
                let mut v: Vec<_> = tb
                    .users
                    .values()
                    .filter(|u| rol.map_or(true, |r| u.rol == r))
                    .cloned()
                    .collect();
                v.sort_by_key(|u| u.id);
                v
            })
        }

        async fn create_user(&self, t: &TenantInfo, new: NewUser) -> RepoResult<User> {
            self.with_tables_mut(t, |tb| {
                if tb.users.values().any(|u| u.email == new.email) {
                    return Err(RepoError::Conflict);
                }
                let id = tb.next_id();
                let user = User {
                    id,
                    nombre: new.nombre,
                    apellido: new.apellido,
                    email: new.email,
                    rol: new.rol,
                };
                tb.users.insert(id, user.clone());
                Ok(user)
            })?
        }

        async fn update_user_role(&self, t: &TenantInfo, id: Id, rol: Role) -> RepoResult<User> {
            self.with_tables_mut(t, |tb| {
                let user = tb.users.get_mut(&id).ok_or(RepoError::NotFound)?;
                user.rol = rol;
                Ok(user.clone())
            })?
        }
    }

    #[async_trait]
    impl CourseRepo for InMemRepo {
        async fn course_by_id(&self, t: &TenantInfo, id: Id) -> RepoResult<Option<Course>> {
            self.with_tables(t, |tb| tb.courses.get(&id).cloned())
        }

        async fn courses_by_teacher(&self, t: &TenantInfo, profesor_id: Id) -> RepoResult<Vec<Course>> {
            self.with_tables(t, |tb| {
                let mut v: Vec<_> = tb
                    .courses
                    .values()
                    .filter(|c| c.profesor_id == profesor_id)
                    .cloned()
                    .collect();
                v.sort_by_key(|c| c.id);
                v
            })
        }

        async fn courses_by_student(&self, t: &TenantInfo, usuario_id: Id) -> RepoResult<Vec<Course>> {
            self.with_tables(t, |tb| {
                let mut v: Vec<_> = tb
                    .enrollments
                    .iter()
                    .filter(|e| e.usuario_id == usuario_id)
                    .filter_map(|e| tb.courses.get(&e.curso_id).cloned())
                    .collect();
                v.sort_by_key(|c| c.id);
                v
            })
        }

        async fn is_enrolled(&self, t: &TenantInfo, usuario_id: Id, curso_id: Id) -> RepoResult<bool> {
            self.with_tables(t, |tb| {
                tb.enrollments
                    .iter()
                    .any(|e| e.usuario_id == usuario_id && e.curso_id == curso_id)
            })
        }
    }

    #[async_trait]
    impl AssignmentRepo for InMemRepo {
        async fn assignments_by_course(&self, t: &TenantInfo, curso_id: Id) -> RepoResult<Vec<Assignment>> {
            self.with_tables(t, |tb| {
                let mut v: Vec<_> = tb
                    .assignments
                    .values()
                    .filter(|a| a.curso_id == curso_id && a.is_active)
                    .cloned()
                    .collect();
                v.sort_by_key(|a| a.id);
                v
            })
        }

        async fn create_assignment(&self, t: &TenantInfo, new: NewAssignment, profesor_id: Id) -> RepoResult<Id> {
            self.with_tables_mut(t, |tb| {
                if !tb.courses.contains_key(&new.curso_id) {
                    return Err(RepoError::NotFound);
                }
                let now = Utc::now();
                let id = tb.next_id();
                let assignment = Assignment {
                    id,
                    title: new.title.trim().to_string(),
                    description: new.description.map(|d| d.trim().to_string()).unwrap_or_default(),
                    due_date: new.due_date,
                    points: new.points,
                    assignment_type: new
                        .assignment_type
                        .filter(|s| !s.is_empty())
                        .unwrap_or_else(|| "tarea".into()),
                    curso_id: new.curso_id,
                    profesor_id,
                    created_at: now,
                    updated_at: now,
                    is_active: true,
                    status: "active".into(),
                };
                tb.assignments.insert(id, assignment);
                Ok(id)
            })?
        }

        async fn completion_for(&self, t: &TenantInfo, assignment_id: Id, student_id: Id) -> RepoResult<Option<Completion>> {
            self.with_tables(t, |tb| {
                tb.completions
                    .iter()
                    .find(|c| c.assignment_id == assignment_id && c.student_id == student_id)
                    .cloned()
            })
        }

        async fn completion_stats(&self, t: &TenantInfo, assignment_id: Id) -> RepoResult<CompletionStats> {
            self.with_tables(t, |tb| {
                let rows: Vec<_> = tb
                    .completions
                    .iter()
                    .filter(|c| c.assignment_id == assignment_id)
                    .collect();
                CompletionStats {
                    total: rows.len(),
                    completed: rows.iter().filter(|c| c.status == "completed").count(),
                }
            })
        }
    }

    fn thread_matches(t: &Thread, search: &str) -> bool {
        t.title.contains(search)
            || t.content.contains(search)
            || t.tags.iter().any(|tag| tag.contains(search))
    }

    #[async_trait]
    impl ForumRepo for InMemRepo {
        async fn list_threads(&self, category_id: Option<Uuid>, search: Option<&str>) -> RepoResult<Vec<Thread>> {
            let s = self.state.read().unwrap();
            let mut v: Vec<_> = s
                .threads
                .values()
                .filter(|t| category_id.map_or(true, |c| t.category_id == c))
                .filter(|t| search.map_or(true, |q| thread_matches(t, q)))
                .cloned()
                .collect();
            // pinned first, then most recently active
            v.sort_by(|a, b| {
                b.is_pinned
                    .cmp(&a.is_pinned)
                    .then(b.last_activity.cmp(&a.last_activity))
            });
            Ok(v)
        }

        async fn get_thread(&self, id: Uuid) -> RepoResult<Thread> {
            let s = self.state.read().unwrap();
            s.threads.get(&id).cloned().ok_or(RepoError::NotFound)
        }

        async fn increment_thread_views(&self, id: Uuid) -> RepoResult<Thread> {
            let mut s = self.state.write().unwrap();
            let thread = s.threads.get_mut(&id).ok_or(RepoError::NotFound)?;
            thread.views += 1;
            Ok(thread.clone())
        }

        async fn create_thread(&self, new: NewThread, author: &Author) -> RepoResult<Thread> {
            let mut s = self.state.write().unwrap();
            if !s.categories.contains_key(&new.category_id) {
                return Err(RepoError::NotFound);
            }
            let now = Utc::now();
            let excerpt = excerpt_of(None, &new.content);
            let thread = Thread {
                id: Uuid::new_v4(),
                title: new.title,
                content: new.content,
                excerpt: Some(excerpt),
                category_id: new.category_id,
                user_id: author.user_id,
                author_name: author.name.clone(),
                author_role: author.role.clone(),
                tags: new.tags,
                is_pinned: false,
                views: 0,
                reply_count: 0,
                last_activity: now,
                created_at: now,
                updated_at: now,
            };
            s.threads.insert(thread.id, thread.clone());
            Ok(thread)
        }

        async fn list_replies(&self, thread_id: Uuid) -> RepoResult<Vec<Reply>> {
            let s = self.state.read().unwrap();
            let mut v: Vec<_> = s
                .replies
                .values()
                .filter(|r| r.thread_id == thread_id)
                .cloned()
                .collect();
            v.sort_by(|a, b| a.created_at.cmp(&b.created_at));
            Ok(v)
        }

        async fn create_reply(&self, thread_id: Uuid, new: NewReply, author: &Author) -> RepoResult<Reply> {
            let mut s = self.state.write().unwrap();
            if !s.threads.contains_key(&thread_id) {
                return Err(RepoError::NotFound);
            }
            let now = Utc::now();
            let reply = Reply {
                id: Uuid::new_v4(),
                thread_id,
                content: new.content,
                user_id: author.user_id,
                author_name: author.name.clone(),
                author_role: author.role.clone(),
                likes: 0,
                created_at: now,
            };
            s.replies.insert(reply.id, reply.clone());
            // counter bump happens under the same write lock
            if let Some(thread) = s.threads.get_mut(&thread_id) {
                thread.reply_count += 1;
                thread.last_activity = now;
            }
            Ok(reply)
        }

        async fn delete_thread(&self, id: Uuid, user_id: Id) -> RepoResult<()> {
            let mut s = self.state.write().unwrap();
            match s.threads.get(&id) {
                Some(t) if t.user_id == user_id => {
                    s.threads.remove(&id);
                    s.replies.retain(|_, r| r.thread_id != id);
                    Ok(())
                }
                _ => Err(RepoError::NotFound),
            }
        }

        async fn delete_reply(&self, id: Uuid, user_id: Id) -> RepoResult<()> {
            let mut s = self.state.write().unwrap();
            match s.replies.get(&id) {
                Some(r) if r.user_id == user_id => {
                    let thread_id = r.thread_id;
                    s.replies.remove(&id);
                    if let Some(thread) = s.threads.get_mut(&thread_id) {
                        thread.reply_count -= 1;
                    }
                    Ok(())
                }
                _ => Err(RepoError::NotFound),
            }
        }

        async fn list_categories(&self) -> RepoResult<Vec<Category>> {
            let s = self.state.read().unwrap();
            let mut v: Vec<_> = s.categories.values().cloned().collect();
            v.sort_by(|a, b| a.name.cmp(&b.name));
            Ok(v)
        }
    }
}
