use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Tenant-scoped rows use store-generated integer ids.
pub type Id = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum Role {
    Estudiante,
    Profesor,
    Director,
}

impl Role {
    pub const ALL: [&'static str; 3] = ["Estudiante", "Profesor", "Director"];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Estudiante => "Estudiante",
            Role::Profesor => "Profesor",
            Role::Director => "Director",
        }
    }

    pub fn parse(s: &str) -> Option<Role> {
        match s {
            "Estudiante" => Some(Role::Estudiante),
            "Profesor" => Some(Role::Profesor),
            "Director" => Some(Role::Director),
            _ => None,
        }
    }
}

// ---------------- tenant-scoped entities ----------------

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct User {
    pub id: Id,
    pub nombre: String,
    pub apellido: String,
    pub email: String,
    pub rol: Role,
}

impl User {
    pub fn full_name(&self) -> String {
        let full = format!("{} {}", self.nombre, self.apellido);
        let full = full.trim().to_string();
        if full.is_empty() { "Usuario".into() } else { full }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NewUser {
    pub nombre: String,
    pub apellido: String,
    pub email: String,
    pub rol: Role,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Course {
    pub id: Id,
    pub nombre: String,
    pub codigo: String,
    pub profesor_id: Id,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Enrollment {
    pub id: Id,
    pub usuario_id: Id,
    pub curso_id: Id,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Assignment {
    pub id: Id,
    pub title: String,
    pub description: String,
    pub due_date: Option<DateTime<Utc>>,
    pub points: Option<i32>,
    pub assignment_type: String,
    pub curso_id: Id,
    pub profesor_id: Id,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub is_active: bool,
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NewAssignment {
    pub title: String,
    pub description: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub points: Option<i32>,
    pub assignment_type: Option<String>,
    pub curso_id: Id,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Completion {
    pub id: Id,
    pub assignment_id: Id,
    pub student_id: Id,
    pub completed_at: Option<DateTime<Utc>>,
    pub status: String,
    pub submitted_content: Option<String>,
    pub grade: Option<f64>,
    pub feedback: Option<String>,
}

/// Aggregate view a teacher sees per assignment.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema)]
pub struct CompletionStats {
    pub total: usize,
    pub completed: usize,
}

// ---------------- forum (shared, not tenant-partitioned) ----------------

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Thread {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub excerpt: Option<String>,
    pub category_id: Uuid,
    pub user_id: Id,
    pub author_name: String,
    pub author_role: String,
    pub tags: Vec<String>,
    pub is_pinned: bool,
    pub views: i32,
    pub reply_count: i32,
    pub last_activity: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub const EXCERPT_LEN: usize = 150;

/// Stored excerpt wins; otherwise the first 150 characters of the content
/// with an ellipsis (content at or under the limit is returned verbatim).
pub fn excerpt_of(explicit: Option<&str>, content: &str) -> String {
    if let Some(e) = explicit {
        return e.to_string();
    }
    if content.chars().count() > EXCERPT_LEN {
        let head: String = content.chars().take(EXCERPT_LEN).collect();
        format!("{head}...")
    } else {
        content.to_string()
    }
}

/// Thread as served to clients: category name attached, excerpt always
/// materialized.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ThreadDto {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub excerpt: String,
    pub category_id: Uuid,
    pub category_name: String,
    pub author_name: String,
    pub author_role: String,
    pub tags: Vec<String>,
    pub is_pinned: bool,
    pub views: i32,
    pub reply_count: i32,
    pub last_activity: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl ThreadDto {
    pub fn from_thread(t: Thread, category_name: String) -> Self {
        let excerpt = excerpt_of(t.excerpt.as_deref(), &t.content);
        ThreadDto {
            id: t.id,
            title: t.title,
            content: t.content,
            excerpt,
            category_id: t.category_id,
            category_name,
            author_name: t.author_name,
            author_role: t.author_role,
            tags: t.tags,
            is_pinned: t.is_pinned,
            views: t.views,
            reply_count: t.reply_count,
            last_activity: t.last_activity,
            created_at: t.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NewThread {
    pub title: String,
    pub content: String,
    pub category_id: Uuid,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Reply {
    pub id: Uuid,
    pub thread_id: Uuid,
    pub content: String,
    pub user_id: Id,
    pub author_name: String,
    pub author_role: String,
    pub likes: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NewReply {
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub color: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn excerpt_short_content_verbatim() {
        let content = "short post";
        assert_eq!(excerpt_of(None, content), content);
    }

    #[test]
    fn excerpt_boundary_is_inclusive() {
        let content = "x".repeat(EXCERPT_LEN);
        assert_eq!(excerpt_of(None, &content), content);
    }

    #[test]
    fn excerpt_long_content_truncated_with_ellipsis() {
        let content = "y".repeat(200);
        let e = excerpt_of(None, &content);
        assert_eq!(e.len(), EXCERPT_LEN + 3);
        assert!(e.ends_with("..."));
        assert!(e.starts_with(&"y".repeat(EXCERPT_LEN)));
    }

    #[test]
    fn excerpt_explicit_wins() {
        assert_eq!(excerpt_of(Some("stored"), &"z".repeat(500)), "stored");
    }

    #[test]
    fn full_name_falls_back_to_placeholder() {
        let u = User { id: 1, nombre: "".into(), apellido: "".into(), email: "a@gmail.com".into(), rol: Role::Estudiante };
        assert_eq!(u.full_name(), "Usuario");
    }
}
