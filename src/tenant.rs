use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// The institutions this deployment knows about. Resolution is a pure
/// suffix match on the authenticated email; anything else is `None` and
/// callers must treat that as terminal (400/404), never a default tenant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Tenant {
    Ucb,
    Upb,
    Gmail,
}

impl Tenant {
    pub const ALL: [Tenant; 3] = [Tenant::Ucb, Tenant::Upb, Tenant::Gmail];

    pub fn from_email(email: &str) -> Option<Tenant> {
        if email.ends_with("@ucb.edu.bo") {
            Some(Tenant::Ucb)
        } else if email.ends_with("@upb.edu.bo") {
            Some(Tenant::Upb)
        } else if email.ends_with("@gmail.com") {
            Some(Tenant::Gmail)
        } else {
            None
        }
    }

    pub fn from_domain(domain: &str) -> Option<Tenant> {
        match domain {
            "ucb.edu.bo" => Some(Tenant::Ucb),
            "upb.edu.bo" => Some(Tenant::Upb),
            "gmail.com" => Some(Tenant::Gmail),
            _ => None,
        }
    }

    /// Short key used in API responses (`"unknown"` is what callers see
    /// for unrecognized suffixes; it is never a `Tenant`).
    pub fn key(&self) -> &'static str {
        match self {
            Tenant::Ucb => "ucb",
            Tenant::Upb => "upb",
            Tenant::Gmail => "gmail",
        }
    }

    /// Email domain identifying the tenant in the directory table.
    pub fn domain(&self) -> &'static str {
        match self {
            Tenant::Ucb => "ucb.edu.bo",
            Tenant::Upb => "upb.edu.bo",
            Tenant::Gmail => "gmail.com",
        }
    }

    /// Default schema prefix. The directory row is authoritative at
    /// request time; this is only used to seed it.
    pub fn default_schema(&self) -> &'static str {
        match self {
            Tenant::Ucb => "tenant_ucb",
            Tenant::Upb => "tenant_upb",
            Tenant::Gmail => "tenant_gmail",
        }
    }
}

/// Tenant-scoped entity kinds. Each physically exists as one table per
/// tenant; the pair (schema prefix, entity) selects exactly one of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Users,
    Courses,
    Enrollments,
    Assignments,
    Completions,
}

impl Entity {
    pub fn suffix(&self) -> &'static str {
        match self {
            Entity::Users => "usuarios",
            Entity::Courses => "cursos",
            Entity::Enrollments => "inscripciones",
            Entity::Assignments => "assignments",
            Entity::Completions => "assignment_completions",
        }
    }
}

/// Directory row mapping a domain to its table-name prefix. Seeded once,
/// read-only at request time.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TenantInfo {
    pub domain: String,
    pub schema_name: String,
}

impl TenantInfo {
    /// Concrete table name for one (tenant, entity) pair, e.g.
    /// `tenant_ucb_usuarios`.
    pub fn table(&self, entity: Entity) -> String {
        format!("{}_{}", self.schema_name, entity.suffix())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_known_suffixes() {
        assert_eq!(Tenant::from_email("ana@ucb.edu.bo"), Some(Tenant::Ucb));
        assert_eq!(Tenant::from_email("luis@upb.edu.bo"), Some(Tenant::Upb));
        assert_eq!(Tenant::from_email("student@gmail.com"), Some(Tenant::Gmail));
    }

    #[test]
    fn unknown_suffix_is_none() {
        assert_eq!(Tenant::from_email("x@hotmail.com"), None);
        assert_eq!(Tenant::from_email("no-at-sign"), None);
        assert_eq!(Tenant::from_email("gmail.com"), None); // suffix, not substring
    }

    #[test]
    fn table_binding_is_prefix_plus_suffix() {
        let info = TenantInfo { domain: "ucb.edu.bo".into(), schema_name: "tenant_ucb".into() };
        assert_eq!(info.table(Entity::Users), "tenant_ucb_usuarios");
        assert_eq!(info.table(Entity::Completions), "tenant_ucb_assignment_completions");
    }
}
