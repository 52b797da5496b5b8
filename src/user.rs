//! Authenticated identity carried inside a token.

use std::collections::HashSet;
use std::sync::LazyLock;

use serde::Serialize;

use crate::config::JwtConfig;

/// The anonymous user: empty id, no roles, no permissions.
pub static ANON: LazyLock<JwtUser> = LazyLock::new(JwtUser::default);

/// An authenticated principal.
///
/// Equality is by value. An empty `id` marks the anonymous user, see [`ANON`].
///
/// # Examples
///
/// ```rust
/// use ez_jwt::user::JwtUser;
///
/// let user = JwtUser::new("42", ["admin", "admin", "ops"], ["read"]);
/// assert_eq!(user.roles.len(), 2);
/// assert!(user.has_role("ops"));
/// assert!(!user.is_anon());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct JwtUser {
    /// Opaque subject identifier.
    pub id: String,
    /// Coarse-grained authorization groups.
    pub roles: HashSet<String>,
    /// Fine-grained permission grants.
    pub perms: HashSet<String>,
}

impl JwtUser {
    pub fn new<R, P>(id: impl Into<String>, roles: R, perms: P) -> Self
    where
        R: IntoIterator,
        R::Item: Into<String>,
        P: IntoIterator,
        P::Item: Into<String>,
    {
        Self {
            id: id.into(),
            roles: roles.into_iter().map(Into::into).collect(),
            perms: perms.into_iter().map(Into::into).collect(),
        }
    }

    /// A fresh copy of [`ANON`].
    pub fn anon() -> Self {
        ANON.clone()
    }

    pub fn is_anon(&self) -> bool {
        self.id.is_empty()
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }

    pub fn has_perm(&self, perm: &str) -> bool {
        self.perms.contains(perm)
    }

    /// Whether the user holds the configured administrator role.
    pub fn is_admin(&self, config: &JwtConfig) -> bool {
        self.has_role(config.admin_role())
    }
}
