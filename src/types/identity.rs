//! Registered principals

use std::collections::BTreeSet;
use std::fmt;

use crate::auth::Role;

/// A registered principal
///
/// The email is the unique handle and the token subject. `password_hash` is
/// the only form the credential ever takes once registration hashes it.
#[derive(Clone, PartialEq, Eq)]
pub struct Identity {
    /// Store-assigned identifier, `None` until the first save
    pub id: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password_hash: String,
    /// Never empty
    roles: BTreeSet<Role>,
}

impl Identity {
    /// Create an unsaved identity.
    ///
    /// An empty role set falls back to [`Role::User`].
    pub fn new(
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        email: impl Into<String>,
        password_hash: impl Into<String>,
        roles: impl IntoIterator<Item = Role>,
    ) -> Self {
        let mut roles: BTreeSet<Role> = roles.into_iter().collect();
        if roles.is_empty() {
            roles.insert(Role::User);
        }
        Self {
            id: None,
            first_name: first_name.into(),
            last_name: last_name.into(),
            email: email.into(),
            password_hash: password_hash.into(),
            roles,
        }
    }

    /// Unique handle (email)
    pub fn handle(&self) -> &str {
        &self.email
    }

    pub fn roles(&self) -> &BTreeSet<Role> {
        &self.roles
    }

    /// Highest-privilege role held
    pub fn primary_role(&self) -> Role {
        self.roles.last().copied().unwrap_or_default()
    }

    /// Capability labels for every held role
    pub fn authorities(&self) -> Vec<&'static str> {
        self.roles.iter().map(|role| role.authority()).collect()
    }

    pub fn has_any_role(&self, required: &[Role]) -> bool {
        required.iter().any(|role| self.roles.contains(role))
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity")
            .field("id", &self.id)
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .field("email", &self.email)
            .field("password_hash", &"<redacted>")
            .field("roles", &self.roles)
            .finish()
    }
}
