//! Identity-to-claims projection.
//!
//! Flow Overview: a verified identity (user fields plus role memberships) is
//! flattened into an ordered [`ClaimSet`]: id, display name, optional email and
//! phone, then one role claim per role. The set is what a session carries as
//! its principal, and [`is_admin`] is the authorization predicate read from it.

use serde::{Deserialize, Serialize};

use super::store::Role;

/// Role id reserved for administrators.
pub const ADMIN_ROLE_ID: i64 = 1;
/// Role claim value emitted for [`ADMIN_ROLE_ID`].
pub const ADMIN_ROLE_NAME: &str = "Admin";

const ANONYMOUS_NAME: &str = "Anonymous User";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimKind {
    Id,
    Name,
    Email,
    Phone,
    Role,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claim {
    pub kind: ClaimKind,
    pub value: String,
}

impl Claim {
    fn new(kind: ClaimKind, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }
}

/// Identity that passed password verification. Lives only while a session is issued.
#[derive(Clone, Debug)]
pub struct VerifiedIdentity {
    pub id: i64,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub roles: Vec<Role>,
}

/// Ordered claims forming a session principal.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClaimSet {
    claims: Vec<Claim>,
}

impl ClaimSet {
    #[must_use]
    pub fn claims(&self) -> &[Claim] {
        &self.claims
    }

    fn first(&self, kind: ClaimKind) -> Option<&str> {
        self.claims
            .iter()
            .find(|claim| claim.kind == kind)
            .map(|claim| claim.value.as_str())
    }

    #[must_use]
    pub fn user_id(&self) -> Option<i64> {
        self.first(ClaimKind::Id)?.parse().ok()
    }

    #[must_use]
    pub fn name(&self) -> &str {
        self.first(ClaimKind::Name).unwrap_or(ANONYMOUS_NAME)
    }

    #[must_use]
    pub fn email(&self) -> Option<&str> {
        self.first(ClaimKind::Email)
    }

    #[must_use]
    pub fn phone(&self) -> Option<&str> {
        self.first(ClaimKind::Phone)
    }

    pub fn roles(&self) -> impl Iterator<Item = &str> {
        self.claims
            .iter()
            .filter(|claim| claim.kind == ClaimKind::Role)
            .map(|claim| claim.value.as_str())
    }

    #[must_use]
    pub fn is_in_role(&self, role: &str) -> bool {
        self.roles().any(|value| value == role)
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.is_in_role(ADMIN_ROLE_NAME)
    }
}

/// Project a verified identity into its claim set.
#[must_use]
pub fn project(identity: &VerifiedIdentity) -> ClaimSet {
    let mut claims = vec![
        Claim::new(ClaimKind::Id, identity.id.to_string()),
        Claim::new(ClaimKind::Name, identity.name.as_str()),
    ];
    if let Some(email) = identity.email.as_deref().filter(|email| !email.is_empty()) {
        claims.push(Claim::new(ClaimKind::Email, email));
    }
    if let Some(phone) = identity.phone.as_deref().filter(|phone| !phone.is_empty()) {
        claims.push(Claim::new(ClaimKind::Phone, phone));
    }
    claims.extend(
        identity
            .roles
            .iter()
            .map(|role| Claim::new(ClaimKind::Role, role_claim_value(role))),
    );
    ClaimSet { claims }
}

/// True when the principal holds the reserved administrator role.
#[must_use]
pub fn is_admin(claims: &ClaimSet) -> bool {
    claims.is_admin()
}

// The admin value is only ever produced for ADMIN_ROLE_ID; any other role
// named like it falls back to its id.
fn role_claim_value(role: &Role) -> String {
    if role.id == ADMIN_ROLE_ID {
        return ADMIN_ROLE_NAME.to_string();
    }
    match role.name.as_deref() {
        Some(name) if !name.is_empty() && !name.eq_ignore_ascii_case(ADMIN_ROLE_NAME) => {
            name.to_string()
        }
        _ => role.id.to_string(),
    }
}
