//! Credential and session kernel.
//!
//! The kernel consumes a credential record and a submitted password and produces
//! either a verified identity with claims or a rejection. It does not render
//! pages, route requests, or own persistence: the account store and the
//! session sink are passed in as collaborators.

pub mod antiforgery;
pub mod authenticator;
pub mod claims;
pub mod error;
pub mod hasher;
pub mod redirect;
pub mod session;
pub mod store;
mod utils;

pub use antiforgery::{AntiforgeryGate, TokenPair};
pub use authenticator::{Authenticator, SignInOutcome, SignInRequest, SignOut};
pub use claims::{
    is_admin, project, Claim, ClaimKind, ClaimSet, VerifiedIdentity, ADMIN_ROLE_ID,
    ADMIN_ROLE_NAME,
};
pub use error::{AuthError, Rejection};
pub use hasher::{CredentialHasher, DerivedCredential};
pub use redirect::safe_return_url;
pub use session::{IssuedSession, Session, SessionSink, SESSION_TTL_SECONDS};
pub use store::{CredentialRecord, CredentialStore, Role};
