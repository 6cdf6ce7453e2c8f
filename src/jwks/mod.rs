//! # Jwks Module
//! JSON Web Key Set handling and josekit signer/verifier adapters.

#[allow(clippy::module_inception)]
mod jwks;

pub use jwks::Jwks;
pub(crate) use jwks::{signer_for, verifier_for, CustomJwk};
