//! # Issuer Module
//! Discovery and representation of the Authorization Server.

#[allow(clippy::module_inception)]
mod issuer;
mod keystore;

pub use issuer::Issuer;
pub(crate) use keystore::{KeyQuery, KeyStore};
