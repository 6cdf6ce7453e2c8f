#![warn(missing_docs)]
//! # oidc-rp
//!
//! An OAuth 2.0 / OpenID Connect Relying Party engine. Given a discovered
//! Authorization Server configuration and client credentials it builds
//! authorization requests (plain, JAR, PAR), exchanges authorization codes
//! and device codes for tokens, and cryptographically validates every
//! security relevant response before the caller sees it.
//!
//! ## Issuer API
//!
//! - [issuer::Issuer::new]
//! - [issuer::Issuer::discover_async]
//! - [issuer::Issuer::client]
//!
//! ## Client
//!
//! - [client::Client::authorization_url]
//! - [client::Client::request_object]
//! - [client::Client::pushed_authorization_request_async]
//! - [client::Client::par_authorization_url_async]
//! - [client::Client::callback_params]
//! - [client::Client::callback_async]
//! - [client::Client::grant_async]
//! - [client::Client::refresh_async]
//! - [client::Client::device_authorization_async]
//!
//! ## Device Flow
//!
//! - [client::DeviceFlowHandle::poll_async]
//! - [client::DeviceFlowHandle::grant_async]
//! - [client::DeviceFlowHandle::abort_handle]
//!
//! ## DPoP
//!
//! - [client::DpopHandle::new]

pub mod client;
pub mod helpers;
mod http;
#[cfg(feature = "http_client")]
pub mod http_client;
pub mod issuer;
pub mod jwks;
#[cfg(test)]
mod tests;
/// TokenSet Module
pub mod tokenset;
pub mod types;

/// Re exports from the crate
pub mod re_exports {
    pub use josekit::{self};
    pub use serde_json::{self, json, Value};
    pub use url;
}
