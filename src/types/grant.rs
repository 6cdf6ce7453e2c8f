use std::collections::HashMap;

use serde_json::Value;

use crate::client::DpopHandle;

/// # GrantExtras
/// Additional material for a token grant.
#[derive(Debug, Default)]
pub struct GrantExtras<'a> {
    /// Extra claims merged into the client authentication assertion
    pub client_assertion_payload: Option<HashMap<String, Value>>,
    /// DPoP handle of this flow
    pub dpop: Option<&'a DpopHandle>,
}

/// # GrantParams
/// Parameters of [crate::client::Client::grant_async].
#[derive(Debug, Default)]
pub struct GrantParams<'a> {
    /// Body of the token request (`grant_type` and friends)
    pub body: HashMap<String, String>,
    /// See [GrantExtras]
    pub extras: GrantExtras<'a>,
    /// Whether a `use_dpop_nonce` challenge is retried (once) with the fresh
    /// nonce
    pub retry: bool,
}
