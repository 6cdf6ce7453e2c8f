use serde::{Deserialize, Serialize};

/// # ClientMetadata
/// Registered metadata of the relying party. Immutable once a
/// [crate::client::Client] has been constructed from it.
#[derive(Debug, Serialize, Deserialize, Default, Clone)]
pub struct ClientMetadata {
    /// Client Id
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    /// Client secret
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
    /// [Authentication method](https://openid.net/specs/openid-connect-registration-1_0.html#ClientMetadata)
    /// used by the client at the token endpoint. Defaults to `client_secret_basic`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_endpoint_auth_method: Option<String>,
    /// Algorithm used to sign the client authentication assertion
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_endpoint_auth_signing_alg: Option<String>,
    /// Key id of the private JWK used for `private_key_jwt` assertions
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_endpoint_auth_key_id: Option<String>,
    /// The redirect uri where authorization responses will be sent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_uri: Option<String>,
    /// A list of acceptable redirect uris
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_uris: Option<Vec<String>>,
    /// Response type used by the client
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_type: Option<String>,
    /// List of response types used by the client
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_types: Option<Vec<String>>,
    /// JWS algorithm the client expects ID Tokens to be signed with.
    /// Defaults to `RS256`. `none` is rejected at construction.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_token_signed_response_alg: Option<String>,
    /// JWS algorithm the client expects JARM responses to be signed with.
    /// Defaults to `RS256`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authorization_signed_response_alg: Option<String>,
    /// JWS algorithm used to sign request objects. When absent, request
    /// objects are issued unsecured (`alg=none`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_object_signing_alg: Option<String>,
    /// Whether access tokens are bound to the mutual TLS certificate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tls_client_certificate_bound_access_tokens: Option<bool>,
}
