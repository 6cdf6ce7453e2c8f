use std::collections::HashMap;

use serde::Deserialize;

/// # MtlsEndpoints
/// [OAuth 2.0 Mutual-TLS Client Authentication and Certificate-Bound Access Tokens](https://datatracker.ietf.org/doc/html/rfc8705)
#[derive(Deserialize, Debug, Clone, Default)]
pub struct MtlsEndpoints {
    /// mTLS token endpoint
    pub token_endpoint: Option<String>,
    /// mTLS device authorization endpoint
    pub device_authorization_endpoint: Option<String>,
    /// mTLS pushed authorization request endpoint
    pub pushed_authorization_request_endpoint: Option<String>,
}

/// # IssuerMetadata
/// The Authorization Server metadata document, as published at
/// `.well-known/openid-configuration`. [RFC 8414](https://www.rfc-editor.org/rfc/rfc8414.html#section-2).
#[derive(Debug, Deserialize, Default, Clone)]
pub struct IssuerMetadata {
    /// Issuer identifier. Must equal the url the document was discovered from.
    pub issuer: String,
    /// [Authorization Endpoint](https://www.rfc-editor.org/rfc/rfc6749#section-3.1)
    pub authorization_endpoint: Option<String>,
    /// [Token Endpoint](https://www.rfc-editor.org/rfc/rfc6749#section-3.2)
    pub token_endpoint: Option<String>,
    /// [Device Authorization Endpoint](https://www.rfc-editor.org/rfc/rfc8628#section-3.1)
    pub device_authorization_endpoint: Option<String>,
    /// [Pushed Authorization Request Endpoint](https://www.rfc-editor.org/rfc/rfc9126#section-5)
    pub pushed_authorization_request_endpoint: Option<String>,
    /// URL of the authorization server's JWK Set
    pub jwks_uri: Option<String>,
    /// Client authentication methods supported by the token endpoint
    pub token_endpoint_auth_methods_supported: Option<Vec<String>>,
    /// JWS algorithms supported for client authentication assertions
    pub token_endpoint_auth_signing_alg_values_supported: Option<Vec<String>>,
    /// JWS algorithms the server signs ID Tokens with
    pub id_token_signing_alg_values_supported: Option<Vec<String>>,
    /// JWS algorithms supported for [Request Objects](https://www.rfc-editor.org/rfc/rfc9101)
    pub request_object_signing_alg_values_supported: Option<Vec<String>>,
    /// Whether the server returns its identifier as an `iss` authorization
    /// response parameter. [RFC 9207](https://www.rfc-editor.org/rfc/rfc9207)
    pub authorization_response_iss_parameter_supported: Option<bool>,
    /// JWS algorithms supported for DPoP proof JWTs
    pub dpop_signing_alg_values_supported: Option<Vec<String>>,
    /// Alternative endpoints for mTLS clients. See [MtlsEndpoints]
    pub mtls_endpoint_aliases: Option<MtlsEndpoints>,
    /// Any extra data that was read from the discovery document
    #[serde(flatten)]
    pub other_fields: HashMap<String, serde_json::Value>,
}
