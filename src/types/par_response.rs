use serde::Deserialize;

/// # ParResponse
/// Successful response of the pushed authorization request endpoint.
/// [RFC 9126](https://www.rfc-editor.org/rfc/rfc9126#section-2.2)
#[derive(Deserialize, Debug, Clone)]
pub struct ParResponse {
    /// The request uri standing in for the pushed parameters
    pub request_uri: String,
    /// Lifetime of the request uri in seconds
    pub expires_in: u64,
}
