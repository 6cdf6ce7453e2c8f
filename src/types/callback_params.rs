use std::collections::HashMap;

use josekit::jwt::JwtPayload;
use serde_json::Value;

use crate::client::DpopHandle;

/// # CallbackParams
/// Parameters of the authorization response, parsed from the redirect uri
/// (query or fragment), a form post body, or an unwrapped JARM payload.
#[derive(Debug, Default, Clone)]
pub struct CallbackParams {
    /// `access_token` (implicit/hybrid responses)
    pub access_token: Option<String>,
    /// Authorization code
    pub code: Option<String>,
    /// OAuth error code
    pub error: Option<String>,
    /// OAuth error description
    pub error_description: Option<String>,
    /// OAuth error uri
    pub error_uri: Option<String>,
    /// Access token expiry (implicit/hybrid responses)
    pub expires_in: Option<String>,
    /// ID Token (implicit/hybrid responses)
    pub id_token: Option<String>,
    /// Issuer identifier ([RFC 9207](https://www.rfc-editor.org/rfc/rfc9207))
    pub iss: Option<String>,
    /// JARM response JWT
    pub response: Option<String>,
    /// Session state (session management)
    pub session_state: Option<String>,
    /// Echoed `state`
    pub state: Option<String>,
    /// Token type (implicit/hybrid responses)
    pub token_type: Option<String>,
    /// Any other parameters
    pub other: Option<HashMap<String, String>>,
}

impl CallbackParams {
    pub(crate) fn from_pairs(pairs: impl Iterator<Item = (String, String)>) -> Self {
        let mut params = CallbackParams::default();
        let mut other = HashMap::new();

        for (k, v) in pairs {
            match k.as_str() {
                "access_token" => params.access_token = Some(v),
                "code" => params.code = Some(v),
                "error" => params.error = Some(v),
                "error_description" => params.error_description = Some(v),
                "error_uri" => params.error_uri = Some(v),
                "expires_in" => params.expires_in = Some(v),
                "id_token" => params.id_token = Some(v),
                "iss" => params.iss = Some(v),
                "response" => params.response = Some(v),
                "session_state" => params.session_state = Some(v),
                "state" => params.state = Some(v),
                "token_type" => params.token_type = Some(v),
                _ => {
                    other.insert(k, v);
                }
            }
        }

        if !other.is_empty() {
            params.other = Some(other);
        }

        params
    }

    pub(crate) fn from_jwt_payload(payload: &JwtPayload) -> Self {
        let pairs = payload.claims_set().iter().filter_map(|(k, v)| {
            let value = match v {
                Value::String(s) => s.to_owned(),
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                _ => return None,
            };
            Some((k.to_owned(), value))
        });

        Self::from_pairs(pairs)
    }
}

/// # CallbackChecks
/// The expectations the authorization response is validated against. These
/// are the values generated when the authorization url was built.
#[derive(Debug, Default)]
pub struct CallbackChecks<'a> {
    /// The `state` sent with the authorization request
    pub state: Option<&'a str>,
    /// The `nonce` sent with the authorization request
    pub nonce: Option<&'a str>,
    /// The PKCE code verifier whose challenge was sent with the request
    pub code_verifier: Option<&'a str>,
    /// The response type requested, to validate response shape consistency
    pub response_type: Option<&'a str>,
    /// Maximum authentication age, enforces `auth_time`
    pub max_age: Option<u64>,
    /// Expect a JARM response regardless of client options
    pub jarm: Option<bool>,
}

/// # CallbackExtras
/// Additional material forwarded to the code exchange.
#[derive(Debug, Default)]
pub struct CallbackExtras<'a> {
    /// Extra body parameters for the token request
    pub exchange_body: Option<HashMap<String, String>>,
    /// Extra claims merged into the client authentication assertion
    pub client_assertion_payload: Option<HashMap<String, Value>>,
    /// DPoP handle of this flow
    pub dpop: Option<&'a DpopHandle>,
}
