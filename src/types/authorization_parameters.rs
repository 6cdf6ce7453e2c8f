use std::collections::HashMap;

/// # AuthorizationParameters
/// Values serialized into an authorization request, either as query
/// parameters ([`crate::client::Client::authorization_url()`]), a signed
/// request object, or a pushed authorization request body.
#[derive(Debug, Default, Clone)]
pub struct AuthorizationParameters {
    /// [Auth Context Class Reference values](https://openid.net/specs/openid-connect-core-1_0.html#AuthRequest)
    pub acr_values: Option<Vec<String>>,
    /// Audience of the access token
    pub audience: Option<Vec<String>>,
    /// [Client Id](https://openid.net/specs/openid-connect-core-1_0.html#AuthRequest)
    pub client_id: Option<String>,
    /// [PKCE code challenge](https://datatracker.ietf.org/doc/html/rfc7636)
    pub code_challenge: Option<String>,
    /// [PKCE code challenge method](https://datatracker.ietf.org/doc/html/rfc7636)
    pub code_challenge_method: Option<String>,
    /// Hint about the ID Token the request relates to
    pub id_token_hint: Option<String>,
    /// Login hint for the authorization server
    pub login_hint: Option<String>,
    /// Maximum authentication age in seconds
    pub max_age: Option<String>,
    /// [Nonce](https://openid.net/specs/openid-connect-core-1_0.html#AuthRequest)
    pub nonce: Option<String>,
    /// [Prompt](https://openid.net/specs/openid-connect-core-1_0.html#AuthRequest)
    pub prompt: Option<Vec<String>>,
    /// Redirect uri the response will be sent to
    pub redirect_uri: Option<String>,
    /// [Request object by reference](https://www.rfc-editor.org/rfc/rfc9101#name-request-using-the-request_u)
    pub request_uri: Option<String>,
    /// [Request object by value](https://www.rfc-editor.org/rfc/rfc9101#name-passing-a-request-object-by)
    pub request: Option<String>,
    /// [Resource indicators](https://www.rfc-editor.org/rfc/rfc8693.html#section-2.1)
    pub resource: Option<Vec<String>>,
    /// Response mode (`query`, `fragment`, `jwt`, ...)
    pub response_mode: Option<String>,
    /// Response type
    pub response_type: Option<Vec<String>>,
    /// Scope
    pub scope: Option<Vec<String>>,
    /// State
    pub state: Option<String>,
    /// Other fields that will be sent with the authorization request
    pub other: Option<HashMap<String, String>>,
}

impl From<AuthorizationParameters> for HashMap<String, String> {
    fn from(val: AuthorizationParameters) -> Self {
        let mut query = HashMap::new();

        if let Some(other) = val.other {
            for (k, v) in other {
                query.entry(k).or_insert(v);
            }
        }

        insert_query(&mut query, "client_id", val.client_id);
        insert_space_delimited(&mut query, "acr_values", val.acr_values);
        insert_space_delimited(&mut query, "audience", val.audience);
        insert_query(&mut query, "code_challenge", val.code_challenge);
        insert_query(
            &mut query,
            "code_challenge_method",
            val.code_challenge_method,
        );
        insert_query(&mut query, "id_token_hint", val.id_token_hint);
        insert_query(&mut query, "login_hint", val.login_hint);
        insert_query(&mut query, "max_age", val.max_age);
        insert_query(&mut query, "nonce", val.nonce);
        insert_space_delimited(&mut query, "prompt", val.prompt);
        insert_query(&mut query, "redirect_uri", val.redirect_uri);
        insert_query(&mut query, "request_uri", val.request_uri);
        insert_query(&mut query, "request", val.request);
        insert_space_delimited(&mut query, "resource", val.resource);
        insert_query(&mut query, "response_mode", val.response_mode);
        insert_space_delimited(&mut query, "response_type", val.response_type);
        insert_space_delimited(&mut query, "scope", val.scope);
        insert_query(&mut query, "state", val.state);

        query
    }
}

fn insert_query(qp: &mut HashMap<String, String>, key: &str, value: Option<String>) {
    if let Some(v) = value {
        qp.insert(key.to_owned(), v);
    }
}

fn insert_space_delimited(qp: &mut HashMap<String, String>, key: &str, value: Option<Vec<String>>) {
    if let Some(values) = value {
        qp.insert(key.to_owned(), values.join(" "));
    }
}
