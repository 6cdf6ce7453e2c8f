use std::collections::HashMap;

use josekit::jwt::JwtPayload;
use serde_json::Value;
use tracing::debug;
use url::{form_urlencoded, Url};

use crate::helpers::convert_json_to;
use crate::tokenset::{TokenSet, TokenSetParams};
use crate::types::{
    CallbackChecks, CallbackExtras, CallbackParams, GrantExtras, GrantParams, RpError,
    RpHttpClient, RpReturnType,
};

use super::auth::{AuthenticatedEndpoint, AuthenticationPostParams};
use super::id_token::{ReturnedBy, ValidateIdTokenParams};
use super::Client;

impl Client {
    /// # Callback Params
    /// Parses the authorization response parameters out of the callback url
    /// (query or fragment) or a form post body. Only one input is consumed;
    /// the url wins.
    pub fn callback_params(
        &self,
        incoming_url: Option<&Url>,
        incoming_body: Option<String>,
    ) -> RpReturnType<CallbackParams> {
        if let Some(url) = incoming_url {
            let pairs: Vec<(String, String)> = match url.query() {
                Some(_) => url
                    .query_pairs()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
                None => form_urlencoded::parse(url.fragment().unwrap_or_default().as_bytes())
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            };

            return Ok(CallbackParams::from_pairs(pairs.into_iter()));
        }

        if let Some(body) = incoming_body {
            let pairs: Vec<(String, String)> = form_urlencoded::parse(body.as_bytes())
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect();

            return Ok(CallbackParams::from_pairs(pairs.into_iter()));
        }

        Err(Box::new(RpError::new_protocol_state_error(
            "could not parse the callback, no url or body given",
            None,
        )))
    }

    /// # Callback
    /// Validates the Authorization Server's authorization response and, when
    /// an authorization code is present, exchanges it at the token endpoint.
    ///
    /// The checks run strictly in order: JARM unwrapping, the server `error`
    /// parameter, `state`, `iss`, response shape, code exchange, ID Token
    /// validation, hash bindings, DPoP token type. The first violation fails
    /// the exchange.
    pub async fn callback_async<T>(
        &mut self,
        http_client: &T,
        redirect_uri: Option<&str>,
        mut parameters: CallbackParams,
        checks: Option<CallbackChecks<'_>>,
        extras: Option<CallbackExtras<'_>>,
    ) -> RpReturnType<TokenSet>
    where
        T: RpHttpClient,
    {
        let checks = checks.unwrap_or_default();

        let jarm_expected = checks.jarm.unwrap_or(false) || self.options.require_jarm;

        if jarm_expected && parameters.response.is_none() {
            return Err(Box::new(RpError::new_validation_error(
                "response",
                "expected a JARM response",
                None,
            )));
        } else if let Some(response) = parameters.response.clone() {
            let payload = self.validate_jarm_async(&response, http_client).await?;
            parameters = CallbackParams::from_jwt_payload(&payload);
        }

        if parameters.state.is_some() && checks.state.is_none() {
            return Err(Box::new(RpError::new_protocol_state_error(
                "checks.state argument is missing",
                None,
            )));
        }

        if parameters.state.is_none() && checks.state.is_some() {
            return Err(Box::new(RpError::new_validation_error(
                "state",
                "state missing from the response",
                None,
            )));
        }

        if parameters.state.as_deref() != checks.state {
            return Err(Box::new(RpError::new_validation_error(
                "state",
                &format!(
                    "state mismatch, expected {}, got: {}",
                    checks.state.unwrap_or_default(),
                    parameters.state.as_deref().unwrap_or_default()
                ),
                None,
            )));
        }

        if let Some(iss) = &parameters.iss {
            if iss != &self.issuer.issuer {
                return Err(Box::new(RpError::new_validation_error(
                    "issuer",
                    &format!("iss mismatch, expected {}, got: {iss}", self.issuer.issuer),
                    None,
                )));
            }
        } else if self
            .issuer
            .authorization_response_iss_parameter_supported
            .is_some_and(|x| x)
            && parameters.id_token.is_none()
            && parameters.response.is_none()
        {
            return Err(Box::new(RpError::new_validation_error(
                "issuer",
                "iss missing from the response",
                None,
            )));
        }

        if let Some(error) = parameters.error.take() {
            return Err(Box::new(RpError::new_server_error(
                error,
                parameters.error_description.take(),
                parameters.error_uri.take(),
                None,
            )));
        }

        if let Some(response_type) = checks.response_type {
            for res_type in response_type.split(' ') {
                if res_type == "none"
                    && (parameters.code.is_some()
                        || parameters.id_token.is_some()
                        || parameters.access_token.is_some())
                {
                    return Err(Box::new(RpError::new_validation_error(
                        "response",
                        "unexpected params encountered for \"none\" response",
                        None,
                    )));
                }

                let message = match res_type {
                    "code" if parameters.code.is_none() => "code missing from response",
                    "token" if parameters.access_token.is_none() => {
                        "access_token missing from response"
                    }
                    "token" if parameters.token_type.is_none() => {
                        "token_type missing from response"
                    }
                    "id_token" if parameters.id_token.is_none() => "id_token missing from response",
                    _ => "",
                };

                if !message.is_empty() {
                    return Err(Box::new(RpError::new_validation_error(
                        "response", message, None,
                    )));
                }
            }
        }

        let mut front_channel_token_set = None;

        if parameters.id_token.as_ref().is_some_and(|x| !x.is_empty()) {
            let token_set = token_set_from_callback(&parameters);

            let token_set = self
                .validate_id_token_async(
                    ValidateIdTokenParams {
                        token_set,
                        returned_by: ReturnedBy::Authorization,
                        nonce: checks.nonce.map(|x| x.to_owned()),
                        max_age: checks.max_age,
                        state: checks.state.map(|x| x.to_owned()),
                    },
                    http_client,
                )
                .await?;

            if parameters.code.is_none() {
                return Ok(token_set);
            }

            front_channel_token_set = Some(token_set);
        }

        if let Some(code) = &parameters.code {
            let extras = extras.unwrap_or_default();

            let mut exchange_body = extras.exchange_body.unwrap_or_default();

            exchange_body.insert("grant_type".to_string(), "authorization_code".to_owned());
            exchange_body.insert("code".to_string(), code.to_owned());

            if let Some(ru) = redirect_uri {
                exchange_body.insert("redirect_uri".to_string(), ru.to_owned());
            }

            if let Some(cv) = checks.code_verifier {
                exchange_body.insert("code_verifier".to_string(), cv.to_owned());
            }

            let mut token_set = self
                .grant_async(
                    http_client,
                    GrantParams {
                        body: exchange_body,
                        extras: GrantExtras {
                            client_assertion_payload: extras.client_assertion_payload,
                            dpop: extras.dpop,
                        },
                        retry: true,
                    },
                )
                .await?;

            if token_set.get_id_token().is_some() {
                token_set = self
                    .validate_id_token_async(
                        ValidateIdTokenParams {
                            token_set,
                            returned_by: ReturnedBy::Token,
                            nonce: checks.nonce.map(|x| x.to_owned()),
                            max_age: checks.max_age,
                            state: checks.state.map(|x| x.to_owned()),
                        },
                        http_client,
                    )
                    .await?;
            } else if front_channel_token_set
                .as_ref()
                .is_some_and(|ts| ts.get_id_token().is_some())
            {
                // hybrid flow where only the front channel carried an id token
                let claims = front_channel_token_set
                    .as_ref()
                    .and_then(|ts| ts.claims().ok().cloned());

                if let Some(claims) = claims {
                    token_set.set_verified_claims(claims);
                }
            }

            if parameters.session_state.is_some() {
                token_set.set_session_state(parameters.session_state);
            }

            return Ok(token_set);
        }

        Ok(token_set_from_callback(&parameters))
    }

    /// # Token Grant
    /// Performs a grant at the token endpoint, authenticated with the
    /// configured [super::ClientAuthentication]. A `use_dpop_nonce` challenge
    /// is retried exactly once with the freshly observed nonce. When a DPoP
    /// handle is used the issued token type must be `DPoP`.
    #[async_recursion::async_recursion(?Send)]
    pub async fn grant_async<T>(
        &mut self,
        http_client: &T,
        params: GrantParams<'async_recursion>,
    ) -> RpReturnType<TokenSet>
    where
        T: RpHttpClient,
    {
        if self.issuer.token_endpoint.is_none() {
            return Err(Box::new(RpError::new_configuration_error(
                "token_endpoint must be configured on the issuer",
                None,
            )));
        }

        if self.options.require_dpop && params.extras.dpop.is_none() {
            return Err(Box::new(RpError::new_configuration_error(
                "a DPoP handle is required for token requests on this client",
                None,
            )));
        }

        let auth_params = AuthenticationPostParams {
            client_assertion_payload: params.extras.client_assertion_payload.as_ref(),
            dpop: params.extras.dpop,
        };

        let response = match self
            .authenticated_post_async(
                AuthenticatedEndpoint::Token,
                params.body.clone(),
                200,
                auth_params,
                http_client,
            )
            .await
            .map_err(|e| *e)
        {
            Ok(res) => res,
            Err(RpError::Server(sbe, res)) => {
                if params.retry && sbe.error == "use_dpop_nonce" {
                    debug!("retrying the token grant with the fresh DPoP nonce");

                    let params = GrantParams {
                        retry: false,
                        ..params
                    };

                    return self.grant_async(http_client, params).await;
                }

                return Err(Box::new(RpError::Server(sbe, res)));
            }
            Err(e) => return Err(Box::new(e)),
        };

        let body = response.body.clone().ok_or_else(|| {
            RpError::new_server_error(
                "server_error".to_string(),
                Some("body expected in grant response".to_string()),
                None,
                Some(response.clone()),
            )
        })?;

        let token_params = convert_json_to::<TokenSetParams>(&body).map_err(|_| {
            Box::new(RpError::new_validation_error(
                "response",
                "could not convert the grant response body to a TokenSet",
                Some(response.clone()),
            ))
        })?;

        let token_set = TokenSet::new(token_params);

        if params.extras.dpop.is_some()
            && !token_set
                .get_token_type()
                .is_some_and(|tt| tt.eq_ignore_ascii_case("DPoP"))
        {
            return Err(Box::new(RpError::new_validation_error(
                "token_type",
                &format!(
                    "expected token_type DPoP, got: {}",
                    token_set.get_token_type().unwrap_or_default()
                ),
                Some(response),
            )));
        }

        Ok(token_set)
    }

    /// # Refresh Grant
    /// Exchanges the refresh token of `token_set` for a fresh set. A returned
    /// ID Token is validated and its `sub` must match the previous one.
    pub async fn refresh_async<T>(
        &mut self,
        http_client: &T,
        token_set: TokenSet,
        extras: Option<CallbackExtras<'_>>,
    ) -> RpReturnType<TokenSet>
    where
        T: RpHttpClient,
    {
        let refresh_token = token_set.get_refresh_token().ok_or_else(|| {
            RpError::new_protocol_state_error("refresh_token not present in TokenSet", None)
        })?;

        let extras = extras.unwrap_or_default();

        let mut body = extras.exchange_body.unwrap_or_default();
        body.insert("grant_type".to_string(), "refresh_token".to_owned());
        body.insert("refresh_token".to_string(), refresh_token);

        let mut new_token_set = self
            .grant_async(
                http_client,
                GrantParams {
                    body,
                    extras: GrantExtras {
                        client_assertion_payload: extras.client_assertion_payload,
                        dpop: extras.dpop,
                    },
                    retry: true,
                },
            )
            .await?;

        if new_token_set.get_id_token().is_some() {
            new_token_set = self
                .validate_id_token_async(
                    ValidateIdTokenParams {
                        token_set: new_token_set,
                        returned_by: ReturnedBy::Token,
                        nonce: None,
                        max_age: None,
                        state: None,
                    },
                    http_client,
                )
                .await?;

            let expected_sub = match token_set.get_id_token() {
                Some(_) => token_set
                    .decode_claims()
                    .ok()
                    .and_then(|claims| claims.get("sub").and_then(|s| s.as_str().map(String::from))),
                None => None,
            };

            if let Some(expected_sub) = expected_sub {
                let new_sub = new_token_set
                    .claims()?
                    .get("sub")
                    .and_then(|s| s.as_str().map(String::from))
                    .unwrap_or_default();

                if expected_sub != new_sub {
                    return Err(Box::new(RpError::new_validation_error(
                        "subject",
                        &format!("sub mismatch, expected {expected_sub}, got: {new_sub}"),
                        None,
                    )));
                }
            }
        }

        Ok(new_token_set)
    }

    pub(crate) async fn validate_jarm_async<T>(
        &mut self,
        response: &str,
        http_client: &T,
    ) -> RpReturnType<JwtPayload>
    where
        T: RpHttpClient,
    {
        let expected_alg = self.authorization_signed_response_alg.clone();

        let (payload, _, _) = self
            .validate_jwt_async(response, &expected_alg, &["iss", "exp", "aud"], http_client)
            .await?;

        Ok(payload)
    }
}

/// Builds a [TokenSet] out of front channel callback parameters.
fn token_set_from_callback(parameters: &CallbackParams) -> TokenSet {
    let mut other_fields: HashMap<String, String> =
        parameters.other.clone().unwrap_or_default();

    if let Some(state) = &parameters.state {
        other_fields.insert("state".to_string(), state.to_owned());
    }

    if let Some(code) = &parameters.code {
        other_fields.insert("code".to_string(), code.to_owned());
    }

    let expires_at = other_fields
        .get("expires_at")
        .and_then(|eat| eat.parse::<i64>().ok());
    let scope = other_fields.get("scope").map(|s| s.to_owned());
    let session_state = parameters
        .session_state
        .clone()
        .or_else(|| other_fields.get("session_state").map(|ss| ss.to_owned()));
    let refresh_token = other_fields.get("refresh_token").map(|rt| rt.to_owned());
    let expires_in = parameters
        .expires_in
        .as_ref()
        .and_then(|exp_in| exp_in.parse::<i64>().ok());

    let mut tokenset_others = HashMap::new();

    for (k, v) in other_fields {
        tokenset_others.insert(k, Value::String(v));
    }

    TokenSet::new(TokenSetParams {
        access_token: parameters.access_token.clone(),
        token_type: parameters.token_type.clone(),
        id_token: parameters.id_token.clone(),
        refresh_token,
        expires_in,
        expires_at,
        session_state,
        scope,
        other: Some(tokenset_others),
    })
}
