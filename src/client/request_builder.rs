use std::collections::HashMap;

use josekit::{
    jws::{self, JwsHeader},
};
use serde_json::json;
use tracing::debug;
use url::{form_urlencoded, Url};

use crate::helpers::{convert_json_to, generate_random};
use crate::jwks::signer_for;
use crate::types::{
    AuthorizationParameters, CallbackExtras, ParResponse, RpError, RpHttpClient, RpReturnType,
};

use super::auth::{AuthenticatedEndpoint, AuthenticationPostParams};
use super::Client;

const REQUEST_OBJECT_TYP: &str = "oauth-authz-req+jwt";

impl Client {
    /// # Authorization Url
    /// Builds the authorization url for `parameters`, merged over the
    /// client's defaults (`client_id`, `scope=openid`, the sole registered
    /// `response_type`/`redirect_uri` when unambiguous).
    ///
    /// The url is returned for the caller to redirect the user to; the
    /// builder never performs the redirect itself.
    pub fn authorization_url(
        &self,
        parameters: AuthorizationParameters,
    ) -> RpReturnType<Url> {
        let mut authorization_endpoint = self.get_auth_endpoint()?;

        let mut query_params: HashMap<String, String> = authorization_endpoint
            .query_pairs()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

        let params_query: HashMap<String, String> =
            self.authorization_params(parameters).into();

        query_params.extend(params_query);

        authorization_endpoint.set_query(None);

        if !query_params.is_empty() {
            let mut serializer = form_urlencoded::Serializer::new(String::new());
            let mut scope = None;

            for (key, value) in &query_params {
                if key == "scope" {
                    scope = Some(urlencoding::encode(value).to_string());
                    continue;
                }
                serializer.append_pair(key, value);
            }

            let mut query = serializer.finish();

            if let Some(scope) = scope {
                query.push_str(&format!("&scope={scope}"));
            }

            authorization_endpoint.set_query(Some(query.trim_start_matches('&')));
        }

        Ok(authorization_endpoint)
    }

    /// # Request Object
    /// Wraps `parameters` into a request object JWT
    /// (`typ=oauth-authz-req+jwt`) carrying `iss`, `aud`, `client_id`, a
    /// fresh `jti` and a five minute validity window, signed per
    /// `request_object_signing_alg`. Without a configured algorithm the
    /// object is issued unsecured (`alg=none`).
    pub fn request_object(
        &self,
        parameters: AuthorizationParameters,
    ) -> RpReturnType<String> {
        let params: HashMap<String, String> = self.authorization_params(parameters).into();

        let mut request_object = json!({});

        for (k, v) in params {
            request_object[k] = json!(v);
        }

        let unix = (self.now)();

        request_object["iss"] = json!(self.client_id);
        request_object["aud"] = json!(self.issuer.issuer);
        request_object["client_id"] = json!(self.client_id);
        request_object["jti"] = json!(generate_random(None));
        request_object["iat"] = json!(unix);
        request_object["exp"] = json!(unix + 300);

        let payload = request_object.to_string();

        let alg = self
            .request_object_signing_alg
            .clone()
            .unwrap_or_else(|| "none".to_string());

        if alg == "none" {
            let encoded_header = base64_url::encode(&format!(
                "{{\"alg\":\"none\",\"typ\":\"{REQUEST_OBJECT_TYP}\"}}"
            ));
            let encoded_payload = base64_url::encode(&payload);

            return Ok(format!("{encoded_header}.{encoded_payload}."));
        }

        let key = if alg.starts_with("HS") {
            self.secret_for_alg(&alg)?
        } else {
            let jwks = self.private_jwks.as_ref().ok_or_else(|| {
                RpError::new_configuration_error(
                    &format!("no keystore present for client, cannot sign using alg {alg}"),
                    None,
                )
            })?;

            jwks.get(Some(alg.clone()), Some("sig".to_string()), None)?
                .first()
                .map(|k| (*k).clone())
                .ok_or_else(|| {
                    RpError::new_configuration_error(
                        &format!("no key to sign with found for alg {alg}"),
                        None,
                    )
                })?
        };

        let mut header = JwsHeader::new();
        header.set_algorithm(&alg);
        header.set_token_type(REQUEST_OBJECT_TYP);

        if !alg.starts_with("HS") {
            if let Some(kid) = key.key_id() {
                header.set_key_id(kid);
            }
        }

        let signer = signer_for(&alg, &key)?;

        jws::serialize_compact(payload.as_bytes(), &header, &*signer).map_err(|_| {
            Box::new(RpError::new_configuration_error(
                "error while signing the request object",
                None,
            ))
        })
    }

    /// # Pushed Authorization Request
    /// POSTs `parameters` (or a prebuilt `request` object) to the issuer's
    /// pushed authorization request endpoint, authenticated with the
    /// configured strategy, and returns the short lived `request_uri`.
    pub async fn pushed_authorization_request_async<T>(
        &mut self,
        http_client: &T,
        parameters: Option<AuthorizationParameters>,
        extras: Option<CallbackExtras<'_>>,
    ) -> RpReturnType<ParResponse>
    where
        T: RpHttpClient,
    {
        if self
            .issuer
            .pushed_authorization_request_endpoint
            .is_none()
        {
            return Err(Box::new(RpError::new_configuration_error(
                "pushed_authorization_request_endpoint must be configured on the issuer",
                None,
            )));
        }

        let auth_params = parameters.unwrap_or_default();

        let mut body = if auth_params.request.is_some() {
            auth_params
        } else {
            self.authorization_params(auth_params)
        };

        body.client_id = Some(self.client_id.clone());

        let form: HashMap<String, String> = body.into();

        let extras = extras.unwrap_or_default();

        let auth_post_params = AuthenticationPostParams {
            client_assertion_payload: extras.client_assertion_payload.as_ref(),
            dpop: extras.dpop,
        };

        let res = self
            .authenticated_post_async(
                AuthenticatedEndpoint::PushedAuthorizationRequest,
                form,
                201,
                auth_post_params,
                http_client,
            )
            .await?;

        let par_response = res
            .body
            .as_deref()
            .and_then(|b| convert_json_to::<ParResponse>(b).ok())
            .ok_or_else(|| {
                RpError::new_validation_error(
                    "response",
                    "expected request_uri and expires_in in the Pushed Authorization Response",
                    Some(res),
                )
            })?;

        debug!(request_uri = %par_response.request_uri, "pushed authorization request accepted");

        Ok(par_response)
    }

    /// # Authorization Url via PAR
    /// The composed front door: optionally wraps `parameters` into a signed
    /// request object (always when `require_signed_request_object` is set or
    /// a `request_object_signing_alg` is configured), pushes them to the PAR
    /// endpoint, and builds an authorization url whose only parameters are
    /// `client_id` and the returned `request_uri`.
    ///
    /// Wrapping always happens before the push, never after.
    pub async fn par_authorization_url_async<T>(
        &mut self,
        http_client: &T,
        parameters: AuthorizationParameters,
        extras: Option<CallbackExtras<'_>>,
    ) -> RpReturnType<Url>
    where
        T: RpHttpClient,
    {
        let wrap = self.options.require_signed_request_object
            || self.request_object_signing_alg.is_some();

        let pushed = if wrap {
            let request = self.request_object(parameters)?;

            AuthorizationParameters {
                request: Some(request),
                ..Default::default()
            }
        } else {
            parameters
        };

        let par_response = self
            .pushed_authorization_request_async(http_client, Some(pushed), extras)
            .await?;

        let mut url = self.get_auth_endpoint()?;

        url.query_pairs_mut()
            .clear()
            .append_pair("client_id", &self.client_id)
            .append_pair("request_uri", &par_response.request_uri);

        Ok(url)
    }

    pub(crate) fn authorization_params(
        &self,
        params: AuthorizationParameters,
    ) -> AuthorizationParameters {
        let mut new_params = AuthorizationParameters {
            client_id: Some(self.client_id.clone()),
            scope: Some(vec!["openid".to_string()]),
            response_type: self.resolve_response_type().map(|x| vec![x]),
            redirect_uri: self.resolve_redirect_uri(),
            ..Default::default()
        };

        macro_rules! merge {
            ($($field:ident),+ $(,)?) => {
                $(
                    if params.$field.is_some() {
                        new_params.$field = params.$field;
                    }
                )+
            };
        }

        merge!(
            acr_values,
            audience,
            client_id,
            code_challenge,
            code_challenge_method,
            id_token_hint,
            login_hint,
            max_age,
            nonce,
            prompt,
            redirect_uri,
            request_uri,
            request,
            resource,
            response_mode,
            response_type,
            scope,
            state,
        );

        new_params.other = params.other;

        new_params
    }

    fn resolve_response_type(&self) -> Option<String> {
        if self.response_types.len() == 1 {
            return Some(self.response_types[0].clone());
        }
        None
    }

    fn resolve_redirect_uri(&self) -> Option<String> {
        if let Some(uris) = &self.redirect_uris {
            if uris.len() == 1 {
                return Some(uris[0].clone());
            }
        }
        None
    }

    pub(crate) fn get_auth_endpoint(&self) -> RpReturnType<Url> {
        let endpoint = self.issuer.authorization_endpoint.as_ref().ok_or_else(|| {
            RpError::new_configuration_error(
                "authorization_endpoint must be configured on the issuer",
                None,
            )
        })?;

        Url::parse(endpoint).map_err(|_| {
            Box::new(RpError::new_configuration_error(
                "authorization_endpoint is an invalid url",
                None,
            ))
        })
    }
}
