use std::collections::HashMap;
use std::time::{Duration, SystemTime};

use base64::{engine::general_purpose, Engine};
use josekit::{
    jws::{self, JwsHeader},
    jwt::JwtPayload,
};
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;
use url::Url;

use crate::helpers::generate_random;
use crate::http::request_async;
use crate::jwks::{signer_for, CustomJwk};
use crate::types::{
    ClientMetadata, HttpMethod, HttpRequest, HttpResponse, RpError, RpHttpClient, RpReturnType,
};
use crate::{issuer::Issuer, jwks::Jwks};

use super::{Client, DpopHandle};

lazy_static! {
    static ref HS_REGEX: Regex = Regex::new("^HS(?:256|384|512)$").unwrap();
}

const JWT_BEARER: &str = "urn:ietf:params:oauth:client-assertion-type:jwt-bearer";

/// # ClientAuthentication
/// The strategies a client can authenticate to protected endpoints with
/// (token, device authorization, pushed authorization request). A closed
/// union: adding a method is a new variant, and each variant owns only the
/// material it needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientAuthentication {
    /// Public client, contributes only `client_id`
    None,
    /// HTTP Basic credentials built from the form encoded id and secret
    SecretBasic {
        /// The shared client secret
        client_secret: String,
    },
    /// `client_id` and `client_secret` as body parameters
    SecretPost {
        /// The shared client secret
        client_secret: String,
    },
    /// Assertion JWT signed with an HS key derived from the client secret
    SecretJwt {
        /// The shared client secret
        client_secret: String,
    },
    /// Assertion JWT signed with a private key out of the client's JWKS
    PrivateKeyJwt {
        /// Key id selecting the signing key. When absent the first key
        /// matching the resolved algorithm is used.
        key_id: Option<String>,
    },
    /// Authentication is the self-signed mutual TLS channel; contributes only
    /// `client_id` and never a secret
    SelfSignedTlsClientAuth,
    /// Authentication is the PKI mutual TLS channel; contributes only
    /// `client_id` and never a secret
    TlsClientAuth,
}

impl ClientAuthentication {
    /// The registered method name of the variant
    pub fn method(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::SecretBasic { .. } => "client_secret_basic",
            Self::SecretPost { .. } => "client_secret_post",
            Self::SecretJwt { .. } => "client_secret_jwt",
            Self::PrivateKeyJwt { .. } => "private_key_jwt",
            Self::SelfSignedTlsClientAuth => "self_signed_tls_client_auth",
            Self::TlsClientAuth => "tls_client_auth",
        }
    }

    /// Whether the variant authenticates over the mutual TLS channel
    pub fn is_tls(&self) -> bool {
        matches!(self, Self::SelfSignedTlsClientAuth | Self::TlsClientAuth)
    }

    pub(crate) fn resolve(
        metadata: &ClientMetadata,
        issuer: &Issuer,
        private_jwks: Option<&Jwks>,
    ) -> RpReturnType<Self> {
        let method = metadata
            .token_endpoint_auth_method
            .as_deref()
            .unwrap_or("client_secret_basic");

        if let Some(supported) = &issuer.token_endpoint_auth_methods_supported {
            if !supported.iter().any(|m| m == method) {
                return Err(Box::new(RpError::new_configuration_error(
                    &format!(
                        "token_endpoint_auth_method {method} is not supported by the issuer"
                    ),
                    None,
                )));
            }
        }

        let secret = || {
            metadata.client_secret.clone().ok_or_else(|| {
                Box::new(RpError::new_configuration_error(
                    &format!("{method} client authentication method requires a client_secret"),
                    None,
                ))
            })
        };

        match method {
            "none" => Ok(Self::None),
            "client_secret_basic" => Ok(Self::SecretBasic {
                client_secret: secret()?,
            }),
            "client_secret_post" => Ok(Self::SecretPost {
                client_secret: secret()?,
            }),
            "client_secret_jwt" => Ok(Self::SecretJwt {
                client_secret: secret()?,
            }),
            "private_key_jwt" => {
                if private_jwks.is_none() {
                    return Err(Box::new(RpError::new_configuration_error(
                        "no client jwks provided for signing a client assertion with",
                        None,
                    )));
                }

                Ok(Self::PrivateKeyJwt {
                    key_id: metadata.token_endpoint_auth_key_id.clone(),
                })
            }
            "self_signed_tls_client_auth" => Ok(Self::SelfSignedTlsClientAuth),
            "tls_client_auth" => Ok(Self::TlsClientAuth),
            _ => Err(Box::new(RpError::new_configuration_error(
                &format!("unsupported token_endpoint_auth_method {method}"),
                None,
            ))),
        }
    }
}

/// The contribution of a [ClientAuthentication] variant to one outgoing
/// request.
#[derive(Debug, Default)]
pub(crate) struct AuthContribution {
    pub(crate) headers: HashMap<String, Vec<String>>,
    pub(crate) form: HashMap<String, String>,
}

/// Endpoints a client authenticates against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AuthenticatedEndpoint {
    Token,
    DeviceAuthorization,
    PushedAuthorizationRequest,
}

pub(crate) struct AuthenticationPostParams<'a> {
    pub(crate) client_assertion_payload: Option<&'a HashMap<String, Value>>,
    pub(crate) dpop: Option<&'a DpopHandle>,
}

impl Client {
    /// Produces the authentication contribution of the configured strategy
    /// for a single request to a protected endpoint.
    pub(crate) fn auth_for(
        &self,
        client_assertion_payload: Option<&HashMap<String, Value>>,
    ) -> RpReturnType<AuthContribution> {
        let mut contribution = AuthContribution::default();

        match &self.auth {
            ClientAuthentication::None
            | ClientAuthentication::SelfSignedTlsClientAuth
            | ClientAuthentication::TlsClientAuth => {
                contribution
                    .form
                    .insert("client_id".to_owned(), self.client_id.clone());
            }
            ClientAuthentication::SecretPost { client_secret } => {
                contribution
                    .form
                    .insert("client_id".to_owned(), self.client_id.clone());
                contribution
                    .form
                    .insert("client_secret".to_owned(), client_secret.clone());
            }
            ClientAuthentication::SecretBasic { client_secret } => {
                let encoded = format!(
                    "{}:{}",
                    urlencoding::encode(&self.client_id),
                    urlencoding::encode(client_secret)
                )
                .replace("%20", "+");

                let b64 = general_purpose::STANDARD.encode(encoded);

                contribution
                    .headers
                    .insert("authorization".to_owned(), vec![format!("Basic {b64}")]);
            }
            ClientAuthentication::SecretJwt { .. } | ClientAuthentication::PrivateKeyJwt { .. } => {
                let assertion = self.client_assertion(client_assertion_payload)?;

                contribution
                    .form
                    .insert("client_id".to_owned(), self.client_id.clone());
                contribution
                    .form
                    .insert("client_assertion".to_owned(), assertion);
                contribution
                    .form
                    .insert("client_assertion_type".to_owned(), JWT_BEARER.to_owned());
            }
        }

        Ok(contribution)
    }

    fn client_assertion(
        &self,
        client_assertion_payload: Option<&HashMap<String, Value>>,
    ) -> RpReturnType<String> {
        let iat = (self.now)();
        let exp = iat + 60;

        let mut payload = JwtPayload::new();

        if let Some(i) = SystemTime::UNIX_EPOCH.checked_add(Duration::from_secs(iat)) {
            payload.set_issued_at(&i);
        }

        if let Some(e) = SystemTime::UNIX_EPOCH.checked_add(Duration::from_secs(exp)) {
            payload.set_expires_at(&e);
        }

        payload.set_jwt_id(generate_random(None));
        payload.set_issuer(&self.client_id);
        payload.set_subject(&self.client_id);

        let mut audience = vec![self.issuer.issuer.clone()];
        if let Some(token_endpoint) = &self.issuer.token_endpoint {
            audience.push(token_endpoint.clone());
        }
        payload.set_audience(audience);

        if let Some(extra) = client_assertion_payload {
            for (k, v) in extra {
                payload.set_claim(k, Some(v.to_owned())).map_err(|_| {
                    RpError::new_configuration_error(
                        &format!("invalid client assertion claim value for {k}"),
                        None,
                    )
                })?;
            }
        }

        match &self.auth {
            ClientAuthentication::SecretJwt { .. } => {
                let alg = match &self.token_endpoint_auth_signing_alg {
                    Some(alg) => alg.clone(),
                    None => self
                        .issuer
                        .token_endpoint_auth_signing_alg_values_supported
                        .as_ref()
                        .and_then(|algs| algs.iter().find(|a| HS_REGEX.is_match(a)))
                        .cloned()
                        .ok_or_else(|| {
                            RpError::new_configuration_error(
                                "failed to determine a JWS algorithm to use for the client assertion",
                                None,
                            )
                        })?,
                };

                let mut header = JwsHeader::new();
                header.set_algorithm(&alg);

                let signer = self.secret_for_alg(&alg)?.to_signer()?;

                serialize_assertion(&payload, &header, &*signer)
            }
            ClientAuthentication::PrivateKeyJwt { key_id } => {
                let jwks = self.private_jwks.as_ref().ok_or_else(|| {
                    RpError::new_configuration_error(
                        "no client jwks provided for signing a client assertion with",
                        None,
                    )
                })?;

                let alg = match &self.token_endpoint_auth_signing_alg {
                    Some(alg) => alg.clone(),
                    None => self
                        .issuer
                        .token_endpoint_auth_signing_alg_values_supported
                        .as_ref()
                        .and_then(|algs| {
                            algs.iter().find(|alg| {
                                jwks.get(
                                    Some(alg.to_string()),
                                    Some("sig".to_string()),
                                    key_id.clone(),
                                )
                                .is_ok_and(|keys| !keys.is_empty())
                            })
                        })
                        .cloned()
                        .ok_or_else(|| {
                            RpError::new_configuration_error(
                                "failed to determine a JWS algorithm to use for the client assertion",
                                None,
                            )
                        })?,
                };

                let keys = jwks.get(
                    Some(alg.clone()),
                    Some("sig".to_string()),
                    key_id.clone(),
                )?;
                let key = keys.first().ok_or_else(|| {
                    RpError::new_configuration_error(
                        &format!(
                            "no key found in client jwks to sign a client assertion with using alg {alg}"
                        ),
                        None,
                    )
                })?;

                let mut header = JwsHeader::new();
                header.set_algorithm(&alg);
                if let Some(kid) = key.key_id() {
                    header.set_key_id(kid);
                }

                let signer = signer_for(&alg, key)?;

                serialize_assertion(&payload, &header, &*signer)
            }
            _ => Err(Box::new(RpError::new_configuration_error(
                &format!(
                    "{} does not use a client assertion",
                    self.auth.method()
                ),
                None,
            ))),
        }
    }

    fn endpoint_target(
        &self,
        endpoint: AuthenticatedEndpoint,
        mtls: bool,
    ) -> RpReturnType<Url> {
        let aliases = self.issuer.mtls_endpoint_aliases.as_ref();

        let mut target: Option<&String> = None;

        if mtls {
            target = match endpoint {
                AuthenticatedEndpoint::Token => aliases.and_then(|a| a.token_endpoint.as_ref()),
                AuthenticatedEndpoint::DeviceAuthorization => {
                    aliases.and_then(|a| a.device_authorization_endpoint.as_ref())
                }
                AuthenticatedEndpoint::PushedAuthorizationRequest => {
                    aliases.and_then(|a| a.pushed_authorization_request_endpoint.as_ref())
                }
            };
        }

        if target.is_none() {
            target = match endpoint {
                AuthenticatedEndpoint::Token => self.issuer.token_endpoint.as_ref(),
                AuthenticatedEndpoint::DeviceAuthorization => {
                    self.issuer.device_authorization_endpoint.as_ref()
                }
                AuthenticatedEndpoint::PushedAuthorizationRequest => {
                    self.issuer.pushed_authorization_request_endpoint.as_ref()
                }
            };
        }

        match target.map(|t| Url::parse(t)) {
            Some(Ok(url)) => Ok(url),
            _ => Err(Box::new(RpError::new_configuration_error(
                "endpoint does not exist on the issuer",
                None,
            ))),
        }
    }

    /// Sends an authenticated POST to a protected endpoint, merging the
    /// authentication contribution into the form body and honoring the mTLS
    /// endpoint aliases for TLS based authentication.
    pub(crate) async fn authenticated_post_async<T>(
        &mut self,
        endpoint: AuthenticatedEndpoint,
        form: HashMap<String, String>,
        expect_status: u16,
        params: AuthenticationPostParams<'_>,
        http_client: &T,
    ) -> RpReturnType<HttpResponse>
    where
        T: RpHttpClient,
    {
        let contribution = self.auth_for(params.client_assertion_payload)?;

        let mut merged = contribution.form;
        merged.extend(form);

        let mtls = self.auth.is_tls()
            || (endpoint == AuthenticatedEndpoint::Token
                && self.tls_client_certificate_bound_access_tokens);

        let url = self.endpoint_target(endpoint, mtls)?;

        let mut req = HttpRequest::new()
            .url(url)
            .method(HttpMethod::POST)
            .header("accept", "application/json")
            .form(merged)
            .mtls(mtls)
            .expect_status_code(expect_status);

        for (name, values) in contribution.headers {
            req = req.header_replace(name, values);
        }

        self.instance_request_async(req, params.dpop, None, http_client)
            .await
    }

    pub(crate) async fn instance_request_async<T>(
        &self,
        mut req: HttpRequest,
        dpop: Option<&DpopHandle>,
        access_token: Option<&str>,
        http_client: &T,
    ) -> RpReturnType<HttpResponse>
    where
        T: RpHttpClient,
    {
        self.generate_dpop_header(&mut req, dpop, access_token)?;

        let url = req.url.clone();

        match request_async(req, http_client).await {
            Ok(res) => {
                if let Some(handle) = dpop {
                    handle.extract_server_dpop_nonce(&url, &res);
                }

                Ok(res)
            }
            Err(e) => {
                if let (Some(handle), Some(res)) = (dpop, e.response()) {
                    handle.extract_server_dpop_nonce(&url, res);
                }

                Err(e)
            }
        }
    }
}

fn serialize_assertion(
    payload: &JwtPayload,
    header: &JwsHeader,
    signer: &dyn jws::JwsSigner,
) -> RpReturnType<String> {
    let payload_bytes = serde_json::to_vec(payload.claims_set()).map_err(|_| {
        RpError::new_configuration_error("could not serialize the client assertion payload", None)
    })?;

    jws::serialize_compact(&payload_bytes, header, signer).map_err(|_| {
        Box::new(RpError::new_configuration_error(
            "error while signing the client assertion",
            None,
        ))
    })
}
