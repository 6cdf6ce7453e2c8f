use std::collections::HashMap;

use josekit::jwk::Jwk;
use tracing::debug;

use crate::client::Client;
use crate::helpers::{convert_json_to, validate_url};
use crate::http::request_async;
use crate::jwks::Jwks;
use crate::types::{
    ClientMetadata, ClientOptions, HttpMethod, HttpRequest, HttpResponse, IssuerMetadata,
    MtlsEndpoints, RpError, RpHttpClient, RpReturnType,
};

use super::{KeyQuery, KeyStore};

const WELL_KNOWN_SUFFIX: &str = "/.well-known/openid-configuration";

/// # Issuer
/// Holds the discovered Authorization Server metadata. Immutable once
/// discovered; one instance can serve multiple [Client]s.
#[derive(Debug, Clone)]
pub struct Issuer {
    /// Issuer identifier, exactly as published
    pub(crate) issuer: String,
    pub(crate) authorization_endpoint: Option<String>,
    pub(crate) token_endpoint: Option<String>,
    pub(crate) device_authorization_endpoint: Option<String>,
    pub(crate) pushed_authorization_request_endpoint: Option<String>,
    pub(crate) jwks_uri: Option<String>,
    pub(crate) token_endpoint_auth_methods_supported: Option<Vec<String>>,
    pub(crate) token_endpoint_auth_signing_alg_values_supported: Option<Vec<String>>,
    pub(crate) authorization_response_iss_parameter_supported: Option<bool>,
    pub(crate) dpop_signing_alg_values_supported: Option<Vec<String>>,
    pub(crate) mtls_endpoint_aliases: Option<MtlsEndpoints>,
    pub(crate) other_fields: HashMap<String, serde_json::Value>,
    pub(crate) keystore: KeyStore,
}

impl Issuer {
    /// ## Issuer
    ///
    /// Creates an [Issuer] from already obtained [IssuerMetadata], skipping
    /// discovery. No issuer equality check is possible on this path; the
    /// caller vouches for the metadata.
    pub fn new(metadata: IssuerMetadata) -> Self {
        let keystore = KeyStore::new(metadata.jwks_uri.clone());

        Self {
            issuer: metadata.issuer,
            authorization_endpoint: metadata.authorization_endpoint,
            token_endpoint: metadata.token_endpoint,
            device_authorization_endpoint: metadata.device_authorization_endpoint,
            pushed_authorization_request_endpoint: metadata.pushed_authorization_request_endpoint,
            jwks_uri: metadata.jwks_uri,
            token_endpoint_auth_methods_supported: metadata.token_endpoint_auth_methods_supported,
            token_endpoint_auth_signing_alg_values_supported: metadata
                .token_endpoint_auth_signing_alg_values_supported,
            authorization_response_iss_parameter_supported: metadata
                .authorization_response_iss_parameter_supported,
            dpop_signing_alg_values_supported: metadata.dpop_signing_alg_values_supported,
            mtls_endpoint_aliases: metadata.mtls_endpoint_aliases,
            other_fields: metadata.other_fields,
            keystore,
        }
    }

    /// ## Discover Issuer
    ///
    /// Fetches and parses the metadata document of `issuer`, resolving the
    /// `.well-known/openid-configuration` location when the url does not
    /// already point at one.
    ///
    /// The `issuer` field of the document must equal the requested issuer
    /// string exactly. A difference as small as a trailing slash is a
    /// configuration error; nothing is normalized.
    pub async fn discover_async<T>(issuer: &str, http_client: &T) -> RpReturnType<Issuer>
    where
        T: RpHttpClient,
    {
        let req = Self::build_discover_request(issuer)?;

        let res = request_async(req, http_client).await?;

        Self::process_discover_response(issuer, res)
    }

    fn build_discover_request(issuer: &str) -> RpReturnType<HttpRequest> {
        let mut url = validate_url(issuer)?;

        let mut path = url.path().to_string();
        if path.ends_with('/') {
            path.pop();
        }

        if path.ends_with(".well-known") {
            path.push_str("/openid-configuration");
        } else if !path.contains(".well-known") {
            path.push_str(WELL_KNOWN_SUFFIX);
        }

        url.set_path(&path);

        debug!(url = %url, "discovering issuer metadata");

        Ok(HttpRequest::new()
            .url(url)
            .method(HttpMethod::GET)
            .header("accept", "application/json")
            .expect_body(true)
            .expect_json_body(true)
            .expect_status_code(200))
    }

    fn process_discover_response(
        requested_issuer: &str,
        response: HttpResponse,
    ) -> RpReturnType<Issuer> {
        let body = response.body.as_deref().unwrap_or_default();

        let metadata = match convert_json_to::<IssuerMetadata>(body) {
            Ok(metadata) => metadata,
            Err(_) => {
                return Err(Box::new(RpError::new_configuration_error(
                    "the discovery document could not be parsed as issuer metadata",
                    Some(response),
                )))
            }
        };

        let expected_issuer = requested_issuer
            .strip_suffix(WELL_KNOWN_SUFFIX)
            .unwrap_or(requested_issuer);

        if metadata.issuer != expected_issuer {
            return Err(Box::new(RpError::new_configuration_error(
                &format!(
                    "issuer mismatch, expected {expected_issuer}, got: {}",
                    metadata.issuer
                ),
                Some(response),
            )));
        }

        Ok(Issuer::new(metadata))
    }

    /// The issuer identifier
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// ## Client from Issuer
    ///
    /// Creates a [Client] bound to this issuer. See [Client::new].
    pub fn client(
        &self,
        metadata: ClientMetadata,
        private_jwks: Option<Jwks>,
        options: Option<ClientOptions>,
    ) -> RpReturnType<Client> {
        Client::new(self.clone(), metadata, private_jwks, options)
    }

    pub(crate) async fn query_keystore_async<T>(
        &mut self,
        query: KeyQuery,
        http_client: &T,
    ) -> RpReturnType<Vec<Jwk>>
    where
        T: RpHttpClient,
    {
        self.keystore.query_async(query, http_client).await
    }
}
