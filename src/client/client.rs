use josekit::jwk::Jwk;

use crate::helpers::now;
use crate::issuer::Issuer;
use crate::jwks::Jwks;
use crate::types::{ClientMetadata, ClientOptions, RpError, RpReturnType};

use super::auth::ClientAuthentication;

/// # Client
/// One logical relying party: the discovered [Issuer], the registered client
/// metadata, the resolved [ClientAuthentication] and the execution
/// [ClientOptions]. Immutable after construction; one instance drives one
/// flow at a time.
#[derive(Debug, Clone)]
pub struct Client {
    pub(crate) client_id: String,
    pub(crate) client_secret: Option<String>,
    pub(crate) auth: ClientAuthentication,
    pub(crate) token_endpoint_auth_signing_alg: Option<String>,
    pub(crate) redirect_uris: Option<Vec<String>>,
    pub(crate) response_types: Vec<String>,
    pub(crate) id_token_signed_response_alg: String,
    pub(crate) authorization_signed_response_alg: String,
    pub(crate) request_object_signing_alg: Option<String>,
    pub(crate) tls_client_certificate_bound_access_tokens: bool,
    pub(crate) private_jwks: Option<Jwks>,
    pub(crate) issuer: Issuer,
    pub(crate) options: ClientOptions,
    pub(crate) now: fn() -> u64,
}

impl Client {
    /// # New Client
    /// Builds a [Client] for `issuer` out of `metadata`.
    ///
    /// Fails with a configuration error when the client id is missing, the
    /// selected authentication method lacks its material (secret or signing
    /// keys), the issuer advertises token endpoint auth methods that do not
    /// include the selected one, or `id_token_signed_response_alg` is `none`.
    pub fn new(
        issuer: Issuer,
        metadata: ClientMetadata,
        private_jwks: Option<Jwks>,
        options: Option<ClientOptions>,
    ) -> RpReturnType<Self> {
        let client_id = match &metadata.client_id {
            Some(id) if !id.is_empty() => id.clone(),
            _ => {
                return Err(Box::new(RpError::new_configuration_error(
                    "client_id is required",
                    None,
                )))
            }
        };

        let auth = ClientAuthentication::resolve(&metadata, &issuer, private_jwks.as_ref())?;

        let id_token_signed_response_alg = metadata
            .id_token_signed_response_alg
            .unwrap_or_else(|| "RS256".to_string());

        if id_token_signed_response_alg == "none" {
            return Err(Box::new(RpError::new_configuration_error(
                "id_token_signed_response_alg none is not supported",
                None,
            )));
        }

        if metadata.response_type.is_some() && metadata.response_types.is_some() {
            return Err(Box::new(RpError::new_configuration_error(
                "provide a response_type or response_types, not both",
                None,
            )));
        }

        let response_types = match (metadata.response_type, metadata.response_types) {
            (Some(rt), None) => vec![rt],
            (None, Some(rts)) => rts,
            _ => vec!["code".to_string()],
        };

        if metadata.redirect_uri.is_some() && metadata.redirect_uris.is_some() {
            return Err(Box::new(RpError::new_configuration_error(
                "provide a redirect_uri or redirect_uris, not both",
                None,
            )));
        }

        let redirect_uris = match (metadata.redirect_uri, metadata.redirect_uris) {
            (Some(ru), None) => Some(vec![ru]),
            (None, rus) => rus,
            _ => None,
        };

        Ok(Self {
            client_id,
            client_secret: metadata.client_secret,
            auth,
            token_endpoint_auth_signing_alg: metadata.token_endpoint_auth_signing_alg,
            redirect_uris,
            response_types,
            id_token_signed_response_alg,
            authorization_signed_response_alg: metadata
                .authorization_signed_response_alg
                .unwrap_or_else(|| "RS256".to_string()),
            request_object_signing_alg: metadata.request_object_signing_alg,
            tls_client_certificate_bound_access_tokens: metadata
                .tls_client_certificate_bound_access_tokens
                .unwrap_or(false),
            private_jwks,
            issuer,
            options: options.unwrap_or_default(),
            now,
        })
    }

    /// The client id
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// The resolved client authentication strategy
    pub fn client_authentication(&self) -> &ClientAuthentication {
        &self.auth
    }

    /// The issuer this client is bound to
    pub fn issuer(&self) -> &Issuer {
        &self.issuer
    }

    /// The execution options
    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// Derives the symmetric JWK used when signing or verifying with an
    /// HS algorithm.
    pub(crate) fn secret_for_alg(&self, alg: &str) -> RpReturnType<Jwk> {
        let client_secret = self.client_secret.as_ref().ok_or_else(|| {
            RpError::new_configuration_error("client_secret is required", None)
        })?;

        let mut jwk = Jwk::new("oct");
        jwk.set_algorithm(alg);
        jwk.set_key_value(client_secret);

        Ok(jwk)
    }
}
