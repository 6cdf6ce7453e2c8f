use std::collections::HashMap;

use josekit::jwk::Jwk;
use url::Url;

use crate::helpers::convert_json_to;
use crate::http::request_async;
use crate::jwks::Jwks;
use crate::types::{HttpMethod, HttpRequest, RpError, RpHttpClient, RpReturnType};

/// Parameters for selecting keys out of the issuer's published set.
#[derive(Debug, Default, Clone)]
pub(crate) struct KeyQuery {
    pub alg: Option<String>,
    pub key_use: Option<String>,
    pub key_id: Option<String>,
}

/// Caches the JWK set published at the issuer's `jwks_uri`.
#[derive(Debug, Clone, Default)]
pub(crate) struct KeyStore {
    jwks: Option<Jwks>,
    jwks_uri: Option<String>,
}

impl KeyStore {
    pub(crate) fn new(jwks_uri: Option<String>) -> Self {
        Self {
            jwks: None,
            jwks_uri,
        }
    }

    pub(crate) async fn get_keystore_async<T>(
        &mut self,
        reload: bool,
        http_client: &T,
    ) -> RpReturnType<&Jwks>
    where
        T: RpHttpClient,
    {
        let uri = self.jwks_uri.as_ref().ok_or_else(|| {
            RpError::new_configuration_error("jwks_uri must be configured on the issuer", None)
        })?;

        if reload || self.jwks.is_none() {
            let url = Url::parse(uri).map_err(|_| {
                RpError::new_configuration_error("jwks_uri is an invalid url", None)
            })?;

            let mut headers = HashMap::new();
            headers.insert(
                "accept".to_string(),
                vec![
                    "application/json".to_string(),
                    "application/jwk-set+json".to_string(),
                ],
            );

            let mut req = HttpRequest::new()
                .url(url)
                .method(HttpMethod::GET)
                .expect_body(true)
                .expect_json_body(true)
                .expect_status_code(200);
            req.headers = headers;

            let res = request_async(req, http_client).await?;

            let body = res.body.as_deref().unwrap_or_default();
            match convert_json_to::<Jwks>(body) {
                Ok(jwks) => self.jwks = Some(jwks),
                Err(_) => {
                    return Err(Box::new(RpError::new_validation_error(
                        "response",
                        "jwks_uri did not return a valid JWK Set",
                        Some(res),
                    )))
                }
            }
        }

        match &self.jwks {
            Some(jwks) => Ok(jwks),
            None => Err(Box::new(RpError::new_configuration_error(
                "keystore is empty",
                None,
            ))),
        }
    }

    /// Selects candidate keys for `query`. When a `kid` matches nothing in
    /// the cached set the set is fetched once more, so rotated keys are
    /// picked up.
    pub(crate) async fn query_async<T>(
        &mut self,
        query: KeyQuery,
        http_client: &T,
    ) -> RpReturnType<Vec<Jwk>>
    where
        T: RpHttpClient,
    {
        let jwks = self.get_keystore_async(false, http_client).await?;

        let keys: Vec<Jwk> = jwks
            .get(
                query.alg.clone(),
                query.key_use.clone(),
                query.key_id.clone(),
            )?
            .into_iter()
            .cloned()
            .collect();

        if !keys.is_empty() || query.key_id.is_none() {
            return Ok(keys);
        }

        let jwks = self.get_keystore_async(true, http_client).await?;

        Ok(jwks
            .get(query.alg, query.key_use, query.key_id)?
            .into_iter()
            .cloned()
            .collect())
    }
}
