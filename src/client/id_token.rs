use josekit::{jwk::Jwk, jws::JwsHeader, jwt::decode_with_verifier, jwt::JwtPayload};
use serde_json::Value;

use crate::helpers::{decode_jwt, validate_hash};
use crate::issuer::KeyQuery;
use crate::jwks::verifier_for;
use crate::tokenset::TokenSet;
use crate::types::{RpError, RpHttpClient, RpReturnType};

use super::Client;

/// Which leg of the flow handed over the ID Token. Hash binding requirements
/// differ between the two.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ReturnedBy {
    /// Front channel (implicit/hybrid authorization response)
    Authorization,
    /// Back channel (token endpoint response)
    Token,
}

pub(crate) struct ValidateIdTokenParams {
    pub(crate) token_set: TokenSet,
    pub(crate) returned_by: ReturnedBy,
    pub(crate) nonce: Option<String>,
    pub(crate) max_age: Option<u64>,
    pub(crate) state: Option<String>,
}

impl Client {
    /// Validates a JWT issued by the Authorization Server: algorithm
    /// allow-list (`none` is never accepted), required claims, `iss`,
    /// timestamps with the configured clock tolerance, `aud`/`azp`, and
    /// finally the JWS signature against the issuer's published keys.
    ///
    /// The checks run strictly in that order; the signature is only
    /// consulted once the claims passed, and claims are only trusted by
    /// callers once this function returned.
    pub(crate) async fn validate_jwt_async<T>(
        &mut self,
        jwt: &str,
        expected_alg: &str,
        required: &[&str],
        http_client: &T,
    ) -> RpReturnType<(JwtPayload, JwsHeader, Option<Jwk>)>
    where
        T: RpHttpClient,
    {
        let timestamp = (self.now)();
        let skew = self.options.clock_tolerance.as_secs();

        let decoded = decode_jwt(jwt)?;

        let header_alg = decoded.header.algorithm().ok_or_else(|| {
            RpError::new_validation_error("algorithm", "JWT alg is missing", None)
        })?;

        if header_alg == "none" {
            return Err(Box::new(RpError::new_validation_error(
                "algorithm",
                "JWTs signed with alg none are not accepted",
                None,
            )));
        }

        if header_alg != expected_alg {
            return Err(Box::new(RpError::new_validation_error(
                "algorithm",
                &format!("unexpected JWT alg received, expected {expected_alg}, got: {header_alg}"),
                None,
            )));
        }

        for claim in required {
            if decoded.payload.claim(claim).is_none() {
                return Err(Box::new(RpError::new_validation_error(
                    "claims",
                    &format!("missing required JWT property {claim}"),
                    None,
                )));
            }
        }

        if let Some(iss) = decoded.payload.issuer() {
            if iss != self.issuer.issuer {
                return Err(Box::new(RpError::new_validation_error(
                    "issuer",
                    &format!(
                        "unexpected iss value, expected {}, got: {iss}",
                        self.issuer.issuer
                    ),
                    None,
                )));
            }
        }

        if let Some(iat) = decoded.payload.claim("iat") {
            let iat = number_claim(iat, "iat")?;

            if iat > timestamp.wrapping_add(skew) {
                return Err(Box::new(RpError::new_validation_error(
                    "timestamp",
                    &format!("JWT issued in the future, now {timestamp}, iat {iat}"),
                    None,
                )));
            }
        }

        if let Some(nbf) = decoded.payload.claim("nbf") {
            let nbf = number_claim(nbf, "nbf")?;

            if nbf > timestamp.wrapping_add(skew) {
                return Err(Box::new(RpError::new_validation_error(
                    "timestamp",
                    &format!("JWT not active yet, now {timestamp}, nbf {nbf}"),
                    None,
                )));
            }
        }

        if let Some(exp) = decoded.payload.claim("exp") {
            let exp = number_claim(exp, "exp")?;

            if timestamp.wrapping_sub(skew) >= exp {
                return Err(Box::new(RpError::new_validation_error(
                    "timestamp",
                    &format!("JWT expired, now {timestamp}, exp {exp}"),
                    None,
                )));
            }
        }

        let payload_azp = decoded.payload.claim("azp");

        if let Some(aud) = decoded.payload.audience() {
            if aud.len() > 1 && payload_azp.is_none() {
                return Err(Box::new(RpError::new_validation_error(
                    "authorized_party",
                    "missing required JWT property azp",
                    None,
                )));
            }

            if !aud.contains(&self.client_id.as_str()) {
                return Err(Box::new(RpError::new_validation_error(
                    "audience",
                    &format!(
                        "aud is missing the client_id, expected {} to be included in {:?}",
                        self.client_id, aud
                    ),
                    None,
                )));
            }
        }

        if let Some(Value::String(azp)) = payload_azp {
            let mut authorized_parties = self
                .options
                .additional_authorized_parties
                .clone()
                .unwrap_or_default();

            authorized_parties.push(self.client_id.clone());

            if !authorized_parties.contains(azp) {
                return Err(Box::new(RpError::new_validation_error(
                    "authorized_party",
                    &format!("azp mismatch, got: {azp}"),
                    None,
                )));
            }
        }

        let keys = if header_alg.starts_with("HS") {
            vec![self.secret_for_alg(header_alg)?]
        } else {
            let header_kid = decoded
                .header
                .key_id()
                .filter(|kid| !kid.is_empty())
                .map(|kid| kid.to_string());

            let query = KeyQuery {
                alg: Some(header_alg.to_string()),
                key_use: Some("sig".to_string()),
                key_id: header_kid,
            };

            self.issuer.query_keystore_async(query, http_client).await?
        };

        if keys.is_empty() {
            return Err(Box::new(RpError::new_validation_error(
                "signature",
                "no matching key found in the issuer's jwks_uri to verify the JWT with",
                None,
            )));
        }

        for key in keys {
            let verifier = verifier_for(header_alg, &key)?;

            if let Ok((payload, header)) = decode_with_verifier(jwt, &*verifier) {
                return Ok((payload, header, Some(key)));
            }
        }

        Err(Box::new(RpError::new_validation_error(
            "signature",
            "failed to validate JWT signature",
            None,
        )))
    }

    /// Runs the ID Token specific checks on top of [Self::validate_jwt_async]
    /// and unlocks the claims accessor of the [TokenSet].
    pub(crate) async fn validate_id_token_async<T>(
        &mut self,
        params: ValidateIdTokenParams,
        http_client: &T,
    ) -> RpReturnType<TokenSet>
    where
        T: RpHttpClient,
    {
        let mut token_set = params.token_set;

        let id_token = token_set.get_id_token().ok_or_else(|| {
            RpError::new_protocol_state_error("id_token not present in TokenSet", None)
        })?;

        let expected_alg = self.id_token_signed_response_alg.clone();
        let timestamp = (self.now)();
        let skew = self.options.clock_tolerance.as_secs();

        let (payload, header, key) = self
            .validate_jwt_async(
                &id_token,
                &expected_alg,
                &["iss", "sub", "aud", "exp", "iat"],
                http_client,
            )
            .await?;

        if params.max_age.is_some() {
            match payload.claim("auth_time") {
                Some(Value::Number(_)) => {}
                Some(_) => {
                    return Err(Box::new(RpError::new_validation_error(
                        "auth_time",
                        "JWT auth_time claim must be a JSON numeric value",
                        None,
                    )));
                }
                None => {
                    return Err(Box::new(RpError::new_validation_error(
                        "auth_time",
                        "missing required JWT property auth_time",
                        None,
                    )));
                }
            }
        }

        if let (Some(max_age), Some(Value::Number(at))) = (params.max_age, payload.claim("auth_time"))
        {
            if let Some(auth_time) = at.as_u64() {
                if max_age.wrapping_add(auth_time) < timestamp.wrapping_sub(skew) {
                    return Err(Box::new(RpError::new_validation_error(
                        "auth_time",
                        &format!(
                            "too much time has elapsed since the last End-User authentication, max_age {max_age}, auth_time: {auth_time}, now {timestamp}"
                        ),
                        None,
                    )));
                }
            }
        }

        let payload_nonce = match payload.claim("nonce") {
            Some(Value::String(n)) => Some(n.as_str()),
            _ => None,
        };

        if (payload_nonce.is_some() || params.nonce.is_some())
            && payload_nonce != params.nonce.as_deref()
        {
            return Err(Box::new(RpError::new_validation_error(
                "nonce",
                &format!(
                    "nonce mismatch, expected {}, got: {}",
                    params.nonce.unwrap_or_default(),
                    payload_nonce.unwrap_or_default()
                ),
                None,
            )));
        }

        let header_alg = header
            .algorithm()
            .map(|a| a.to_string())
            .unwrap_or_default();
        let curve = key.as_ref().and_then(|k| k.curve().map(|c| c.to_string()));

        if params.returned_by == ReturnedBy::Authorization {
            if payload.claim("at_hash").is_none() && token_set.get_access_token().is_some() {
                return Err(Box::new(RpError::new_validation_error(
                    "at_hash",
                    "missing required property at_hash",
                    None,
                )));
            }

            let other_fields = token_set.get_other().unwrap_or_default();

            if payload.claim("c_hash").is_none() && other_fields.get("code").is_some() {
                return Err(Box::new(RpError::new_validation_error(
                    "c_hash",
                    "missing required property c_hash",
                    None,
                )));
            }

            if let Some(Value::String(s_hash)) = payload.claim("s_hash") {
                let state = params.state.as_deref().ok_or_else(|| {
                    RpError::new_protocol_state_error(
                        "cannot verify s_hash, \"checks.state\" property not provided",
                        None,
                    )
                })?;

                validate_hash("s_hash", s_hash, &header_alg, state, curve.as_deref())?;
            }
        }

        if let (Some(access_token), Some(Value::String(at_hash))) =
            (token_set.get_access_token(), payload.claim("at_hash"))
        {
            validate_hash("at_hash", at_hash, &header_alg, &access_token, curve.as_deref())?;
        }

        let other_fields = token_set.get_other().unwrap_or_default();

        if let (Some(Value::String(code)), Some(Value::String(c_hash))) =
            (other_fields.get("code"), payload.claim("c_hash"))
        {
            validate_hash("c_hash", c_hash, &header_alg, code, curve.as_deref())?;
        }

        let claims = payload
            .claims_set()
            .iter()
            .map(|(k, v)| (k.to_owned(), v.to_owned()))
            .collect();

        token_set.set_verified_claims(claims);

        Ok(token_set)
    }
}

fn number_claim(value: &Value, claim: &str) -> RpReturnType<u64> {
    value.as_u64().ok_or_else(|| {
        Box::new(RpError::new_validation_error(
            "timestamp",
            &format!("JWT {claim} claim must be a JSON numeric value"),
            None,
        ))
    })
}
