use std::fmt;
use std::sync::Mutex;

use josekit::{jwk::Jwk, jws::JwsHeader, jwt::JwtPayload};
use lazy_static::lazy_static;
use lru_time_cache::LruCache;
use regex::Regex;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};
use url::Url;

use crate::helpers::{generate_random, get_s256_jwk_thumbprint};
use crate::jwks::{signer_for, CustomJwk};
use crate::types::{HttpRequest, HttpResponse, RpError, RpReturnType};

use super::Client;

lazy_static! {
    static ref NQCHAR_REGEX: Regex = Regex::new(r"^[\x21\x23-\x5B\x5D-\x7E]+$").unwrap();
}

/// # DpopHandle
/// The proof-of-possession state of one logical flow: a private signing key
/// and the last `DPoP-Nonce` challenge observed per endpoint. Create one per
/// flow and never share it across flows.
///
/// The nonce slot uses an exclusive update so the handle stays correct if a
/// caller ever issues concurrent requests within one flow.
pub struct DpopHandle {
    key: Jwk,
    alg: String,
    nonces: Mutex<LruCache<String, String>>,
}

impl DpopHandle {
    /// Creates a handle around `key`. The key must be an asymmetric private
    /// key (EC, OKP or RSA with an `alg`).
    pub fn new(key: Jwk) -> RpReturnType<Self> {
        if !key.is_private_key() || key.key_type() == "oct" {
            return Err(Box::new(RpError::new_configuration_error(
                "dpop key must be an asymmetric private key",
                None,
            )));
        }

        let alg = determine_dpop_algorithm(&key)?.to_string();

        Ok(Self {
            key,
            alg,
            nonces: Mutex::new(LruCache::with_capacity(100)),
        })
    }

    /// The JWS algorithm proofs are signed with
    pub fn alg(&self) -> &str {
        &self.alg
    }

    /// The RFC 7638 S256 thumbprint of the public key, as it appears in
    /// `cnf.jkt` confirmation claims of sender-constrained tokens.
    pub fn jwk_thumbprint(&self) -> RpReturnType<String> {
        let public = public_jwk(&self.key);

        let jwk_json = serde_json::to_string(&public).map_err(|_| {
            RpError::new_configuration_error("could not serialize the dpop public key", None)
        })?;

        get_s256_jwk_thumbprint(&jwk_json)
    }

    /// Issues a fresh, single use proof JWT for one request.
    pub(crate) fn proof(
        &self,
        htu: &str,
        htm: &str,
        access_token: Option<&str>,
        allowed_algs: Option<&Vec<String>>,
        now: u64,
    ) -> RpReturnType<String> {
        if let Some(algs) = allowed_algs {
            if !algs.contains(&self.alg) {
                return Err(Box::new(RpError::new_configuration_error(
                    "unsupported DPoP signing algorithm",
                    None,
                )));
            }
        }

        let mut payload = JwtPayload::new();

        let claims = [
            ("htu", json!(htu)),
            ("htm", json!(htm)),
            ("iat", json!(now)),
            ("jti", json!(generate_random(None))),
        ];

        for (k, v) in claims {
            payload.set_claim(k, Some(v)).map_err(|_| {
                RpError::new_configuration_error("could not build the dpop proof payload", None)
            })?;
        }

        if let Some(at) = access_token {
            let ath = base64_url::encode(&Sha256::digest(at)[..]);
            payload.set_claim("ath", Some(json!(ath))).map_err(|_| {
                RpError::new_configuration_error("could not build the dpop proof payload", None)
            })?;
        }

        if let Some(nonce) = self.nonce_for(htu) {
            payload.set_claim("nonce", Some(json!(nonce))).map_err(|_| {
                RpError::new_configuration_error("could not build the dpop proof payload", None)
            })?;
        }

        let mut header = JwsHeader::new();
        header.set_algorithm(&self.alg);
        header.set_token_type("dpop+jwt");
        header
            .set_claim("jwk", Some(public_jwk(&self.key)))
            .map_err(|_| {
                RpError::new_configuration_error("could not embed the dpop public key", None)
            })?;

        let signer = signer_for(&self.alg, &self.key)?;

        josekit::jwt::encode_with_signer(&payload, &header, &*signer).map_err(|_| {
            Box::new(RpError::new_configuration_error(
                "error while signing the dpop proof",
                None,
            ))
        })
    }

    /// Adopts a `DPoP-Nonce` challenge for `htu`, replacing any earlier one.
    pub(crate) fn observe_nonce(&self, htu: &str, nonce: &str) {
        if !NQCHAR_REGEX.is_match(nonce) {
            warn!(htu, "discarding DPoP-Nonce with invalid characters");
            return;
        }

        if let Ok(mut nonces) = self.nonces.lock() {
            debug!(htu, "adopted DPoP-Nonce challenge");
            nonces.insert(htu.to_string(), nonce.to_string());
        }
    }

    fn nonce_for(&self, htu: &str) -> Option<String> {
        match self.nonces.lock() {
            Ok(mut nonces) => nonces.get(htu).cloned(),
            Err(_) => None,
        }
    }

    pub(crate) fn extract_server_dpop_nonce(&self, url: &Url, res: &HttpResponse) {
        if let (Some(htu), Some(nonce)) = (get_dpop_htu(url), res.dpop_nonce.as_ref()) {
            self.observe_nonce(&htu, nonce);
        }
    }
}

impl fmt::Debug for DpopHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DpopHandle")
            .field("alg", &self.alg)
            .field("nonces", &"LruCache<String, String>")
            .finish()
    }
}

impl Client {
    pub(crate) fn generate_dpop_header(
        &self,
        request: &mut HttpRequest,
        dpop: Option<&DpopHandle>,
        access_token: Option<&str>,
    ) -> RpReturnType<()> {
        let handle = match dpop {
            Some(h) => h,
            None => return Ok(()),
        };

        if let Some(htu) = get_dpop_htu(&request.url) {
            let proof = handle.proof(
                &htu,
                request.method.as_str(),
                access_token,
                self.issuer.dpop_signing_alg_values_supported.as_ref(),
                (self.now)(),
            )?;

            request.headers.insert("DPoP".to_string(), vec![proof]);
        }

        Ok(())
    }
}

/// The `htu` claim value: origin + path, without query or fragment.
pub(crate) fn get_dpop_htu(url: &Url) -> Option<String> {
    Some(url.origin().ascii_serialization() + url.path())
}

fn determine_dpop_algorithm(key: &Jwk) -> RpReturnType<&str> {
    match key.key_type() {
        "OKP" => Ok("EdDSA"),
        "EC" => match key.curve() {
            Some("P-256") => Ok("ES256"),
            Some("secp256k1") => Ok("ES256K"),
            Some("P-384") => Ok("ES384"),
            Some("P-521") => Ok("ES512"),
            _ => Err(Box::new(RpError::new_configuration_error(
                "unsupported DPoP private key curve",
                None,
            ))),
        },
        "RSA" => key.algorithm().ok_or_else(|| {
            Box::new(RpError::new_configuration_error(
                "alg must be present on RSA DPoP keys",
                None,
            ))
        }),
        _ => Err(Box::new(RpError::new_configuration_error(
            "unsupported DPoP private key type",
            None,
        ))),
    }
}

fn public_jwk(jwk: &Jwk) -> Value {
    let mut public = json!({});

    for parameter in ["kty", "crv", "x", "y", "e", "n"] {
        if let Some(value) = jwk.parameter(parameter) {
            public[parameter] = value.clone();
        }
    }

    public
}
