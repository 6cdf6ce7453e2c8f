use std::time::{SystemTime, UNIX_EPOCH};

use josekit::{jws::JwsHeader, jwt::JwtPayload};
use jwt_compact::jwk::JsonWebKey;
use rand::Rng;
use serde::Deserialize;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use crate::types::{RpError, RpReturnType};

/// Gets a Unix Timestamp in seconds. Uses [`SystemTime::now`]
pub fn now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("Time went backwards")
        .as_secs()
}

/// Generates a url safe random string using [rand::thread_rng].
/// `bytes_to_generate` defaults to 32.
pub fn generate_random(bytes_to_generate: Option<u32>) -> String {
    let mut random_bytes = vec![];

    for _ in 0..bytes_to_generate.unwrap_or(32) {
        random_bytes.push(rand::thread_rng().gen());
    }

    base64_url::encode(&random_bytes)
}

/// Generates a random string usable as the `state`. Uses [generate_random].
pub fn generate_state(bytes: Option<u32>) -> String {
    generate_random(bytes)
}

/// Generates a random string usable as the `nonce`. Uses [generate_random].
pub fn generate_nonce(bytes: Option<u32>) -> String {
    generate_random(bytes)
}

/// Generates a random string usable as the PKCE `code_verifier`.
/// Uses [generate_random].
pub fn generate_code_verifier(bytes: Option<u32>) -> String {
    generate_random(bytes)
}

/// Computes the S256 PKCE `code_challenge` for `verifier`.
pub fn code_challenge(verifier: &str) -> String {
    base64_url::encode(&Sha256::digest(verifier)[..])
}

/// Converts plain JSON to a type that impls serde's [Deserialize].
pub(crate) fn convert_json_to<T: for<'a> Deserialize<'a>>(plain: &str) -> Result<T, String> {
    serde_json::from_str::<T>(plain).map_err(|e| e.to_string())
}

/// A decoded, unverified JWT
#[derive(Debug)]
pub struct DecodedToken {
    /// The JWS header
    pub header: JwsHeader,
    /// The claims set
    pub payload: JwtPayload,
    /// The raw signature component
    pub signature: String,
}

/// Decodes a JWT without verifying it
pub fn decode_jwt(token: &str) -> RpReturnType<DecodedToken> {
    let split_token: Vec<&str> = token.split('.').collect();

    if split_token.len() == 5 {
        return Err(Box::new(RpError::new_validation_error(
            "response",
            "encrypted JWTs cannot be decoded",
            None,
        )));
    }

    if split_token.len() != 3 {
        return Err(Box::new(RpError::new_validation_error(
            "response",
            "JWTs must have three components",
            None,
        )));
    }

    let map_err_decode = |_| RpError::new_validation_error("response", "JWT is malformed", None);
    let map_err_deserialize =
        |_| RpError::new_validation_error("response", "JWT is malformed", None);
    let map_err_jose = |_| RpError::new_validation_error("response", "JWT is malformed", None);

    let header_bytes = base64_url::decode(split_token[0]).map_err(map_err_decode)?;
    let payload_bytes = base64_url::decode(split_token[1]).map_err(map_err_decode)?;
    let signature = split_token[2].to_string();

    let header = serde_json::from_slice::<Map<String, Value>>(&header_bytes)
        .map(JwsHeader::from_map)
        .map_err(map_err_deserialize)?
        .map_err(map_err_jose)?;

    let payload = serde_json::from_slice::<Map<String, Value>>(&payload_bytes)
        .map(JwtPayload::from_map)
        .map_err(map_err_deserialize)?
        .map_err(map_err_jose)?;

    Ok(DecodedToken {
        header,
        payload,
        signature,
    })
}

/// Gets the RFC 7638 S256 thumbprint of a JWK JSON.
pub fn get_s256_jwk_thumbprint(jwk_str: &str) -> RpReturnType<String> {
    let jwk: JsonWebKey<'_> = serde_json::from_str(jwk_str)
        .map_err(|_| RpError::new_configuration_error("invalid JWK", None))?;

    Ok(base64_url::encode(&jwk.thumbprint::<Sha256>().to_vec()))
}
