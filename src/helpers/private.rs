use std::collections::HashMap;

use sha2::{Digest, Sha256, Sha384, Sha512};
use sha3::{
    digest::{ExtendableOutput, Update, XofReader},
    Shake256,
};
use url::{form_urlencoded, Url};

use crate::types::{RpError, RpReturnType};

pub(crate) fn validate_url(url: &str) -> RpReturnType<Url> {
    Url::parse(url).map_err(|_| {
        Box::new(RpError::new_configuration_error(
            "only valid absolute URLs can be requested",
            None,
        ))
    })
}

fn get_hash(alg: &str, token: &str, curve: Option<&str>) -> RpReturnType<Vec<u8>> {
    match alg {
        "HS256" | "RS256" | "PS256" | "ES256" | "ES256K" => Ok(Sha256::digest(token)[..].to_vec()),
        "HS384" | "RS384" | "PS384" | "ES384" => Ok(Sha384::digest(token)[..].to_vec()),
        "HS512" | "RS512" | "PS512" | "ES512" => Ok(Sha512::digest(token)[..].to_vec()),
        "EdDSA" => match curve {
            Some("Ed25519") => Ok(Sha512::digest(token)[..].to_vec()),
            Some("Ed448") => {
                let mut hasher = Shake256::default();
                hasher.update(token.as_bytes());
                let mut reader = hasher.finalize_xof();
                let mut hashed = [0u8; 114];
                reader.read(&mut hashed);

                Ok(hashed.to_vec())
            }
            _ => Err(Box::new(RpError::new_validation_error(
                "algorithm",
                "unrecognized or invalid EdDSA curve provided",
                None,
            ))),
        },
        _ => Err(Box::new(RpError::new_validation_error(
            "algorithm",
            "unrecognized or invalid JWS algorithm provided",
            None,
        ))),
    }
}

pub(crate) fn generate_hash(alg: &str, token: &str, curve: Option<&str>) -> RpReturnType<String> {
    let hash = get_hash(alg, token, curve)?;

    Ok(base64_url::encode(&hash[0..hash.len() / 2]))
}

/// Validates the `*_hash` binding claims of an ID Token against their source
/// value. `check` names the claim, `source` names the front channel value.
pub(crate) fn validate_hash(
    check: &'static str,
    actual: &str,
    alg: &str,
    source: &str,
    curve: Option<&str>,
) -> RpReturnType<()> {
    let expected = generate_hash(alg, source, curve).map_err(|err| {
        Box::new(RpError::new_validation_error(
            check,
            &format!("{check} could not be validated ({err})"),
            None,
        ))
    })?;

    if expected != actual {
        return Err(Box::new(RpError::new_validation_error(
            check,
            &format!("{check} mismatch, expected {expected}, got: {actual}"),
            None,
        )));
    }

    Ok(())
}

pub(crate) fn string_map_to_form_url_encoded(map: &HashMap<String, String>) -> String {
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (k, v) in map {
        serializer.append_pair(k, v);
    }

    serializer.finish()
}

#[cfg(test)]
pub(crate) fn form_url_encoded_to_string_map(string: &str) -> HashMap<String, String> {
    form_urlencoded::parse(string.as_bytes())
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}
