use std::{cmp::Reverse, collections::HashSet};

use josekit::{
    jwk::Jwk,
    jws::{
        alg::{
            ecdsa::EcdsaJwsAlgorithm, eddsa::EddsaJwsAlgorithm, hmac::HmacJwsAlgorithm,
            rsassa::RsassaJwsAlgorithm, rsassa_pss::RsassaPssJwsAlgorithm,
        },
        JwsSigner, JwsVerifier,
    },
};
use serde::{Deserialize, Serialize};

use crate::types::{RpError, RpReturnType};

/// Adapter over [josekit::jwk::Jwk] mapping JOSE algorithm names onto
/// signers and verifiers. The crate never implements the primitives itself.
pub(crate) trait CustomJwk {
    fn algorithms(&self) -> HashSet<String>;

    fn is_private_key(&self) -> bool;

    fn to_signer(&self) -> RpReturnType<Box<dyn JwsSigner>>;
}

impl CustomJwk for Jwk {
    fn algorithms(&self) -> HashSet<String> {
        let mut algs: HashSet<String> = HashSet::new();

        if let Some(alg) = self.algorithm() {
            algs.insert(alg.to_string());
            return algs;
        }

        match self.key_type() {
            "EC" => {
                if self.key_use().is_none() || self.key_use() == Some("sig") {
                    match self.curve() {
                        Some("P-256") => algs.insert("ES256".to_string()),
                        Some("secp256k1") => algs.insert("ES256K".to_string()),
                        Some("P-384") => algs.insert("ES384".to_string()),
                        Some("P-521") => algs.insert("ES512".to_string()),
                        _ => false,
                    };
                }
                algs
            }
            "RSA" => {
                if self.key_use().is_none() || self.key_use() == Some("sig") {
                    for alg in ["RS256", "RS384", "RS512", "PS256", "PS384", "PS512"] {
                        algs.insert(alg.to_string());
                    }
                }
                algs
            }
            "OKP" => {
                if self.key_use().is_none() || self.key_use() == Some("sig") {
                    algs.insert("EdDSA".to_string());
                }
                algs
            }
            "oct" => {
                for alg in ["HS256", "HS384", "HS512"] {
                    algs.insert(alg.to_string());
                }
                algs
            }
            _ => algs,
        }
    }

    fn is_private_key(&self) -> bool {
        self.key_type() == "oct" || self.parameter("d").is_some()
    }

    fn to_signer(&self) -> RpReturnType<Box<dyn JwsSigner>> {
        let alg = self.algorithm().ok_or_else(|| {
            RpError::new_configuration_error("jwk does not have an algorithm", None)
        })?;

        signer_for(alg, self)
    }
}

macro_rules! boxed {
    ($result:expr) => {
        $result
            .map(|a| Box::new(a) as _)
            .map_err(|e| Box::new(RpError::new_configuration_error(&e.to_string(), None)))
    };
}

pub(crate) fn signer_for(alg: &str, jwk: &Jwk) -> RpReturnType<Box<dyn JwsSigner>> {
    match alg {
        "HS256" => boxed!(HmacJwsAlgorithm::Hs256.signer_from_jwk(jwk)),
        "HS384" => boxed!(HmacJwsAlgorithm::Hs384.signer_from_jwk(jwk)),
        "HS512" => boxed!(HmacJwsAlgorithm::Hs512.signer_from_jwk(jwk)),
        "RS256" => boxed!(RsassaJwsAlgorithm::Rs256.signer_from_jwk(jwk)),
        "RS384" => boxed!(RsassaJwsAlgorithm::Rs384.signer_from_jwk(jwk)),
        "RS512" => boxed!(RsassaJwsAlgorithm::Rs512.signer_from_jwk(jwk)),
        "PS256" => boxed!(RsassaPssJwsAlgorithm::Ps256.signer_from_jwk(jwk)),
        "PS384" => boxed!(RsassaPssJwsAlgorithm::Ps384.signer_from_jwk(jwk)),
        "PS512" => boxed!(RsassaPssJwsAlgorithm::Ps512.signer_from_jwk(jwk)),
        "ES256" => boxed!(EcdsaJwsAlgorithm::Es256.signer_from_jwk(jwk)),
        "ES256K" => boxed!(EcdsaJwsAlgorithm::Es256k.signer_from_jwk(jwk)),
        "ES384" => boxed!(EcdsaJwsAlgorithm::Es384.signer_from_jwk(jwk)),
        "ES512" => boxed!(EcdsaJwsAlgorithm::Es512.signer_from_jwk(jwk)),
        "EdDSA" => boxed!(EddsaJwsAlgorithm::Eddsa.signer_from_jwk(jwk)),
        _ => Err(Box::new(RpError::new_configuration_error(
            &format!("unsupported JWS algorithm {alg}"),
            None,
        ))),
    }
}

/// Builds a verifier for `alg` out of `jwk`. The algorithm comes from the
/// JWS header since published keys frequently omit `alg`.
pub(crate) fn verifier_for(alg: &str, jwk: &Jwk) -> RpReturnType<Box<dyn JwsVerifier>> {
    match alg {
        "HS256" => boxed!(HmacJwsAlgorithm::Hs256.verifier_from_jwk(jwk)),
        "HS384" => boxed!(HmacJwsAlgorithm::Hs384.verifier_from_jwk(jwk)),
        "HS512" => boxed!(HmacJwsAlgorithm::Hs512.verifier_from_jwk(jwk)),
        "RS256" => boxed!(RsassaJwsAlgorithm::Rs256.verifier_from_jwk(jwk)),
        "RS384" => boxed!(RsassaJwsAlgorithm::Rs384.verifier_from_jwk(jwk)),
        "RS512" => boxed!(RsassaJwsAlgorithm::Rs512.verifier_from_jwk(jwk)),
        "PS256" => boxed!(RsassaPssJwsAlgorithm::Ps256.verifier_from_jwk(jwk)),
        "PS384" => boxed!(RsassaPssJwsAlgorithm::Ps384.verifier_from_jwk(jwk)),
        "PS512" => boxed!(RsassaPssJwsAlgorithm::Ps512.verifier_from_jwk(jwk)),
        "ES256" => boxed!(EcdsaJwsAlgorithm::Es256.verifier_from_jwk(jwk)),
        "ES256K" => boxed!(EcdsaJwsAlgorithm::Es256k.verifier_from_jwk(jwk)),
        "ES384" => boxed!(EcdsaJwsAlgorithm::Es384.verifier_from_jwk(jwk)),
        "ES512" => boxed!(EcdsaJwsAlgorithm::Es512.verifier_from_jwk(jwk)),
        "EdDSA" => boxed!(EddsaJwsAlgorithm::Eddsa.verifier_from_jwk(jwk)),
        _ => Err(Box::new(RpError::new_validation_error(
            "algorithm",
            &format!("unsupported JWS algorithm {alg}"),
            None,
        ))),
    }
}

/// # Jwks
/// A JSON Web Key Set, either published by the Authorization Server or owned
/// by the client for signing assertions and request objects.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Jwks {
    keys: Vec<Jwk>,
}

impl Jwks {
    /// Creates a key set from a list of keys
    pub fn from_keys(keys: Vec<Jwk>) -> Self {
        Self { keys }
    }

    /// Filters candidate keys by algorithm family, key use and key id. Keys
    /// carrying explicit `alg`/`use` fields win over unconstrained ones.
    pub(crate) fn get(
        &self,
        alg: Option<String>,
        key_use: Option<String>,
        kid: Option<String>,
    ) -> RpReturnType<Vec<&Jwk>> {
        if key_use.is_none() || alg.is_none() {
            return Err(Box::new(RpError::new_configuration_error(
                "key_use or alg should be present",
                None,
            )));
        }

        let kty = get_kty_from_alg(alg.as_deref());

        let mut keys: Vec<&Jwk> = self
            .keys
            .iter()
            .filter(|key| {
                if kty.as_ref().is_some_and(|x| x != key.key_type()) {
                    return false;
                }

                if kid.is_some() && key.key_id() != kid.as_deref() {
                    return false;
                }

                if key.key_use().is_some() && key.key_use() != key_use.as_deref() {
                    return false;
                }

                if key.algorithm().is_some() {
                    key.algorithm() == alg.as_deref()
                } else {
                    alg.as_ref().is_some_and(|a| key.algorithms().contains(a))
                }
            })
            .collect();

        keys.sort_by_key(|key| Reverse(keyscore(key)));

        Ok(keys)
    }

    /// The public representation of the set, preserving `alg` and `kid`.
    pub fn get_public_jwks(&self) -> Self {
        Self {
            keys: self
                .keys
                .iter()
                .filter_map(|k| {
                    let mut pub_key = k.to_public_key().ok();

                    if let Some(pk) = &mut pub_key {
                        if let Some(alg) = k.algorithm() {
                            pk.set_algorithm(alg);
                        }
                        if let Some(kid) = k.key_id() {
                            pk.set_key_id(kid);
                        }
                    }

                    pub_key
                })
                .collect(),
        }
    }
}

fn get_kty_from_alg(alg: Option<&str>) -> Option<String> {
    match alg {
        Some(a) if a.len() >= 2 => match &a[0..2] {
            "RS" | "PS" => Some("RSA".to_string()),
            "ES" => Some("EC".to_string()),
            "Ed" => Some("OKP".to_string()),
            "HS" => Some("oct".to_string()),
            _ => None,
        },
        _ => None,
    }
}

fn keyscore(key: &Jwk) -> i8 {
    let mut score: i8 = 0;

    if key.algorithm().is_some() {
        score += 1;
    }

    if key.key_use().is_some() {
        score += 1;
    }

    score
}
