use josekit::{
    jwk::{alg::ec::EcCurve, Jwk},
    jws::JwsHeader,
    jwt::JwtPayload,
};
use serde_json::Value;

use crate::{
    client::Client,
    issuer::Issuer,
    jwks::{signer_for, Jwks},
    types::{ClientMetadata, IssuerMetadata},
};

pub fn test_issuer() -> Issuer {
    Issuer::new(IssuerMetadata {
        issuer: "https://op.example.com".to_string(),
        authorization_endpoint: Some("https://op.example.com/auth".to_string()),
        token_endpoint: Some("https://op.example.com/token".to_string()),
        device_authorization_endpoint: Some("https://op.example.com/auth/device".to_string()),
        pushed_authorization_request_endpoint: Some("https://op.example.com/par".to_string()),
        jwks_uri: Some("https://op.example.com/jwks".to_string()),
        ..Default::default()
    })
}

pub fn public_client() -> Client {
    test_issuer()
        .client(
            ClientMetadata {
                client_id: Some("client".to_string()),
                token_endpoint_auth_method: Some("none".to_string()),
                ..Default::default()
            },
            None,
            None,
        )
        .unwrap()
}

pub fn generate_signing_key(alg: &str, kid: &str) -> Jwk {
    let mut jwk = Jwk::generate_ec_key(EcCurve::P256).unwrap();
    jwk.set_algorithm(alg);
    jwk.set_key_id(kid);
    jwk.set_key_use("sig");
    jwk
}

pub fn sign_jwt(key: &Jwk, alg: &str, claims: Value) -> String {
    let mut header = JwsHeader::new();
    header.set_algorithm(alg);
    if let Some(kid) = key.key_id() {
        header.set_key_id(kid);
    }

    let payload = JwtPayload::from_map(claims.as_object().unwrap().clone()).unwrap();

    let signer = signer_for(alg, key).unwrap();

    josekit::jwt::encode_with_signer(&payload, &header, &*signer).unwrap()
}

pub fn public_jwks_body(key: &Jwk) -> String {
    let jwks = Jwks::from_keys(vec![key.clone()]);
    serde_json::to_string(&jwks.get_public_jwks()).unwrap()
}
