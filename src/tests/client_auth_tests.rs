use serde_json::json;

use crate::{
    client::ClientAuthentication,
    helpers::decode_jwt,
    jwks::Jwks,
    types::ClientMetadata,
};

use super::helpers::{generate_signing_key, test_issuer};

fn client_with_method(method: &str, secret: Option<&str>) -> crate::client::Client {
    test_issuer()
        .client(
            ClientMetadata {
                client_id: Some("client".to_string()),
                client_secret: secret.map(|s| s.to_string()),
                token_endpoint_auth_method: Some(method.to_string()),
                ..Default::default()
            },
            None,
            None,
        )
        .unwrap()
}

#[test]
fn none_contributes_only_the_client_id() {
    let client = client_with_method("none", None);

    let contribution = client.auth_for(None).unwrap();

    assert!(contribution.headers.is_empty());
    assert_eq!(1, contribution.form.len());
    assert_eq!("client", contribution.form.get("client_id").unwrap());
}

#[test]
fn tls_client_auth_contributes_only_the_client_id_and_no_secret() {
    for method in ["tls_client_auth", "self_signed_tls_client_auth"] {
        let client = client_with_method(method, Some("secret"));

        assert!(client.client_authentication().is_tls());

        let contribution = client.auth_for(None).unwrap();

        assert!(contribution.headers.is_empty());
        assert_eq!(1, contribution.form.len());
        assert_eq!("client", contribution.form.get("client_id").unwrap());
    }
}

#[test]
fn secret_post_contributes_id_and_secret_as_body_parameters() {
    let client = client_with_method("client_secret_post", Some("top secret"));

    let contribution = client.auth_for(None).unwrap();

    assert!(contribution.headers.is_empty());
    assert_eq!("client", contribution.form.get("client_id").unwrap());
    assert_eq!("top secret", contribution.form.get("client_secret").unwrap());
}

#[test]
fn secret_basic_builds_form_encoded_basic_credentials() {
    let client = test_issuer()
        .client(
            ClientMetadata {
                client_id: Some("an:identifier".to_string()),
                client_secret: Some("some secure & non-standard secret".to_string()),
                token_endpoint_auth_method: Some("client_secret_basic".to_string()),
                ..Default::default()
            },
            None,
            None,
        )
        .unwrap();

    let contribution = client.auth_for(None).unwrap();

    assert!(contribution.form.is_empty());

    let authorization = contribution.headers.get("authorization").unwrap();

    // base64(an%3Aidentifier:some+secure+%26+non-standard+secret)
    assert_eq!(
        "Basic YW4lM0FpZGVudGlmaWVyOnNvbWUrc2VjdXJlKyUyNitub24tc3RhbmRhcmQrc2VjcmV0",
        authorization[0]
    );
}

#[test]
fn missing_secret_is_a_configuration_error() {
    let err = test_issuer()
        .client(
            ClientMetadata {
                client_id: Some("client".to_string()),
                token_endpoint_auth_method: Some("client_secret_basic".to_string()),
                ..Default::default()
            },
            None,
            None,
        )
        .unwrap_err();

    assert!(err.is_configuration_error());
    assert_eq!(
        "client_secret_basic client authentication method requires a client_secret",
        err.configuration_error().message
    );
}

#[test]
fn private_key_jwt_requires_a_keystore() {
    let err = test_issuer()
        .client(
            ClientMetadata {
                client_id: Some("client".to_string()),
                token_endpoint_auth_method: Some("private_key_jwt".to_string()),
                ..Default::default()
            },
            None,
            None,
        )
        .unwrap_err();

    assert!(err.is_configuration_error());
    assert_eq!(
        "no client jwks provided for signing a client assertion with",
        err.configuration_error().message
    );
}

#[test]
fn private_key_jwt_builds_a_signed_assertion() {
    let key = generate_signing_key("ES256", "assertion-key");

    let client = test_issuer()
        .client(
            ClientMetadata {
                client_id: Some("client".to_string()),
                token_endpoint_auth_method: Some("private_key_jwt".to_string()),
                token_endpoint_auth_signing_alg: Some("ES256".to_string()),
                ..Default::default()
            },
            Some(Jwks::from_keys(vec![key])),
            None,
        )
        .unwrap();

    let contribution = client.auth_for(None).unwrap();

    assert_eq!("client", contribution.form.get("client_id").unwrap());
    assert_eq!(
        "urn:ietf:params:oauth:client-assertion-type:jwt-bearer",
        contribution.form.get("client_assertion_type").unwrap()
    );

    let assertion = contribution.form.get("client_assertion").unwrap();
    let decoded = decode_jwt(assertion).unwrap();

    assert_eq!(Some("ES256"), decoded.header.algorithm());
    assert_eq!(Some("assertion-key"), decoded.header.key_id());
    assert_eq!(Some("client"), decoded.payload.issuer());
    assert_eq!(Some("client"), decoded.payload.subject());
    assert!(decoded.payload.claim("jti").is_some());
    assert!(decoded.payload.claim("iat").is_some());
    assert!(decoded.payload.claim("exp").is_some());

    let audience = decoded.payload.audience().unwrap();
    assert!(audience.contains(&"https://op.example.com"));
    assert!(audience.contains(&"https://op.example.com/token"));
}

#[test]
fn the_assertion_payload_extension_point_overrides_claims() {
    let key = generate_signing_key("ES256", "assertion-key");

    let client = test_issuer()
        .client(
            ClientMetadata {
                client_id: Some("client".to_string()),
                token_endpoint_auth_method: Some("private_key_jwt".to_string()),
                token_endpoint_auth_signing_alg: Some("ES256".to_string()),
                ..Default::default()
            },
            Some(Jwks::from_keys(vec![key])),
            None,
        )
        .unwrap();

    let mut extra = std::collections::HashMap::new();
    extra.insert("aud".to_string(), json!(["https://rs.example.com"]));

    let contribution = client.auth_for(Some(&extra)).unwrap();

    let assertion = contribution.form.get("client_assertion").unwrap();
    let decoded = decode_jwt(assertion).unwrap();

    assert_eq!(vec!["https://rs.example.com"], decoded.payload.audience().unwrap());
}

#[test]
fn resolves_the_default_method_to_secret_basic() {
    let client = test_issuer()
        .client(
            ClientMetadata {
                client_id: Some("client".to_string()),
                client_secret: Some("secret".to_string()),
                ..Default::default()
            },
            None,
            None,
        )
        .unwrap();

    assert!(matches!(
        client.client_authentication(),
        ClientAuthentication::SecretBasic { .. }
    ));
    assert_eq!("client_secret_basic", client.client_authentication().method());
}

#[test]
fn unknown_methods_are_rejected() {
    let err = test_issuer()
        .client(
            ClientMetadata {
                client_id: Some("client".to_string()),
                token_endpoint_auth_method: Some("carrier_pigeon".to_string()),
                ..Default::default()
            },
            None,
            None,
        )
        .unwrap_err();

    assert!(err.is_configuration_error());
}
