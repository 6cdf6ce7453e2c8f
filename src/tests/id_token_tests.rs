use serde_json::json;

use crate::helpers::now;
use crate::types::{CallbackChecks, CallbackParams, ClientMetadata, HttpMethod};

use super::helpers::{generate_signing_key, public_jwks_body, sign_jwt, test_issuer};
use super::test_http_client::TestHttpReqRes;

fn es256_client() -> crate::client::Client {
    test_issuer()
        .client(
            ClientMetadata {
                client_id: Some("client".to_string()),
                token_endpoint_auth_method: Some("none".to_string()),
                id_token_signed_response_alg: Some("ES256".to_string()),
                ..Default::default()
            },
            None,
            None,
        )
        .unwrap()
}

fn token_response_with(id_token: &str) -> String {
    format!(
        r#"{{"access_token": "at", "token_type": "Bearer", "id_token": "{id_token}"}}"#
    )
}

#[tokio::test]
async fn an_id_token_signed_with_alg_none_is_always_rejected() {
    let http_client = TestHttpReqRes::new("https://op.example.com/token")
        .assert_request_method(HttpMethod::POST)
        .set_response_content_type_header("application/json")
        .set_response_body(token_response_with(
            "eyJhbGciOiJub25lIn0.eyJzdWIiOiJzdWJqZWN0In0.",
        ))
        .build();

    let mut client = public_client_expecting_rs256();

    let err = client
        .callback_async(
            &http_client,
            None,
            CallbackParams {
                code: Some("codeValue".to_string()),
                ..Default::default()
            },
            None,
            None,
        )
        .await
        .unwrap_err();

    assert!(err.is_validation_error());
    assert_eq!("algorithm", err.validation_error().check);
    assert_eq!(
        "JWTs signed with alg none are not accepted",
        err.validation_error().message
    );
}

fn public_client_expecting_rs256() -> crate::client::Client {
    super::helpers::public_client()
}

#[tokio::test]
async fn an_expired_id_token_fails_the_timestamp_check_regardless_of_signature() {
    let header = base64_url::encode(r#"{"alg":"RS256"}"#);
    let payload = base64_url::encode(
        &json!({
            "iss": "https://op.example.com",
            "sub": "subject",
            "aud": "client",
            "exp": now() - 600,
            "iat": now() - 900
        })
        .to_string(),
    );
    let id_token = format!("{header}.{payload}.bm90LWEtc2lnbmF0dXJl");

    let http_client = TestHttpReqRes::new("https://op.example.com/token")
        .assert_request_method(HttpMethod::POST)
        .set_response_content_type_header("application/json")
        .set_response_body(token_response_with(&id_token))
        .build();

    let mut client = public_client_expecting_rs256();

    let err = client
        .callback_async(
            &http_client,
            None,
            CallbackParams {
                code: Some("codeValue".to_string()),
                ..Default::default()
            },
            None,
            None,
        )
        .await
        .unwrap_err();

    assert!(err.is_validation_error());
    assert_eq!("timestamp", err.validation_error().check);
    assert!(err.validation_error().message.starts_with("JWT expired"));
}

#[tokio::test]
async fn a_wrong_issuer_is_rejected() {
    let header = base64_url::encode(r#"{"alg":"RS256"}"#);
    let payload = base64_url::encode(
        &json!({
            "iss": "https://op.evil.com",
            "sub": "subject",
            "aud": "client",
            "exp": now() + 300,
            "iat": now()
        })
        .to_string(),
    );
    let id_token = format!("{header}.{payload}.bm90LWEtc2lnbmF0dXJl");

    let http_client = TestHttpReqRes::new("https://op.example.com/token")
        .assert_request_method(HttpMethod::POST)
        .set_response_content_type_header("application/json")
        .set_response_body(token_response_with(&id_token))
        .build();

    let mut client = public_client_expecting_rs256();

    let err = client
        .callback_async(
            &http_client,
            None,
            CallbackParams {
                code: Some("codeValue".to_string()),
                ..Default::default()
            },
            None,
            None,
        )
        .await
        .unwrap_err();

    assert!(err.is_validation_error());
    assert_eq!("issuer", err.validation_error().check);
}

#[tokio::test]
async fn an_audience_without_the_client_id_is_rejected() {
    let header = base64_url::encode(r#"{"alg":"RS256"}"#);
    let payload = base64_url::encode(
        &json!({
            "iss": "https://op.example.com",
            "sub": "subject",
            "aud": "someone-else",
            "exp": now() + 300,
            "iat": now()
        })
        .to_string(),
    );
    let id_token = format!("{header}.{payload}.bm90LWEtc2lnbmF0dXJl");

    let http_client = TestHttpReqRes::new("https://op.example.com/token")
        .assert_request_method(HttpMethod::POST)
        .set_response_content_type_header("application/json")
        .set_response_body(token_response_with(&id_token))
        .build();

    let mut client = public_client_expecting_rs256();

    let err = client
        .callback_async(
            &http_client,
            None,
            CallbackParams {
                code: Some("codeValue".to_string()),
                ..Default::default()
            },
            None,
            None,
        )
        .await
        .unwrap_err();

    assert!(err.is_validation_error());
    assert_eq!("audience", err.validation_error().check);
}

#[tokio::test]
async fn a_valid_id_token_unlocks_the_claims() {
    let key = generate_signing_key("ES256", "op-key");

    let id_token = sign_jwt(
        &key,
        "ES256",
        json!({
            "iss": "https://op.example.com",
            "sub": "subject",
            "aud": "client",
            "exp": now() + 300,
            "iat": now(),
            "nonce": "nonce-value"
        }),
    );

    let http_client = crate::tests::test_http_client::TestHttpClient::new()
        .add(
            TestHttpReqRes::new("https://op.example.com/token")
                .assert_request_method(HttpMethod::POST)
                .set_response_content_type_header("application/json")
                .set_response_body(token_response_with(&id_token)),
        )
        .add(
            TestHttpReqRes::new("https://op.example.com/jwks")
                .assert_request_method(HttpMethod::GET)
                .set_response_content_type_header("application/json")
                .set_response_body(public_jwks_body(&key)),
        );

    let mut client = es256_client();

    let token_set = client
        .callback_async(
            &http_client,
            None,
            CallbackParams {
                code: Some("codeValue".to_string()),
                ..Default::default()
            },
            Some(CallbackChecks {
                nonce: Some("nonce-value"),
                ..Default::default()
            }),
            None,
        )
        .await
        .unwrap();

    assert!(token_set.claims_verified());
    let claims = token_set.claims().unwrap();
    assert_eq!("subject", claims.get("sub").unwrap().as_str().unwrap());

    http_client.assert();
}

#[tokio::test]
async fn a_nonce_mismatch_is_rejected_after_the_signature_checks_out() {
    let key = generate_signing_key("ES256", "op-key");

    let id_token = sign_jwt(
        &key,
        "ES256",
        json!({
            "iss": "https://op.example.com",
            "sub": "subject",
            "aud": "client",
            "exp": now() + 300,
            "iat": now(),
            "nonce": "a-different-nonce"
        }),
    );

    let http_client = crate::tests::test_http_client::TestHttpClient::new()
        .add(
            TestHttpReqRes::new("https://op.example.com/token")
                .assert_request_method(HttpMethod::POST)
                .set_response_content_type_header("application/json")
                .set_response_body(token_response_with(&id_token)),
        )
        .add(
            TestHttpReqRes::new("https://op.example.com/jwks")
                .assert_request_method(HttpMethod::GET)
                .set_response_content_type_header("application/json")
                .set_response_body(public_jwks_body(&key)),
        );

    let mut client = es256_client();

    let err = client
        .callback_async(
            &http_client,
            None,
            CallbackParams {
                code: Some("codeValue".to_string()),
                ..Default::default()
            },
            Some(CallbackChecks {
                nonce: Some("nonce-value"),
                ..Default::default()
            }),
            None,
        )
        .await
        .unwrap_err();

    assert!(err.is_validation_error());
    assert_eq!("nonce", err.validation_error().check);
    assert_eq!(
        "nonce mismatch, expected nonce-value, got: a-different-nonce",
        err.validation_error().message
    );
}

#[tokio::test]
async fn a_tampered_signature_is_rejected() {
    let key = generate_signing_key("ES256", "op-key");
    let other_key = generate_signing_key("ES256", "op-key");

    // signed with a key the issuer never published
    let id_token = sign_jwt(
        &other_key,
        "ES256",
        json!({
            "iss": "https://op.example.com",
            "sub": "subject",
            "aud": "client",
            "exp": now() + 300,
            "iat": now()
        }),
    );

    let http_client = crate::tests::test_http_client::TestHttpClient::new()
        .add(
            TestHttpReqRes::new("https://op.example.com/token")
                .assert_request_method(HttpMethod::POST)
                .set_response_content_type_header("application/json")
                .set_response_body(token_response_with(&id_token)),
        )
        .add(
            TestHttpReqRes::new("https://op.example.com/jwks")
                .assert_request_method(HttpMethod::GET)
                .set_response_content_type_header("application/json")
                .set_response_body(public_jwks_body(&key)),
        );

    let mut client = es256_client();

    let err = client
        .callback_async(
            &http_client,
            None,
            CallbackParams {
                code: Some("codeValue".to_string()),
                ..Default::default()
            },
            None,
            None,
        )
        .await
        .unwrap_err();

    assert!(err.is_validation_error());
    assert_eq!("signature", err.validation_error().check);
}
