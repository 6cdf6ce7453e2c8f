use std::collections::HashMap;

use serde_json::json;

use crate::tokenset::{TokenSet, TokenSetParams};

#[test]
fn expiry_is_derived_from_expires_in() {
    let token_set = TokenSet::new(TokenSetParams {
        access_token: Some("at".to_string()),
        expires_in: Some(300),
        ..Default::default()
    });

    assert!(!token_set.expired());
    assert!(token_set.get_expires_at().is_some());
}

#[test]
fn negative_expires_in_means_expired() {
    let token_set = TokenSet::new(TokenSetParams {
        access_token: Some("at".to_string()),
        expires_in: Some(-100),
        ..Default::default()
    });

    assert!(token_set.expired());
}

#[test]
fn claims_are_refused_before_verification() {
    let token_set = TokenSet::new(TokenSetParams {
        access_token: Some("at".to_string()),
        id_token: Some("eyJhbGciOiJub25lIn0.eyJzdWIiOiJzdWJqZWN0In0.".to_string()),
        ..Default::default()
    });

    assert!(!token_set.claims_verified());

    let err = token_set.claims().unwrap_err();

    assert!(err.is_protocol_state_error());
    assert_eq!(
        "id token claims have not been verified yet",
        err.protocol_state_error().message
    );
}

#[test]
fn claims_are_readable_once_verified() {
    let mut token_set = TokenSet::new(TokenSetParams {
        id_token: Some("eyJhbGciOiJub25lIn0.eyJzdWIiOiJzdWJqZWN0In0.".to_string()),
        ..Default::default()
    });

    let mut claims = HashMap::new();
    claims.insert("sub".to_string(), json!("subject"));

    token_set.set_verified_claims(claims);

    assert!(token_set.claims_verified());
    assert_eq!(
        "subject",
        token_set.claims().unwrap().get("sub").unwrap().as_str().unwrap()
    );
}

#[test]
fn decode_claims_reads_the_raw_payload() {
    let token_set = TokenSet::new(TokenSetParams {
        id_token: Some("eyJhbGciOiJub25lIn0.eyJzdWIiOiJzdWJqZWN0In0.".to_string()),
        ..Default::default()
    });

    let claims = token_set.decode_claims().unwrap();

    assert_eq!("subject", claims.get("sub").unwrap().as_str().unwrap());
}

#[test]
fn decode_claims_requires_an_id_token() {
    let token_set = TokenSet::new(TokenSetParams::default());

    let err = token_set.decode_claims().unwrap_err();

    assert!(err.is_protocol_state_error());
}
