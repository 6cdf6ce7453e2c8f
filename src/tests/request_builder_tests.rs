use std::collections::HashMap;

use crate::{
    helpers::decode_jwt,
    types::{AuthorizationParameters, ClientMetadata, HttpMethod},
};

use super::helpers::{public_client, test_issuer};
use super::test_http_client::TestHttpReqRes;

fn query_map(url: &url::Url) -> HashMap<String, String> {
    url.query_pairs()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

mod authorization_url {
    use super::*;

    #[test]
    fn merges_the_client_defaults_into_the_parameters() {
        let client = test_issuer()
            .client(
                ClientMetadata {
                    client_id: Some("client".to_string()),
                    token_endpoint_auth_method: Some("none".to_string()),
                    redirect_uri: Some("https://rp.example.com/cb".to_string()),
                    ..Default::default()
                },
                None,
                None,
            )
            .unwrap();

        let url = client
            .authorization_url(AuthorizationParameters::default())
            .unwrap();

        assert_eq!("https://op.example.com/auth", &url[..url::Position::AfterPath]);

        let query = query_map(&url);

        assert_eq!("client", query.get("client_id").unwrap());
        assert_eq!("openid", query.get("scope").unwrap());
        assert_eq!("code", query.get("response_type").unwrap());
        assert_eq!("https://rp.example.com/cb", query.get("redirect_uri").unwrap());
    }

    #[test]
    fn caller_parameters_win_over_the_defaults() {
        let client = public_client();

        let url = client
            .authorization_url(AuthorizationParameters {
                scope: Some(vec!["openid".to_string(), "profile".to_string()]),
                state: Some("state-value".to_string()),
                nonce: Some("nonce-value".to_string()),
                code_challenge: Some("challenge".to_string()),
                code_challenge_method: Some("S256".to_string()),
                ..Default::default()
            })
            .unwrap();

        let query = query_map(&url);

        assert_eq!("openid profile", query.get("scope").unwrap());
        assert_eq!("state-value", query.get("state").unwrap());
        assert_eq!("nonce-value", query.get("nonce").unwrap());
        assert_eq!("challenge", query.get("code_challenge").unwrap());
        assert_eq!("S256", query.get("code_challenge_method").unwrap());
    }

    #[test]
    fn other_parameters_are_serialized_too() {
        let client = public_client();

        let mut other = HashMap::new();
        other.insert("foo".to_string(), "bar".to_string());

        let url = client
            .authorization_url(AuthorizationParameters {
                other: Some(other),
                ..Default::default()
            })
            .unwrap();

        assert_eq!(Some("bar"), query_map(&url).get("foo").map(|x| x.as_str()));
    }
}

mod request_object {
    use super::*;

    use crate::jwks::Jwks;
    use crate::tests::helpers::generate_signing_key;

    #[test]
    fn unsecured_when_no_signing_alg_is_configured() {
        let client = public_client();

        let request = client
            .request_object(AuthorizationParameters {
                state: Some("foo".to_string()),
                ..Default::default()
            })
            .unwrap();

        assert!(request.ends_with('.'));

        let parts: Vec<&str> = request.split('.').collect();
        assert_eq!(3, parts.len());

        let header: serde_json::Value =
            serde_json::from_slice(&base64_url::decode(parts[0]).unwrap()).unwrap();
        assert_eq!("none", header["alg"]);
        assert_eq!("oauth-authz-req+jwt", header["typ"]);

        let payload: serde_json::Value =
            serde_json::from_slice(&base64_url::decode(parts[1]).unwrap()).unwrap();
        assert_eq!("client", payload["iss"]);
        assert_eq!("client", payload["client_id"]);
        assert_eq!("https://op.example.com", payload["aud"]);
        assert_eq!("foo", payload["state"]);
    }

    #[test]
    fn signed_with_the_configured_alg_and_key() {
        let key = generate_signing_key("ES256", "request-key");

        let client = test_issuer()
            .client(
                ClientMetadata {
                    client_id: Some("client".to_string()),
                    token_endpoint_auth_method: Some("none".to_string()),
                    request_object_signing_alg: Some("ES256".to_string()),
                    ..Default::default()
                },
                Some(Jwks::from_keys(vec![key])),
                None,
            )
            .unwrap();

        let request = client
            .request_object(AuthorizationParameters::default())
            .unwrap();

        let decoded = decode_jwt(&request).unwrap();

        assert_eq!(Some("ES256"), decoded.header.algorithm());
        assert_eq!(Some("request-key"), decoded.header.key_id());
        assert_eq!(Some("oauth-authz-req+jwt"), decoded.header.token_type());
        assert!(decoded.payload.claim("exp").is_some());
        assert!(decoded.payload.claim("jti").is_some());
        assert!(!decoded.signature.is_empty());
    }
}

mod pushed_authorization_request {
    use super::*;

    #[tokio::test]
    async fn returns_the_request_uri() {
        let http_client = TestHttpReqRes::new("https://op.example.com/par")
            .assert_request_method(HttpMethod::POST)
            .assert_request_header("accept", vec!["application/json".to_string()])
            .assert_request_header(
                "content-type",
                vec!["application/x-www-form-urlencoded".to_string()],
            )
            .assert_request_header("content-length", vec!["64".to_string()])
            .assert_request_body(
                "client_id=client&response_type=code&scope=openid&state=par-state",
            )
            .set_response_status_code(201)
            .set_response_content_type_header("application/json")
            .set_response_body(
                r#"{"request_uri": "urn:ietf:params:oauth:request_uri:abc", "expires_in": 60}"#,
            )
            .build();

        let mut client = public_client();

        let par = client
            .pushed_authorization_request_async(
                &http_client,
                Some(AuthorizationParameters {
                    state: Some("par-state".to_string()),
                    ..Default::default()
                }),
                None,
            )
            .await
            .unwrap();

        assert_eq!("urn:ietf:params:oauth:request_uri:abc", par.request_uri);
        assert_eq!(60, par.expires_in);

        http_client.assert();
    }

    #[tokio::test]
    async fn a_response_without_request_uri_is_rejected() {
        let http_client = TestHttpReqRes::new("https://op.example.com/par")
            .assert_request_method(HttpMethod::POST)
            .set_response_status_code(201)
            .set_response_content_type_header("application/json")
            .set_response_body(r#"{"expires_in": 60}"#)
            .build();

        let mut client = public_client();

        let err = client
            .pushed_authorization_request_async(&http_client, None, None)
            .await
            .unwrap_err();

        assert!(err.is_validation_error());
        assert_eq!("response", err.validation_error().check);
    }

    #[tokio::test]
    async fn requires_the_issuer_to_have_a_par_endpoint() {
        let issuer = crate::issuer::Issuer::new(crate::types::IssuerMetadata {
            issuer: "https://op.example.com".to_string(),
            token_endpoint: Some("https://op.example.com/token".to_string()),
            ..Default::default()
        });

        let mut client = issuer
            .client(
                ClientMetadata {
                    client_id: Some("client".to_string()),
                    token_endpoint_auth_method: Some("none".to_string()),
                    ..Default::default()
                },
                None,
                None,
            )
            .unwrap();

        let err = client
            .pushed_authorization_request_async(
                &super::super::test_http_client::TestHttpClient::new(),
                None,
                None,
            )
            .await
            .unwrap_err();

        assert!(err.is_configuration_error());
        assert_eq!(
            "pushed_authorization_request_endpoint must be configured on the issuer",
            err.configuration_error().message
        );
    }
}

mod par_composition {
    use super::*;

    use crate::jwks::Jwks;
    use crate::tests::helpers::generate_signing_key;

    #[tokio::test]
    async fn wraps_into_a_request_object_before_the_push() {
        let key = generate_signing_key("ES256", "request-key");

        let mut client = test_issuer()
            .client(
                ClientMetadata {
                    client_id: Some("client".to_string()),
                    token_endpoint_auth_method: Some("none".to_string()),
                    request_object_signing_alg: Some("ES256".to_string()),
                    ..Default::default()
                },
                Some(Jwks::from_keys(vec![key])),
                None,
            )
            .unwrap();

        let http_client = TestHttpReqRes::new("https://op.example.com/par")
            .assert_request_method(HttpMethod::POST)
            .set_response_status_code(201)
            .set_response_content_type_header("application/json")
            .set_response_body(
                r#"{"request_uri": "urn:ietf:params:oauth:request_uri:wrapped", "expires_in": 60}"#,
            )
            .build();

        let url = client
            .par_authorization_url_async(
                &http_client,
                AuthorizationParameters {
                    state: Some("par-state".to_string()),
                    ..Default::default()
                },
                None,
            )
            .await
            .unwrap();

        // the push consumed the sole scripted request and carried a signed
        // request object
        http_client.assert();

        let query = query_map(&url);

        assert_eq!(2, query.len());
        assert_eq!("client", query.get("client_id").unwrap());
        assert_eq!(
            "urn:ietf:params:oauth:request_uri:wrapped",
            query.get("request_uri").unwrap()
        );
    }

    #[tokio::test]
    async fn plain_parameters_are_pushed_when_no_jar_is_required() {
        let mut client = public_client();

        let http_client = TestHttpReqRes::new("https://op.example.com/par")
            .assert_request_method(HttpMethod::POST)
            .assert_request_body("client_id=client&response_type=code&scope=openid")
            .set_response_status_code(201)
            .set_response_content_type_header("application/json")
            .set_response_body(
                r#"{"request_uri": "urn:ietf:params:oauth:request_uri:plain", "expires_in": 60}"#,
            )
            .build();

        let url = client
            .par_authorization_url_async(
                &http_client,
                AuthorizationParameters::default(),
                None,
            )
            .await
            .unwrap();

        let query = query_map(&url);

        assert_eq!("client", query.get("client_id").unwrap());
        assert_eq!(
            "urn:ietf:params:oauth:request_uri:plain",
            query.get("request_uri").unwrap()
        );
        assert!(!query.contains_key("scope"));
    }
}
