//! Default Http Client

use std::time::Duration;

use reqwest::{header::CONTENT_TYPE, ClientBuilder, Identity, Method, Response};

use crate::types::{HttpMethod, HttpRequest, HttpResponse, RpHttpClient};

/// The default [RpHttpClient], backed by reqwest with native TLS. Supplies
/// the mutual TLS identity out of the certificate attached to the request.
pub struct DefaultHttpClient;

impl DefaultHttpClient {
    async fn to_response(response: Response) -> HttpResponse {
        let status_code = response.status().as_u16();
        let response_headers = response.headers().clone();

        let content_type = response_headers
            .get(CONTENT_TYPE)
            .and_then(|ct| ct.to_str().ok())
            .map(|ct| ct.to_string());

        let dpop_nonce = response_headers
            .get("dpop-nonce")
            .and_then(|dn| dn.to_str().ok())
            .map(|dn| dn.to_string());

        let body = match response.text().await {
            Ok(body) if !body.is_empty() => Some(body),
            _ => None,
        };

        HttpResponse {
            status_code,
            content_type,
            dpop_nonce,
            body,
        }
    }
}

impl RpHttpClient for DefaultHttpClient {
    async fn request(&self, req: HttpRequest) -> Result<HttpResponse, String> {
        let mut builder = ClientBuilder::new().connect_timeout(Duration::from_secs(10));

        if let Some(certificate) = &req.client_certificate {
            let identity =
                Identity::from_pkcs8_pem(certificate.cert.as_bytes(), certificate.key.as_bytes())
                    .map_err(|e| format!("{e}"))?;
            builder = builder.identity(identity);
        }

        let client = builder.build().map_err(|e| format!("{e}"))?;

        let method = match req.method {
            HttpMethod::GET => Method::GET,
            HttpMethod::POST => Method::POST,
        };

        let mut req_builder = client.request(method, req.url);

        if let Some(body) = req.body {
            req_builder = req_builder.body(body);
        }

        for (name, values) in req.headers {
            for value in values {
                req_builder = req_builder.header(name.clone(), value);
            }
        }

        req_builder = req_builder.header(
            "User-Agent",
            "oidc-rp (https://github.com/oidc-rs/oidc-rp)",
        );

        match req_builder.send().await {
            Ok(res) => Ok(Self::to_response(res).await),
            Err(e) => Err(format!("{e}")),
        }
    }
}
