//! # Http Client Interface for Custom Http Clients

use std::collections::HashMap;
use std::future;

use url::Url;

use crate::helpers::string_map_to_form_url_encoded;

/// The Http methods issued by this crate
#[derive(Debug, Default, Clone)]
#[cfg_attr(test, derive(PartialEq))]
pub enum HttpMethod {
    /// Fetches a resource (discovery documents, JWK sets)
    #[default]
    GET,
    /// Submits a form (token, device authorization, PAR)
    POST,
}

impl HttpMethod {
    /// Uppercase name of the method, as used in DPoP `htm` claims
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::GET => "GET",
            HttpMethod::POST => "POST",
        }
    }
}

/// The expectations set by methods such as discover, token grant, callback etc...
#[derive(Debug, Clone, Copy)]
pub struct HttpResponseExpectations {
    /// Whether or not to expect body with the response
    pub body: bool,
    /// Specifies if the response should be of type json and validates it
    pub json_body: bool,
    /// Expected status code from the server
    pub status_code: u16,
}

/// The client certificate used for mutual TLS
#[derive(Debug)]
pub struct ClientCertificate {
    /// Client public certificate in pem format.
    pub cert: String,
    /// Client private key in pem format.
    pub key: String,
}

/// # HttpRequest
/// Internal description of an outgoing request, handed to the [RpHttpClient].
#[derive(Debug)]
pub struct HttpRequest {
    /// Url of the request
    pub url: Url,
    /// Http method of the request
    pub method: HttpMethod,
    /// Headers that are sent in the request
    pub headers: HashMap<String, Vec<String>>,
    /// The request body to be sent
    pub body: Option<String>,
    /// Specifies if the request is MTLS and needs client certificate
    pub mtls: bool,
    /// Client certificate to be used in the request
    pub client_certificate: Option<ClientCertificate>,
    /// Expectations to be fulfilled by the response
    pub(crate) expectations: HttpResponseExpectations,
}

impl HttpRequest {
    pub(crate) fn new() -> Self {
        Self {
            url: Url::parse("about:blank").unwrap(),
            method: HttpMethod::GET,
            headers: HashMap::new(),
            body: None,
            mtls: false,
            client_certificate: None,
            expectations: HttpResponseExpectations {
                body: true,
                json_body: true,
                status_code: 200,
            },
        }
    }

    pub(crate) fn url(mut self, url: Url) -> Self {
        self.url = url;
        self
    }

    pub(crate) fn method(mut self, method: HttpMethod) -> Self {
        self.method = method;
        self
    }

    pub(crate) fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        let value = value.into();

        self.headers.entry(name).or_default().push(value);
        self
    }

    pub(crate) fn header_replace(mut self, name: impl Into<String>, value: Vec<String>) -> Self {
        self.headers.insert(name.into(), value);
        self
    }

    pub(crate) fn form(self, form: HashMap<String, String>) -> Self {
        let form_body = string_map_to_form_url_encoded(&form);
        self.header_replace(
            "content-type",
            vec!["application/x-www-form-urlencoded".to_string()],
        )
        .body(form_body)
    }

    pub(crate) fn body(mut self, body: String) -> Self {
        self.headers.insert(
            "content-length".to_string(),
            vec![body.len().to_string()],
        );
        self.body = Some(body);
        self
    }

    pub(crate) fn mtls(mut self, mtls: bool) -> Self {
        self.mtls = mtls;
        self
    }

    pub(crate) fn expect_body(mut self, expect: bool) -> Self {
        self.expectations.body = expect;
        self
    }

    pub(crate) fn expect_json_body(mut self, expect: bool) -> Self {
        self.expectations.json_body = expect;
        self
    }

    pub(crate) fn expect_status_code(mut self, code: u16) -> Self {
        self.expectations.status_code = code;
        self
    }
}

/// Represents an HTTP response received from a server.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// The HTTP status code of the response
    pub status_code: u16,
    /// The content type header
    pub content_type: Option<String>,
    /// The DPoP-Nonce challenge header
    pub dpop_nonce: Option<String>,
    /// The optional body content of the response. None if there is no body.
    pub body: Option<String>,
}

/// This trait is the transport seam of the library. All protocol code issues
/// requests through it; users who need a custom HTTP stack implement it.
pub trait RpHttpClient {
    /// Gets the client certificate for the current request. Return none if the
    /// request does not need mutual TLS.
    fn get_client_certificate(
        &self,
        _req: &HttpRequest,
    ) -> impl std::future::Future<Output = Option<ClientCertificate>> + Send {
        future::ready(None)
    }

    /// Sends the request and resolves to the raw response, or an `Err(String)`
    /// describing the transport failure. Status codes are not errors at this
    /// layer; the library interprets them.
    fn request(
        &self,
        req: HttpRequest,
    ) -> impl std::future::Future<Output = Result<HttpResponse, String>> + Send;
}
