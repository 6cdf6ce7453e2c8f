use serde_json::Value;
use tracing::debug;

use crate::helpers::convert_json_to;
use crate::types::{
    HttpRequest, HttpResponse, RpError, RpHttpClient, RpReturnType, StandardBodyError,
};

/// Dispatches a request through the configured [RpHttpClient] and applies the
/// response expectations. Authorization Server error bodies become
/// [RpError::Server] verbatim.
pub(crate) async fn request_async<T>(
    mut request: HttpRequest,
    http_client: &T,
) -> RpReturnType<HttpResponse>
where
    T: RpHttpClient,
{
    if request.mtls {
        request.client_certificate = http_client.get_client_certificate(&request).await;

        if request.client_certificate.is_none() {
            return Err(Box::new(RpError::new_configuration_error(
                "mutual-TLS certificate and key not set",
                None,
            )));
        }
    }

    let expectations = request.expectations;
    let url = request.url.clone();

    debug!(url = %url, method = request.method.as_str(), "sending request");

    let response = match http_client.request(request).await {
        Ok(res) => res,
        Err(e) => {
            return Err(Box::new(RpError::new_configuration_error(
                &format!("request to {url} failed: {e}"),
                None,
            )))
        }
    };

    debug!(url = %url, status = response.status_code, "received response");

    let response = return_error_if_not_expected_status(response, expectations.status_code)?;
    let response = return_error_if_expected_body_is_absent(response, expectations.body)?;
    return_error_if_json_is_invalid(response, expectations.body && expectations.json_body)
}

fn return_error_if_not_expected_status(
    response: HttpResponse,
    expected: u16,
) -> RpReturnType<HttpResponse> {
    if response.status_code != expected {
        if let Some(body) = &response.body {
            if let Ok(sbe) = convert_json_to::<StandardBodyError>(body) {
                return Err(Box::new(RpError::Server(sbe, Some(response))));
            }
        }

        return Err(Box::new(RpError::new_server_error(
            "server_error".to_string(),
            Some(format!(
                "expected {expected}, got: {}",
                response.status_code
            )),
            None,
            Some(response),
        )));
    }

    Ok(response)
}

fn return_error_if_expected_body_is_absent(
    response: HttpResponse,
    expect_body: bool,
) -> RpReturnType<HttpResponse> {
    if expect_body && response.body.is_none() {
        return Err(Box::new(RpError::new_server_error(
            "server_error".to_string(),
            Some("expected a response body but no body was returned".to_string()),
            None,
            Some(response),
        )));
    }

    Ok(response)
}

fn return_error_if_json_is_invalid(
    response: HttpResponse,
    expect_json: bool,
) -> RpReturnType<HttpResponse> {
    if expect_json {
        let invalid = match &response.body {
            Some(body) => convert_json_to::<Value>(body).is_err(),
            None => false,
        };

        if invalid {
            return Err(Box::new(RpError::new_validation_error(
                "response",
                "unexpected body type",
                Some(response),
            )));
        }
    }

    Ok(response)
}
