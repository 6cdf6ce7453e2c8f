use std::fmt;

use serde::Deserialize;

use super::http_client::HttpResponse;

/// # StandardBodyError
/// OAuth 2.0 error document returned by the Authorization Server, either as a
/// token/device/PAR endpoint response body or as authorization callback
/// parameters. Carried verbatim.
#[derive(Debug, Clone, Deserialize)]
pub struct StandardBodyError {
    /// Error code from the server
    pub error: String,
    /// Human readable description
    pub error_description: Option<String>,
    /// Uri with more information about the error
    pub error_uri: Option<String>,
}

/// # ErrorWithMessage
/// Message payload of [RpError] variants that are not server originated.
#[derive(Debug, Clone)]
pub struct ErrorWithMessage {
    /// What went wrong
    pub message: String,
}

/// # CheckFailure
/// Payload of [RpError::Validation]. `check` is a stable, machine readable
/// identifier of the failed check (`"state"`, `"nonce"`, `"timestamp"`,
/// `"algorithm"`, `"signature"`, ...); `message` carries the diagnostic
/// context. Neither ever contains key material.
#[derive(Debug, Clone)]
pub struct CheckFailure {
    /// Identifier of the check that failed
    pub check: &'static str,
    /// What went wrong
    pub message: String,
}

/// # RpError
/// Error returned to the user of this library.
#[derive(Debug)]
pub enum RpError {
    /// Bad or missing client/server metadata, absent key material, transport
    /// failure. Fatal for the flow, never retried.
    Configuration(ErrorWithMessage, Option<HttpResponse>),
    /// The Authorization Server returned an `error`. Surfaced verbatim.
    Server(StandardBodyError, Option<HttpResponse>),
    /// A local security check failed for this exchange.
    Validation(CheckFailure, Option<HttpResponse>),
    /// Caller misuse: reading unverified claims, polling an aborted or busy
    /// handle, missing check arguments.
    ProtocolState(ErrorWithMessage, Option<HttpResponse>),
}

/// Return type used throughout the crate
pub type RpReturnType<T> = Result<T, Box<RpError>>;

impl RpError {
    /// Creates a new [RpError::Configuration]
    pub fn new_configuration_error(message: &str, response: Option<HttpResponse>) -> Self {
        Self::Configuration(
            ErrorWithMessage {
                message: message.to_string(),
            },
            response,
        )
    }

    /// Creates a new [RpError::Server]
    pub fn new_server_error(
        error: String,
        error_description: Option<String>,
        error_uri: Option<String>,
        response: Option<HttpResponse>,
    ) -> Self {
        Self::Server(
            StandardBodyError {
                error,
                error_description,
                error_uri,
            },
            response,
        )
    }

    /// Creates a new [RpError::Validation]
    pub fn new_validation_error(
        check: &'static str,
        message: &str,
        response: Option<HttpResponse>,
    ) -> Self {
        Self::Validation(
            CheckFailure {
                check,
                message: message.to_string(),
            },
            response,
        )
    }

    /// Creates a new [RpError::ProtocolState]
    pub fn new_protocol_state_error(message: &str, response: Option<HttpResponse>) -> Self {
        Self::ProtocolState(
            ErrorWithMessage {
                message: message.to_string(),
            },
            response,
        )
    }

    /// Whether the error is an [RpError::Configuration]
    pub fn is_configuration_error(&self) -> bool {
        matches!(self, Self::Configuration(..))
    }

    /// Whether the error is an [RpError::Server]
    pub fn is_server_error(&self) -> bool {
        matches!(self, Self::Server(..))
    }

    /// Whether the error is an [RpError::Validation]
    pub fn is_validation_error(&self) -> bool {
        matches!(self, Self::Validation(..))
    }

    /// Whether the error is an [RpError::ProtocolState]
    pub fn is_protocol_state_error(&self) -> bool {
        matches!(self, Self::ProtocolState(..))
    }

    /// Borrows the configuration error payload.
    ///
    /// Panics when the error is of another kind.
    pub fn configuration_error(&self) -> &ErrorWithMessage {
        match self {
            Self::Configuration(e, _) => e,
            _ => panic!("not a configuration error"),
        }
    }

    /// Borrows the server error payload.
    ///
    /// Panics when the error is of another kind.
    pub fn server_error(&self) -> &StandardBodyError {
        match self {
            Self::Server(e, _) => e,
            _ => panic!("not a server error"),
        }
    }

    /// Borrows the validation error payload.
    ///
    /// Panics when the error is of another kind.
    pub fn validation_error(&self) -> &CheckFailure {
        match self {
            Self::Validation(e, _) => e,
            _ => panic!("not a validation error"),
        }
    }

    /// Borrows the protocol state error payload.
    ///
    /// Panics when the error is of another kind.
    pub fn protocol_state_error(&self) -> &ErrorWithMessage {
        match self {
            Self::ProtocolState(e, _) => e,
            _ => panic!("not a protocol state error"),
        }
    }

    /// The raw [HttpResponse] the error originated from, if any.
    pub fn response(&self) -> Option<&HttpResponse> {
        match self {
            Self::Configuration(_, r)
            | Self::Server(_, r)
            | Self::Validation(_, r)
            | Self::ProtocolState(_, r) => r.as_ref(),
        }
    }
}

impl fmt::Display for RpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration(e, _) => write!(f, "configuration error: {}", e.message),
            Self::Server(e, _) => match &e.error_description {
                Some(desc) => write!(f, "server error: {} ({desc})", e.error),
                None => write!(f, "server error: {}", e.error),
            },
            Self::Validation(e, _) => write!(f, "{} check failed: {}", e.check, e.message),
            Self::ProtocolState(e, _) => write!(f, "protocol state error: {}", e.message),
        }
    }
}

impl std::error::Error for RpError {}
