//! # Types Module
//! All the request, response, parameter and error types of the crate.

mod authorization_parameters;
mod callback_params;
mod client_metadata;
mod client_options;
mod device;
mod errors;
pub(crate) mod http_client;
mod grant;
mod issuer_metadata;
mod par_response;

pub use authorization_parameters::AuthorizationParameters;
pub use callback_params::{CallbackChecks, CallbackExtras, CallbackParams};
pub use client_metadata::ClientMetadata;
pub use client_options::ClientOptions;
pub use device::{
    DeviceAuthorizationExtras, DeviceAuthorizationParams, DeviceAuthorizationResponse,
    DeviceFlowGrantResponse, DeviceFlowState,
};
pub use errors::{CheckFailure, ErrorWithMessage, RpError, RpReturnType, StandardBodyError};
pub use grant::{GrantExtras, GrantParams};
pub use http_client::{
    ClientCertificate, HttpMethod, HttpRequest, HttpResponse, RpHttpClient,
};
pub use issuer_metadata::{IssuerMetadata, MtlsEndpoints};
pub use par_response::ParResponse;
