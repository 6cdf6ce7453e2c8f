use std::collections::HashMap;

use serde::Deserialize;
use serde_json::Value;

use crate::client::DpopHandle;
use crate::tokenset::TokenSet;

/// # DeviceAuthorizationResponse
/// The raw response from the device authorization endpoint. Field presence is
/// validated when a [crate::client::DeviceFlowHandle] is constructed from it.
#[derive(Deserialize, Debug, Clone, Default)]
pub struct DeviceAuthorizationResponse {
    /// The end-user verification URI on the authorization server
    pub verification_uri: Option<String>,
    /// A verification URI that includes the `user_code`, for non-textual
    /// transmission
    pub verification_uri_complete: Option<String>,
    /// The end user verification code
    pub user_code: Option<String>,
    /// The device code
    pub device_code: Option<String>,
    /// The lifetime in seconds of the `device_code` and `user_code`
    pub expires_in: Option<u64>,
    /// The minimum number of seconds the client waits between polling
    /// requests to the token endpoint
    pub interval: Option<u64>,
}

/// # DeviceAuthorizationParams
/// Customization of the device authorization request.
#[derive(Debug, Default)]
pub struct DeviceAuthorizationParams {
    /// Overrides the client id sent with the request
    pub client_id: Option<String>,
    /// Scope requested. Defaults to `openid`.
    pub scope: Option<Vec<String>>,
    /// Maximum authentication age enforced on a returned ID Token
    pub max_age: Option<u64>,
    /// Other parameters sent with the device authorization request
    pub other: HashMap<String, String>,
}

/// # DeviceAuthorizationExtras
/// Additional material carried through every poll of a device flow.
#[derive(Debug, Default)]
pub struct DeviceAuthorizationExtras {
    /// Extra body parameters for each token request
    pub exchange_body: Option<HashMap<String, String>>,
    /// Extra claims merged into the client authentication assertion
    pub client_assertion_payload: Option<HashMap<String, Value>>,
    /// DPoP handle owned by this flow
    pub dpop: Option<DpopHandle>,
}

/// # DeviceFlowGrantResponse
/// Outcome of a single token request attempt made by
/// [crate::client::DeviceFlowHandle::grant_async].
#[derive(Debug)]
pub enum DeviceFlowGrantResponse {
    /// The user approved the request; the validated token set is attached
    Successful(Box<TokenSet>),
    /// The user has not approved or denied yet, ask again after the interval
    AuthorizationPending,
    /// The server asked to slow down; the interval grew by 5 seconds
    SlowDown,
    /// The attempt was made before the interval elapsed, no request was sent
    Debounced,
}

/// # DeviceFlowState
/// Lifecycle of a device authorization grant. `Succeeded`, `Expired`,
/// `Aborted` and `Failed` are absorbing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceFlowState {
    /// Handle created from a device authorization response, no request made
    Issued,
    /// At least one token request was made and the flow is still undecided
    Polling,
    /// A token response was received and validated
    Succeeded,
    /// The device code expired before the user approved the request
    Expired,
    /// The caller cancelled the flow
    Aborted,
    /// The server returned a non-retryable error
    Failed,
}

impl DeviceFlowState {
    /// Whether the state is absorbing
    pub fn is_terminal(&self) -> bool {
        !matches!(self, DeviceFlowState::Issued | DeviceFlowState::Polling)
    }
}
