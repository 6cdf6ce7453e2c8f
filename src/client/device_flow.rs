use std::collections::HashMap;
use std::future::Future;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use tracing::debug;

use crate::helpers::convert_json_to;
use crate::tokenset::TokenSet;
use crate::types::{
    DeviceAuthorizationExtras, DeviceAuthorizationParams, DeviceAuthorizationResponse,
    DeviceFlowGrantResponse, DeviceFlowState, GrantExtras, GrantParams, RpError, RpHttpClient,
    RpReturnType,
};

use super::auth::{AuthenticatedEndpoint, AuthenticationPostParams};
use super::id_token::{ReturnedBy, ValidateIdTokenParams};
use super::Client;

const DEVICE_CODE_GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:device_code";
const SLOW_DOWN_STEP: Duration = Duration::from_secs(5);

/// The delay primitive the device flow polls with. The loop never sleeps on
/// its own; tests inject a recording implementation, real callers usually
/// pass an async runtime's sleep as a closure:
///
/// `handle.poll_async(&http_client, &|d| tokio::time::sleep(d)).await`
pub trait PollDelay {
    /// Resolves after `duration` has elapsed
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()>;
}

impl<F, Fut> PollDelay for F
where
    F: Fn(Duration) -> Fut,
    Fut: Future<Output = ()>,
{
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> {
        self(duration)
    }
}

/// Cancels a running device flow. Cloneable and settable from anywhere; the
/// flow observes it at its poll boundaries, with a worst case added latency
/// of one polling interval.
#[derive(Debug, Clone)]
pub struct DeviceFlowAbortHandle(Arc<AtomicBool>);

impl DeviceFlowAbortHandle {
    /// Signals the flow to stop. An in-flight request completes but its
    /// result is discarded, and no further request is issued.
    pub fn abort(&self) {
        self.0.store(true, Ordering::Relaxed);
    }
}

impl Client {
    /// # Device Authorization Request
    /// Starts a Device Authorization Grant at the issuer's
    /// `device_authorization_endpoint` and returns the handle driving the
    /// polling.
    ///
    /// The response must carry non-empty `verification_uri`, `user_code` and
    /// `device_code` strings and a positive `expires_in`; anything else is a
    /// fatal validation error.
    pub async fn device_authorization_async<T>(
        &mut self,
        http_client: &T,
        params: DeviceAuthorizationParams,
        extras: Option<DeviceAuthorizationExtras>,
    ) -> RpReturnType<DeviceFlowHandle>
    where
        T: RpHttpClient,
    {
        if self.issuer.token_endpoint.is_none() {
            return Err(Box::new(RpError::new_configuration_error(
                "token_endpoint must be configured on the issuer",
                None,
            )));
        }

        if self.issuer.device_authorization_endpoint.is_none() {
            return Err(Box::new(RpError::new_configuration_error(
                "device_authorization_endpoint must be configured on the issuer",
                None,
            )));
        }

        let mut body: HashMap<String, String> = params
            .other
            .into_iter()
            .filter(|(k, _)| k != "redirect_uri" && k != "response_type")
            .collect();

        body.insert(
            "client_id".to_string(),
            params.client_id.unwrap_or_else(|| self.client_id.clone()),
        );

        body.insert(
            "scope".to_string(),
            params
                .scope
                .map(|s| s.join(" "))
                .unwrap_or_else(|| "openid".to_string()),
        );

        let auth_params = AuthenticationPostParams {
            client_assertion_payload: extras
                .as_ref()
                .and_then(|x| x.client_assertion_payload.as_ref()),
            dpop: None,
        };

        let res = self
            .authenticated_post_async(
                AuthenticatedEndpoint::DeviceAuthorization,
                body,
                200,
                auth_params,
                http_client,
            )
            .await?;

        let device_res = res
            .body
            .as_deref()
            .and_then(|x| convert_json_to::<DeviceAuthorizationResponse>(x).ok())
            .ok_or_else(|| {
                RpError::new_validation_error(
                    "response",
                    "could not convert the response body to a device authorization response",
                    Some(res),
                )
            })?;

        DeviceFlowHandle::new(self.clone(), device_res, extras, params.max_age)
    }
}

/// # DeviceFlowHandle
/// One Device Authorization Grant: the device/user code pair, the polling
/// state machine and the cancellation flag. States move
/// `Issued → Polling → {Succeeded, Expired, Aborted, Failed}`; the terminal
/// states are absorbing.
#[derive(Debug)]
pub struct DeviceFlowHandle {
    client: Client,
    extras: Option<DeviceAuthorizationExtras>,
    verification_uri: String,
    verification_uri_complete: Option<String>,
    user_code: String,
    device_code: String,
    expires_at: u64,
    interval: Duration,
    max_age: Option<u64>,
    state: DeviceFlowState,
    pub(crate) poll_active: bool,
    aborted: Arc<AtomicBool>,
    last_requested: u64,
    pub(crate) now: fn() -> u64,
}

impl DeviceFlowHandle {
    /// Creates a handle from a device authorization response, validating its
    /// shape. See [Client::device_authorization_async].
    pub fn new(
        client: Client,
        response: DeviceAuthorizationResponse,
        extras: Option<DeviceAuthorizationExtras>,
        max_age: Option<u64>,
    ) -> RpReturnType<Self> {
        let verification_uri = required_string(response.verification_uri, "verification_uri")?;
        let user_code = required_string(response.user_code, "user_code")?;
        let device_code = required_string(response.device_code, "device_code")?;

        let expires_in = match response.expires_in {
            Some(e) if e > 0 => e,
            got => {
                return Err(Box::new(RpError::new_validation_error(
                    "response",
                    &format!(
                        "expected expires_in to be a positive number in the Device Authorization Response, got {got:?}"
                    ),
                    None,
                )))
            }
        };

        let interval = response
            .interval
            .map(Duration::from_secs)
            .unwrap_or(client.options.default_poll_interval);

        let now = client.now;

        Ok(Self {
            client,
            extras,
            verification_uri,
            verification_uri_complete: response.verification_uri_complete,
            user_code,
            device_code,
            expires_at: now().wrapping_add(expires_in),
            interval,
            max_age,
            state: DeviceFlowState::Issued,
            poll_active: false,
            aborted: Arc::new(AtomicBool::new(false)),
            last_requested: 0,
            now,
        })
    }

    /// Timestamp in seconds at which the device code expires
    pub fn expires_at(&self) -> u64 {
        self.expires_at
    }

    /// Seconds until the device code expires
    pub fn expires_in(&self) -> u64 {
        self.expires_at.saturating_sub((self.now)())
    }

    /// Whether the device code has expired
    pub fn expired(&self) -> bool {
        self.expires_in() == 0
    }

    /// The current polling interval
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// The current lifecycle state
    pub fn state(&self) -> DeviceFlowState {
        self.state
    }

    /// The inner client
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// The device code
    pub fn device_code(&self) -> &str {
        &self.device_code
    }

    /// The user code the end user enters at the verification uri
    pub fn user_code(&self) -> &str {
        &self.user_code
    }

    /// The verification uri the end user opens out of band
    pub fn verification_uri(&self) -> &str {
        &self.verification_uri
    }

    /// The verification uri with the user code embedded, when the server
    /// provides one
    pub fn verification_uri_complete(&self) -> Option<&String> {
        self.verification_uri_complete.as_ref()
    }

    /// A handle that cancels this flow from anywhere, including mid-wait
    pub fn abort_handle(&self) -> DeviceFlowAbortHandle {
        DeviceFlowAbortHandle(self.aborted.clone())
    }

    /// ## Poll until decided
    /// Drives the polling loop: waits the current interval between token
    /// requests, keeps polling through `authorization_pending`, backs off by
    /// 5 seconds on every `slow_down`, and stops on success, device code
    /// expiry, cancellation, or any other server error.
    ///
    /// Only one poll may be active per handle; a second concurrent start and
    /// polling a concluded handle are protocol state errors.
    pub async fn poll_async<T, D>(&mut self, http_client: &T, delay: &D) -> RpReturnType<TokenSet>
    where
        T: RpHttpClient,
        D: PollDelay,
    {
        if self.poll_active {
            return Err(Box::new(RpError::new_protocol_state_error(
                "another poll is already active for this device flow handle",
                None,
            )));
        }

        if self.state.is_terminal() {
            return Err(Box::new(RpError::new_protocol_state_error(
                "the device authorization session has already concluded",
                None,
            )));
        }

        self.poll_active = true;
        let result = self.poll_loop(http_client, delay).await;
        self.poll_active = false;

        result
    }

    async fn poll_loop<T, D>(&mut self, http_client: &T, delay: &D) -> RpReturnType<TokenSet>
    where
        T: RpHttpClient,
        D: PollDelay,
    {
        loop {
            if self.observe_abort() {
                return Err(Box::new(RpError::new_protocol_state_error(
                    "polling aborted",
                    None,
                )));
            }

            if self.expired() {
                self.state = DeviceFlowState::Expired;
                debug!(device_code = %self.device_code, "device code expired");
                return Err(Box::new(self.expired_error()));
            }

            delay.sleep(self.interval).await;

            if self.observe_abort() {
                return Err(Box::new(RpError::new_protocol_state_error(
                    "polling aborted",
                    None,
                )));
            }

            match self.attempt_async(http_client).await? {
                DeviceFlowGrantResponse::Successful(token_set) => return Ok(*token_set),
                DeviceFlowGrantResponse::AuthorizationPending
                | DeviceFlowGrantResponse::SlowDown
                | DeviceFlowGrantResponse::Debounced => continue,
            }
        }
    }

    /// ## Single token request attempt
    /// Performs one grant request at the token endpoint. This method does not
    /// poll; [Self::poll_async] does, or the caller drives its own loop.
    ///
    /// Attempts made before the current interval elapsed are debounced
    /// without touching the network.
    pub async fn grant_async<T>(
        &mut self,
        http_client: &T,
    ) -> RpReturnType<DeviceFlowGrantResponse>
    where
        T: RpHttpClient,
    {
        if !self.state.is_terminal()
            && (self.now)().wrapping_sub(self.last_requested) < self.interval.as_secs()
        {
            return Ok(DeviceFlowGrantResponse::Debounced);
        }

        self.attempt_async(http_client).await
    }

    /// One token request without the debounce guard. [Self::poll_async] has
    /// already waited the interval when it gets here.
    async fn attempt_async<T>(
        &mut self,
        http_client: &T,
    ) -> RpReturnType<DeviceFlowGrantResponse>
    where
        T: RpHttpClient,
    {
        if self.state.is_terminal() {
            return Err(Box::new(RpError::new_protocol_state_error(
                "the device authorization session has already concluded",
                None,
            )));
        }

        if self.observe_abort() {
            return Err(Box::new(RpError::new_protocol_state_error(
                "polling aborted",
                None,
            )));
        }

        if self.expired() {
            self.state = DeviceFlowState::Expired;
            return Err(Box::new(self.expired_error()));
        }

        self.state = DeviceFlowState::Polling;

        let mut body = HashMap::new();

        if let Some(exchange_body) = self.extras.as_ref().and_then(|x| x.exchange_body.as_ref()) {
            for (k, v) in exchange_body {
                body.insert(k.to_owned(), v.to_owned());
            }
        }

        body.insert("grant_type".to_string(), DEVICE_CODE_GRANT_TYPE.to_owned());
        body.insert("device_code".to_string(), self.device_code.clone());

        self.last_requested = (self.now)();

        let extras = GrantExtras {
            client_assertion_payload: self
                .extras
                .as_ref()
                .and_then(|x| x.client_assertion_payload.clone()),
            dpop: self.extras.as_ref().and_then(|x| x.dpop.as_ref()),
        };

        let grant_result = self
            .client
            .grant_async(
                http_client,
                GrantParams {
                    body,
                    extras,
                    retry: true,
                },
            )
            .await;

        if self.observe_abort() {
            return Err(Box::new(RpError::new_protocol_state_error(
                "polling aborted",
                None,
            )));
        }

        let mut token_set = match grant_result {
            Ok(t) => t,
            Err(e) => match *e {
                RpError::Server(sbe, res) => {
                    if sbe.error == "slow_down" {
                        self.interval += SLOW_DOWN_STEP;
                        debug!(
                            interval = self.interval.as_secs(),
                            "slow_down received, interval increased"
                        );
                        return Ok(DeviceFlowGrantResponse::SlowDown);
                    }

                    if sbe.error == "authorization_pending" {
                        return Ok(DeviceFlowGrantResponse::AuthorizationPending);
                    }

                    self.state = DeviceFlowState::Failed;
                    return Err(Box::new(RpError::Server(sbe, res)));
                }
                other => {
                    self.state = DeviceFlowState::Failed;
                    return Err(Box::new(other));
                }
            },
        };

        if token_set.get_id_token().is_some() {
            token_set = match self
                .client
                .validate_id_token_async(
                    ValidateIdTokenParams {
                        token_set,
                        returned_by: ReturnedBy::Token,
                        nonce: None,
                        max_age: self.max_age,
                        state: None,
                    },
                    http_client,
                )
                .await
            {
                Ok(ts) => ts,
                Err(e) => {
                    self.state = DeviceFlowState::Failed;
                    return Err(e);
                }
            };
        }

        self.state = DeviceFlowState::Succeeded;
        debug!(device_code = %self.device_code, "device authorization grant succeeded");

        Ok(DeviceFlowGrantResponse::Successful(Box::new(token_set)))
    }

    fn observe_abort(&mut self) -> bool {
        if self.aborted.load(Ordering::Relaxed) {
            if !self.state.is_terminal() {
                self.state = DeviceFlowState::Aborted;
                debug!(device_code = %self.device_code, "device flow aborted");
            }
            return true;
        }

        false
    }

    fn expired_error(&self) -> RpError {
        RpError::new_validation_error(
            "device_code",
            &format!(
                "the device code {} has expired and the device authorization session has concluded",
                self.device_code
            ),
            None,
        )
    }
}

fn required_string(value: Option<String>, field: &str) -> RpReturnType<String> {
    match value {
        Some(v) if !v.is_empty() => Ok(v),
        got => Err(Box::new(RpError::new_validation_error(
            "response",
            &format!(
                "expected {field} string to be returned by Device Authorization Response, got {got:?}"
            ),
            None,
        ))),
    }
}
