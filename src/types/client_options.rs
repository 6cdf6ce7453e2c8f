use std::time::Duration;

/// # ClientOptions
/// Execution options of a [crate::client::Client]. Each option is an explicit
/// field with one documented effect; options are fixed at construction.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// The authorization callback insists on a JARM `response` JWT and rejects
    /// plain parameter responses.
    pub require_jarm: bool,
    /// Token requests insist on a DPoP handle; a grant issued without one is a
    /// configuration error.
    pub require_dpop: bool,
    /// Authorization urls built through the PAR composition always wrap the
    /// parameters into a signed request object first.
    pub require_signed_request_object: bool,
    /// Allowed clock skew applied to `exp`/`iat`/`nbf` checks. Default 60s.
    pub clock_tolerance: Duration,
    /// Device flow polling interval used when the server does not send one.
    /// Default 5s.
    pub default_poll_interval: Duration,
    /// `azp` values accepted in addition to the client id.
    pub additional_authorized_parties: Option<Vec<String>>,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            require_jarm: false,
            require_dpop: false,
            require_signed_request_object: false,
            clock_tolerance: Duration::from_secs(60),
            default_poll_interval: Duration::from_secs(5),
            additional_authorized_parties: None,
        }
    }
}
