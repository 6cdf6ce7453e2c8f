//! # TokenSet Module

use std::{cmp::max, collections::HashMap, num::Wrapping};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{helpers::now, types::RpError, types::RpReturnType};

/// # TokenSetParams
/// Argument to create a new [TokenSet]
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct TokenSetParams {
    /// `access_token`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    /// `token_type`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    /// `id_token`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,
    /// `refresh_token`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// `expires_in` - Access token expiration (seconds)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<i64>,
    /// `expires_at` - Access token expiration as seconds since the epoch
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
    /// `session_state`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_state: Option<String>,
    /// `scope`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    /// Any other fields of the token endpoint response
    #[serde(skip_serializing_if = "Option::is_none")]
    pub other: Option<HashMap<String, Value>>,
}

/// # TokenSet
/// The tokens obtained from an authorization callback or a token endpoint
/// grant.
///
/// The ID Token claims are only readable through [`TokenSet::claims()`] after
/// the ID Token has been validated; reading them earlier is a
/// [RpError::ProtocolState] error.
#[derive(Debug, Default, Serialize, Deserialize, Clone)]
pub struct TokenSet {
    #[serde(skip_serializing_if = "Option::is_none")]
    access_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    token_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    id_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    refresh_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    expires_in: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    expires_at: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    session_state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    scope: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    other: Option<HashMap<String, Value>>,
    #[serde(skip)]
    verified_claims: Option<HashMap<String, Value>>,
}

impl TokenSet {
    /// # Create a [TokenSet] instance
    pub fn new(params: TokenSetParams) -> Self {
        let mut tokenset = Self {
            access_token: params.access_token,
            token_type: params.token_type,
            id_token: params.id_token,
            refresh_token: params.refresh_token,
            expires_in: params.expires_in,
            expires_at: params.expires_at,
            session_state: params.session_state,
            scope: params.scope,
            other: params.other,
            verified_claims: None,
        };

        if let (None, Some(e)) = (params.expires_at, params.expires_in) {
            tokenset.expires_at = Some((Wrapping(now() as i64) + Wrapping(e)).0);
        }

        if params.expires_in.is_some_and(|e| e < 0) {
            tokenset.expires_in = Some(0);
        }

        tokenset
    }

    /// Whether the access token is expired
    pub fn expired(&self) -> bool {
        self.remaining_lifetime().is_some_and(|e| e == 0)
    }

    /// The validated ID Token claims.
    ///
    /// Refused with an [RpError::ProtocolState] until the ID Token has been
    /// verified by the callback/grant pipeline; premature access is a
    /// programming error, not a data condition.
    pub fn claims(&self) -> RpReturnType<&HashMap<String, Value>> {
        match &self.verified_claims {
            Some(claims) => Ok(claims),
            None => Err(Box::new(RpError::new_protocol_state_error(
                "id token claims have not been verified yet",
                None,
            ))),
        }
    }

    /// Whether the ID Token of this set has been verified
    pub fn claims_verified(&self) -> bool {
        self.verified_claims.is_some()
    }

    /// Decodes the ID Token payload without any verification. Used by the
    /// validation pipeline itself and for cross-grant `sub` consistency.
    pub(crate) fn decode_claims(&self) -> RpReturnType<HashMap<String, Value>> {
        let id_token = self.id_token.as_ref().ok_or_else(|| {
            RpError::new_protocol_state_error("id_token not present in TokenSet", None)
        })?;

        let payload = id_token.split('.').nth(1).ok_or_else(|| {
            RpError::new_validation_error(
                "response",
                "id_token is invalid, payload component not found",
                None,
            )
        })?;

        let decoded = base64_url::decode(payload).map_err(|_| {
            RpError::new_validation_error(
                "response",
                "id_token payload is not base64url encoded",
                None,
            )
        })?;

        serde_json::from_slice::<HashMap<String, Value>>(&decoded).map_err(|_| {
            Box::new(RpError::new_validation_error(
                "response",
                "id_token payload is not a json object",
                None,
            ))
        })
    }

    /// Gets the access token
    pub fn get_access_token(&self) -> Option<String> {
        self.access_token.clone()
    }

    /// Gets the access token type
    pub fn get_token_type(&self) -> Option<String> {
        self.token_type.clone()
    }

    /// Gets the raw id token
    pub fn get_id_token(&self) -> Option<String> {
        self.id_token.clone()
    }

    /// Gets the refresh token
    pub fn get_refresh_token(&self) -> Option<String> {
        self.refresh_token.clone()
    }

    /// Gets the expires in (seconds)
    pub fn get_expires_in(&self) -> Option<i64> {
        self.expires_in
    }

    /// Gets the expiry timestamp (seconds since the epoch)
    pub fn get_expires_at(&self) -> Option<i64> {
        self.expires_at
    }

    /// Gets the session state
    pub fn get_session_state(&self) -> Option<String> {
        self.session_state.clone()
    }

    /// Gets the scope
    pub fn get_scope(&self) -> Option<String> {
        self.scope.clone()
    }

    /// Gets the other fields of the response
    pub fn get_other(&self) -> Option<HashMap<String, Value>> {
        self.other.clone()
    }

    fn remaining_lifetime(&self) -> Option<i64> {
        self.expires_at
            .map(|e| max((Wrapping(e) - Wrapping(now() as i64)).0, 0))
    }

    pub(crate) fn set_session_state(&mut self, session_state: Option<String>) {
        self.session_state = session_state;
    }

    pub(crate) fn set_verified_claims(&mut self, claims: HashMap<String, Value>) {
        self.verified_claims = Some(claims);
    }
}
