//! # Client Module
//! The relying party configuration and every flow it can drive.

mod auth;
mod callback;
#[allow(clippy::module_inception)]
mod client;
mod device_flow;
mod dpop;
mod id_token;
mod request_builder;

pub use auth::ClientAuthentication;
pub use client::Client;
pub use device_flow::{DeviceFlowAbortHandle, DeviceFlowHandle, PollDelay};
pub use dpop::DpopHandle;
