//! Crate test suite

pub mod helpers;

mod client_auth_tests;
mod id_token_tests;
mod request_builder_tests;
mod tokenset_tests;
