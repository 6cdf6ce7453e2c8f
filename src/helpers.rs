//! # Helpers
//! Helper functions used in the crate. The ones in `public` are exported for
//! callers generating request material (state, nonce, PKCE verifiers).

mod private;
mod public;

pub(crate) use private::*;
pub use public::*;
