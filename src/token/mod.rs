//! Stateless interpretation of bearer tokens.
//!
//! Only the payload segment of a `header.payload.signature` token is decoded;
//! signatures are the server's business.

pub mod claims;
pub mod inspector;

pub use claims::TokenClaims;
pub use inspector::{
    decode_claims, get_time_until_expiration, get_token_expiration, is_token_expired,
    DEFAULT_BUFFER_MINUTES,
};
