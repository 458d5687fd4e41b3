//! Padding oracle attack on CBC with PKCS#7 padding.
mod block;
mod candidates;
mod decrypt;
mod error;
mod http;
mod oracle;
mod pad;
mod session;
#[cfg(test)]
mod testing;

pub use candidates::Candidate;
pub use decrypt::{decrypt, decrypt_async, decrypt_async_batched, decrypt_par};
pub use error::{DecodeError, Error};
pub use http::{HttpOracle, HttpOracleError};
pub use oracle::{AsyncOracle, Fallible, Oracle};
pub use pad::{decode_plain_byte, extend_fake_pad, verify_pkcs7};
pub use session::{Hypothesis, Next, Pending, Session};
