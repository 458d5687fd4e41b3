// The caller's side of the attack: something that knows the key and will tell
// us whether a ciphertext decrypts to validly padded plaintext.
use std::convert::Infallible;
use std::future::Future;

/// A blocking padding oracle.
///
/// Implemented for any `FnMut(&[u8]) -> bool`. Oracles that can fail, e.g.
/// because they talk to a remote service, can be wrapped in [`Fallible`].
pub trait Oracle {
    type Error;

    fn check(&mut self, ciphertext: &[u8]) -> Result<bool, Self::Error>;
}

impl<F> Oracle for F
where
    F: FnMut(&[u8]) -> bool,
{
    type Error = Infallible;

    fn check(&mut self, ciphertext: &[u8]) -> Result<bool, Infallible> {
        Ok(self(ciphertext))
    }
}

/// Adapts a closure returning `Result<bool, E>` into an [`Oracle`].
#[derive(Debug, Clone, Copy)]
pub struct Fallible<F>(pub F);

impl<F, E> Oracle for Fallible<F>
where
    F: FnMut(&[u8]) -> Result<bool, E>,
{
    type Error = E;

    fn check(&mut self, ciphertext: &[u8]) -> Result<bool, E> {
        (self.0)(ciphertext)
    }
}

/// A padding oracle that is queried asynchronously.
///
/// Takes `&self` so several queries can be in flight at once when checking a
/// whole padding length concurrently.
pub trait AsyncOracle {
    type Error;

    fn check(&self, ciphertext: &[u8]) -> impl Future<Output = Result<bool, Self::Error>> + Send;
}
