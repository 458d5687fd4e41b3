// Drivers that couple a `Session` to an oracle.
//
// Each driver tries the hypotheses in `Hypothesis::ORDER`, starting a fresh
// session from the caller's ciphertext every time. Only `NoValidPadding` moves
// us on to the next hypothesis. A final block that fails its own padding
// check means the oracle contradicted itself, and no reading of the last byte
// will fix that.
use std::future::Future;

use futures::future::join_all;
use log::warn;
use rayon::prelude::*;

use crate::{AsyncOracle, Error, Hypothesis, Next, Oracle, Session};

/// Decrypt `ciphertext` through a padding oracle attack against CBC with
/// PKCS#7 padding.
///
/// The first block acts as the IV of the rest and can't be recovered, so the
/// returned plaintext is `block_size` bytes shorter than `ciphertext`. The
/// padding is left in place.
///
/// Fails with [`DecodeError::NoValidPadding`](crate::DecodeError) when both
/// readings of the last byte found nothing, and with [`Error::Oracle`] as soon
/// as the oracle itself fails.
pub fn decrypt<O>(
    ciphertext: &[u8],
    block_size: usize,
    mut oracle: O,
) -> Result<Vec<u8>, Error<O::Error>>
where
    O: Oracle,
{
    with_retry(|hypothesis| attempt(ciphertext, block_size, hypothesis, &mut oracle))
}

fn with_retry<E>(
    mut attempt: impl FnMut(Hypothesis) -> Result<Vec<u8>, Error<E>>,
) -> Result<Vec<u8>, Error<E>> {
    let mut result = attempt(Hypothesis::ORDER[0]);
    for &hypothesis in &Hypothesis::ORDER[1..] {
        if !should_retry(&result, hypothesis) {
            break;
        }
        result = attempt(hypothesis);
    }
    result
}

async fn with_retry_async<E, Fut>(
    mut attempt: impl FnMut(Hypothesis) -> Fut,
) -> Result<Vec<u8>, Error<E>>
where
    Fut: Future<Output = Result<Vec<u8>, Error<E>>>,
{
    let mut result = attempt(Hypothesis::ORDER[0]).await;
    for &hypothesis in &Hypothesis::ORDER[1..] {
        if !should_retry(&result, hypothesis) {
            break;
        }
        result = attempt(hypothesis).await;
    }
    result
}

fn should_retry<E>(result: &Result<Vec<u8>, Error<E>>, next: Hypothesis) -> bool {
    let ambiguous = matches!(result, Err(e) if e.is_ambiguous());
    if ambiguous {
        warn!("no valid padding found, retrying under {next:?}");
    }
    ambiguous
}

fn attempt<O>(
    ciphertext: &[u8],
    block_size: usize,
    hypothesis: Hypothesis,
    oracle: &mut O,
) -> Result<Vec<u8>, Error<O::Error>>
where
    O: Oracle,
{
    let mut pending = Session::start(ciphertext, block_size, hypothesis)?;
    loop {
        let verdict = oracle.check(pending.query()).map_err(Error::Oracle)?;
        match pending.submit(verdict)? {
            Next::Query(next) => pending = next,
            Next::Done(plaintext) => return Ok(plaintext),
        }
    }
}

/// Like [`decrypt`], but checks every candidate for a padding length in
/// parallel on the rayon thread pool.
///
/// The lowest candidate byte the oracle accepts wins, so the result matches
/// the one-at-a-time search for a deterministic oracle. This trades more
/// oracle calls for less waiting on a slow oracle.
pub fn decrypt_par<F>(
    ciphertext: &[u8],
    block_size: usize,
    oracle: &F,
) -> Result<Vec<u8>, Error<std::convert::Infallible>>
where
    F: Fn(&[u8]) -> bool + Sync,
{
    with_retry(|hypothesis| attempt_par(ciphertext, block_size, hypothesis, oracle))
}

fn attempt_par<F>(
    ciphertext: &[u8],
    block_size: usize,
    hypothesis: Hypothesis,
    oracle: &F,
) -> Result<Vec<u8>, Error<std::convert::Infallible>>
where
    F: Fn(&[u8]) -> bool + Sync,
{
    let mut pending = Session::start(ciphertext, block_size, hypothesis)?;
    loop {
        let accepted = pending
            .batch()
            .into_par_iter()
            .find_first(|candidate| oracle(&candidate.ciphertext))
            .map(|candidate| candidate.byte);
        match pending.settle(accepted)? {
            Next::Query(next) => pending = next,
            Next::Done(plaintext) => return Ok(plaintext),
        }
    }
}

/// Async version of [`decrypt`].
pub async fn decrypt_async<O>(
    ciphertext: &[u8],
    block_size: usize,
    oracle: &O,
) -> Result<Vec<u8>, Error<O::Error>>
where
    O: AsyncOracle,
{
    with_retry_async(|hypothesis| {
        attempt_async(ciphertext, block_size, hypothesis, oracle)
    })
    .await
}

async fn attempt_async<O>(
    ciphertext: &[u8],
    block_size: usize,
    hypothesis: Hypothesis,
    oracle: &O,
) -> Result<Vec<u8>, Error<O::Error>>
where
    O: AsyncOracle,
{
    let mut pending = Session::start(ciphertext, block_size, hypothesis)?;
    loop {
        let verdict = oracle.check(pending.query()).await.map_err(Error::Oracle)?;
        match pending.submit(verdict)? {
            Next::Query(next) => pending = next,
            Next::Done(plaintext) => return Ok(plaintext),
        }
    }
}

/// Async version of [`decrypt_par`]: all candidates for a padding length are
/// sent to the oracle concurrently.
pub async fn decrypt_async_batched<O>(
    ciphertext: &[u8],
    block_size: usize,
    oracle: &O,
) -> Result<Vec<u8>, Error<O::Error>>
where
    O: AsyncOracle,
{
    with_retry_async(|hypothesis| {
        attempt_async_batched(ciphertext, block_size, hypothesis, oracle)
    })
    .await
}

async fn attempt_async_batched<O>(
    ciphertext: &[u8],
    block_size: usize,
    hypothesis: Hypothesis,
    oracle: &O,
) -> Result<Vec<u8>, Error<O::Error>>
where
    O: AsyncOracle,
{
    let mut pending = Session::start(ciphertext, block_size, hypothesis)?;
    loop {
        let candidates = pending.batch();
        let verdicts = join_all(
            candidates
                .iter()
                .map(|candidate| oracle.check(&candidate.ciphertext)),
        )
        .await;

        // The first error or acceptance in ascending byte order decides.
        let mut accepted = None;
        for (candidate, verdict) in candidates.iter().zip(verdicts) {
            if verdict.map_err(Error::Oracle)? {
                accepted = Some(candidate.byte);
                break;
            }
        }
        match pending.settle(accepted)? {
            Next::Query(next) => pending = next,
            Next::Done(plaintext) => return Ok(plaintext),
        }
    }
}
