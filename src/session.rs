// A resumable decryption of one ciphertext under one hypothesis.
//
// The attack is written as a state machine rather than as a loop calling the
// oracle, so that the same logic can be driven by a blocking closure, an async
// service or a thread pool. `Session::start` hands out a `Pending` query and
// every verdict submitted for it yields either the next `Pending` query or the
// finished plaintext.
use log::info;

use crate::block::{BlockDecoder, BlockStep};
use crate::candidates::Candidate;
use crate::DecodeError;

/// How to read the final padding byte of the ciphertext.
///
/// If the plaintext ends in '\x01', the only query of the last byte that gives
/// padding of length one is the unmodified ciphertext. Any other ending means
/// the unmodified byte must be skipped, otherwise we'd mistake the real
/// padding for '\x01'. We can't tell which case we're in up front, so we try
/// both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Hypothesis {
    GeneralPadding,
    UnchangedLastByte,
}

impl Hypothesis {
    pub const ORDER: [Hypothesis; 2] = [Hypothesis::GeneralPadding, Hypothesis::UnchangedLastByte];
}

#[derive(Debug)]
pub struct Session {
    ciphertext: Vec<u8>,
    plaintext: Vec<u8>,
    block_size: usize,
    block_pos: usize,
    hypothesis: Hypothesis,
    decoder: BlockDecoder,
}

/// A session waiting on the verdict for exactly one query.
#[derive(Debug)]
pub struct Pending(Session);

#[derive(Debug)]
pub enum Next {
    Query(Pending),
    Done(Vec<u8>),
}

impl Session {
    /// Begin decrypting `ciphertext`, failing before any query is produced if
    /// it can't be split into at least two blocks of `block_size`.
    pub fn start(
        ciphertext: &[u8],
        block_size: usize,
        hypothesis: Hypothesis,
    ) -> Result<Pending, DecodeError> {
        if block_size == 0 || block_size > u8::MAX as usize {
            return Err(DecodeError::InvalidBlockSize(block_size));
        }
        if ciphertext.len() % block_size != 0 || ciphertext.len() < 2 * block_size {
            return Err(DecodeError::InvalidCiphertextLength {
                length: ciphertext.len(),
                block_size,
            });
        }
        info!(
            "decrypting {} blocks under {hypothesis:?}",
            ciphertext.len() / block_size - 1
        );

        let mut ciphertext = ciphertext.to_vec();
        let decoder = BlockDecoder::begin(&mut ciphertext, block_size, block_size, hypothesis);
        Ok(Pending(Self {
            plaintext: vec![0; ciphertext.len() - block_size],
            ciphertext,
            block_size,
            block_pos: block_size,
            hypothesis,
            decoder,
        }))
    }

    fn advance(mut self, step: BlockStep) -> Next {
        let recovered = match step {
            BlockStep::Querying => return Next::Query(Pending(self)),
            BlockStep::Recovered(recovered) => recovered,
        };

        let offset = self.ciphertext.len() - self.block_pos - self.block_size;
        self.plaintext[offset..offset + self.block_size].copy_from_slice(&recovered);

        self.block_pos += self.block_size;
        if self.block_pos == self.ciphertext.len() {
            return Next::Done(self.plaintext);
        }
        self.decoder = BlockDecoder::begin(
            &mut self.ciphertext,
            self.block_pos,
            self.block_size,
            self.hypothesis,
        );
        Next::Query(Pending(self))
    }
}

impl Pending {
    pub fn query(&self) -> &[u8] {
        self.0.decoder.query(&self.0.ciphertext)
    }

    pub fn hypothesis(&self) -> Hypothesis {
        self.0.hypothesis
    }

    /// Feed back whether the oracle accepted the padding of [`Pending::query`].
    pub fn submit(self, verdict: bool) -> Result<Next, DecodeError> {
        let mut session = self.0;
        let step = session.decoder.submit(&mut session.ciphertext, verdict)?;
        Ok(session.advance(step))
    }

    pub fn batch(&self) -> Vec<Candidate> {
        self.0.decoder.batch(&self.0.ciphertext)
    }

    /// Resolve the current padding length with the lowest accepted candidate
    /// from [`Pending::batch`].
    pub fn settle(self, accepted: Option<u8>) -> Result<Next, DecodeError> {
        let mut session = self.0;
        let step = session.decoder.settle(&mut session.ciphertext, accepted)?;
        Ok(session.advance(step))
    }
}
