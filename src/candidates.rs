// Generation of the query mutations for a single padding length.
use crate::pad::extend_fake_pad;

/// Byte values to try at the boundary of the fake padding, in ascending order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateBytes {
    All,
    Only(u8),
    Except(u8),
}

impl CandidateBytes {
    pub fn first(self) -> u8 {
        match self {
            Self::All => 0,
            Self::Only(byte) => byte,
            Self::Except(0) => 1,
            Self::Except(_) => 0,
        }
    }

    pub fn after(self, byte: u8) -> Option<u8> {
        match self {
            Self::All => byte.checked_add(1),
            Self::Only(_) => None,
            Self::Except(excluded) => match byte.checked_add(1)? {
                next if next == excluded => next.checked_add(1),
                next => Some(next),
            },
        }
    }

    pub fn iter(self) -> impl Iterator<Item = u8> {
        std::iter::successors(Some(self.first()), move |&byte| self.after(byte))
    }
}

/// A standalone query for one candidate byte, used when a whole padding length
/// is checked at once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub byte: u8,
    pub ciphertext: Vec<u8>,
}

// Writes each candidate straight into the working window, so there is only
// ever one live candidate per session.
#[derive(Debug, Clone)]
pub struct CandidateCursor {
    boundary: usize,
    bytes: CandidateBytes,
    current: u8,
}

impl CandidateCursor {
    pub fn prepare(window: &mut [u8], length: usize, bytes: CandidateBytes) -> Self {
        extend_fake_pad(window, length);
        let boundary = window.len() - length - 1;
        let current = bytes.first();
        window[boundary] = current;
        Self {
            boundary,
            bytes,
            current,
        }
    }

    pub fn advance(&mut self, window: &mut [u8]) -> Option<u8> {
        let next = self.bytes.after(self.current)?;
        self.current = next;
        window[self.boundary] = next;
        Some(next)
    }

    pub fn current(&self) -> u8 {
        self.current
    }

    pub fn boundary(&self) -> usize {
        self.boundary
    }

    // Includes the current candidate.
    pub fn remaining(&self) -> impl Iterator<Item = u8> {
        let bytes = self.bytes;
        std::iter::successors(Some(self.current), move |&byte| bytes.after(byte))
    }
}
