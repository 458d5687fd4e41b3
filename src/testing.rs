// Fixtures for exercising the attack against a real AES-128-CBC oracle, and
// against a toy cipher for block sizes AES doesn't have.
use std::{collections::HashMap, sync::Arc};

use aes::cipher::{BlockDecrypt, BlockEncrypt, KeyInit};
use aes::{Aes128, Block};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Router,
};
use rand::{rngs::StdRng, seq::SliceRandom, RngCore, SeedableRng};
use tokio::net::TcpListener;

const BLOCK_SIZE: usize = 16;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn pkcs7_pad(bytes: &[u8], block_size: u8) -> Vec<u8> {
    let n_pad = block_size - (bytes.len() % block_size as usize) as u8;
    let mut out = Vec::with_capacity(bytes.len() + n_pad as usize);
    out.extend_from_slice(bytes);
    (0..n_pad).for_each(|_| out.push(n_pad));
    out
}

fn is_pkcs7_padded(bytes: &[u8]) -> bool {
    match bytes.last() {
        Some(&n_pad) if n_pad != 0 && n_pad as usize <= bytes.len() => bytes
            [bytes.len() - n_pad as usize..]
            .iter()
            .all(|&byte| byte == n_pad),
        _ => false,
    }
}

/// Holds a random key and IV, and answers whether ciphertexts decrypt to
/// validly padded plaintext.
#[derive(Debug, Clone)]
pub struct CbcOracle {
    key: [u8; BLOCK_SIZE],
    iv: [u8; BLOCK_SIZE],
}

impl CbcOracle {
    pub fn new(seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut key = [0u8; BLOCK_SIZE];
        let mut iv = [0u8; BLOCK_SIZE];
        rng.fill_bytes(&mut key);
        rng.fill_bytes(&mut iv);
        Self { key, iv }
    }

    // Returns the IV followed by the ciphertext.
    pub fn encrypt(&self, plaintext: &[u8]) -> Vec<u8> {
        assert_eq!(plaintext.len() % BLOCK_SIZE, 0);
        let cipher = Aes128::new(&self.key.into());

        let mut ciphertext = self.iv.to_vec();
        let mut last_block = self.iv;
        for plaintext_block in plaintext.chunks(BLOCK_SIZE) {
            let mut block = Block::default();
            for (i, byte) in block.iter_mut().enumerate() {
                *byte = plaintext_block[i] ^ last_block[i];
            }
            cipher.encrypt_block(&mut block);
            ciphertext.extend_from_slice(&block);
            last_block.copy_from_slice(&block);
        }
        ciphertext
    }

    pub fn padding_valid(&self, ciphertext: &[u8]) -> bool {
        if ciphertext.len() % BLOCK_SIZE != 0 || ciphertext.len() < 2 * BLOCK_SIZE {
            return false;
        }
        let cipher = Aes128::new(&self.key.into());
        let (previous, last) = ciphertext[ciphertext.len() - 2 * BLOCK_SIZE..].split_at(BLOCK_SIZE);

        let mut block = Block::clone_from_slice(last);
        cipher.decrypt_block(&mut block);
        let plaintext: Vec<u8> = block.iter().zip(previous).map(|(a, b)| a ^ b).collect();
        is_pkcs7_padded(&plaintext)
    }
}

/// CBC over a toy block cipher that works for any block size: each byte is
/// XORed with a key byte and sent through a random substitution table.
#[derive(Debug, Clone)]
pub struct ToyCbcOracle {
    block_size: usize,
    sbox: Vec<u8>,
    inverse: Vec<u8>,
    key: Vec<u8>,
    iv: Vec<u8>,
}

impl ToyCbcOracle {
    pub fn new(block_size: usize, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut sbox: Vec<u8> = (0..=255).collect();
        sbox.shuffle(&mut rng);
        let mut inverse = vec![0u8; 256];
        for (i, &byte) in sbox.iter().enumerate() {
            inverse[byte as usize] = i as u8;
        }
        let mut key = vec![0u8; block_size];
        let mut iv = vec![0u8; block_size];
        rng.fill_bytes(&mut key);
        rng.fill_bytes(&mut iv);
        Self {
            block_size,
            sbox,
            inverse,
            key,
            iv,
        }
    }

    pub fn encrypt(&self, plaintext: &[u8]) -> Vec<u8> {
        assert_eq!(plaintext.len() % self.block_size, 0);
        let mut ciphertext = self.iv.clone();
        for (i, plaintext_block) in plaintext.chunks(self.block_size).enumerate() {
            let previous = ciphertext[i * self.block_size..(i + 1) * self.block_size].to_vec();
            for ((&p, c), &k) in plaintext_block.iter().zip(previous).zip(&self.key) {
                ciphertext.push(self.sbox[(p ^ c ^ k) as usize]);
            }
        }
        ciphertext
    }

    pub fn padding_valid(&self, ciphertext: &[u8]) -> bool {
        let block_size = self.block_size;
        if ciphertext.len() % block_size != 0 || ciphertext.len() < 2 * block_size {
            return false;
        }
        let (previous, last) = ciphertext[ciphertext.len() - 2 * block_size..].split_at(block_size);
        let plaintext: Vec<u8> = last
            .iter()
            .zip(previous)
            .zip(&self.key)
            .map(|((&c, &p), &k)| self.inverse[c as usize] ^ k ^ p)
            .collect();
        is_pkcs7_padded(&plaintext)
    }
}

/// Serve `oracle` over HTTP, returning the base address of the server.
///
/// `GET /check?ciphertext=<hex>` answers `200` for valid padding and `500`
/// for invalid padding.
pub async fn spawn_oracle_server(oracle: CbcOracle) -> String {
    spawn_oracle_server_with_rejection(oracle, StatusCode::INTERNAL_SERVER_ERROR).await
}

pub async fn spawn_oracle_server_with_rejection(
    oracle: CbcOracle,
    rejection: StatusCode,
) -> String {
    let app = Router::new()
        .route("/check", get(check_padding))
        .with_state(Arc::new(ServerState { oracle, rejection }));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

struct ServerState {
    oracle: CbcOracle,
    rejection: StatusCode,
}

async fn check_padding(
    State(state): State<Arc<ServerState>>,
    Query(params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    let ciphertext = match params.get("ciphertext").map(hex::decode) {
        Some(Ok(c)) => c,
        Some(Err(e)) => {
            return (StatusCode::BAD_REQUEST, format!("Illegal ciphertext: {}", e)).into_response()
        }
        None => {
            return (StatusCode::BAD_REQUEST, "Missing 'ciphertext' parameter").into_response()
        }
    };

    if state.oracle.padding_valid(&ciphertext) {
        (StatusCode::OK, "Padding is valid").into_response()
    } else {
        (state.rejection, "Invalid padding").into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rstest::rstest;

    #[rstest]
    #[case("YELL", 4, "YELL\x04\x04\x04\x04")]
    #[case("YELLOWS!!!", 6, "YELLOWS!!!\x02\x02")]
    #[case("YELLOW SUBMARINE", 16, "YELLOW SUBMARINE\x10\x10\x10\x10\x10\x10\x10\x10\x10\x10\x10\x10\x10\x10\x10\x10")]
    fn pkcs7_pad_pads_message(#[case] msg: &str, #[case] block_size: u8, #[case] expected: &str) {
        let padded = pkcs7_pad(msg.as_bytes(), block_size);

        assert_eq!(padded, expected.as_bytes());
    }

    #[test]
    fn cbc_oracle_accepts_own_ciphertext() {
        let oracle = CbcOracle::new(1);
        let ciphertext = oracle.encrypt(&pkcs7_pad(b"YELLOW SUBMARINE", 16));

        assert_eq!(ciphertext.len(), 48);
        assert!(oracle.padding_valid(&ciphertext));
        assert!(!oracle.padding_valid(&ciphertext[..16]));
    }

    #[rstest]
    #[case(1)]
    #[case(3)]
    #[case(32)]
    fn toy_cbc_oracle_accepts_own_ciphertext(#[case] block_size: usize) {
        let oracle = ToyCbcOracle::new(block_size, 2);
        let ciphertext = oracle.encrypt(&pkcs7_pad(b"YELLOW SUBMARINE", block_size as u8));

        assert!(oracle.padding_valid(&ciphertext));
        let mut tampered = ciphertext.clone();
        let last = tampered.len() - block_size - 1;
        tampered[last] ^= 0x80;
        assert!(!oracle.padding_valid(&tampered));
    }
}
