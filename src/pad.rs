// Byte algebra behind the attack.
//
// If the oracle accepts a query whose last `length + 1` plaintext bytes were
// forced to the pad value `length + 1` by tweaking byte `j` of the preceding
// block to `c'`, then
//
//                 P[j] = c' ⊕ (length + 1) ⊕ C[j],
//
// where C[j] is the untouched ciphertext byte.

/// Move the fake padding held in the trailing `length` bytes of `window` from
/// value `length` to value `length + 1`.
///
/// The byte in front of the padding (the new boundary) is left for the caller
/// to brute force.
///
/// # Panics
///
/// Panics if `length` is greater than `window.len()`.
pub fn extend_fake_pad(window: &mut [u8], length: usize) {
    let toggle = (length ^ (length + 1)) as u8;
    let start = window.len() - length;
    window[start..].iter_mut().for_each(|byte| *byte ^= toggle);
}

/// Check the trailing bytes of `block` form PKCS#7 padding for `block_size`.
pub fn verify_pkcs7(block: &[u8], block_size: usize) -> bool {
    match block.last() {
        Some(&n_pad) if n_pad > 0 && n_pad as usize <= block_size => block
            .iter()
            .rev()
            .take(n_pad as usize)
            .all(|&byte| byte == n_pad),
        _ => false,
    }
}

pub fn decode_plain_byte(candidate: u8, length: usize, original: u8) -> u8 {
    candidate ^ (length + 1) as u8 ^ original
}
