use crate::error::StorageError;

use rand::RngCore;
use rand::rngs::OsRng;

/// Alphabet of generated names. Safe on every filesystem we write to.
pub const NAME_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Largest byte value that maps onto the alphabet without bias.
/// 256 % 62 == 8, so bytes 248..=255 would favour the first 8 symbols and are redrawn.
const MAX_UNBIASED_BYTE: u8 = (255 - (256 % NAME_ALPHABET.len())) as u8;

/// Returns `length` symbols drawn uniformly from [`NAME_ALPHABET`] using the OS CSPRNG.
///
/// A failing random source is an error: callers must not fall back to a weaker name.
pub fn generate(length: usize) -> Result<String, StorageError> {
    generate_with(&mut OsRng, length)
}

pub(crate) fn generate_with<R: RngCore>(
    rng: &mut R,
    length: usize,
) -> Result<String, StorageError> {
    if length == 0 {
        return Ok(String::new());
    }

    let mut name = String::with_capacity(length);
    // Over-draw by a quarter so one fill usually covers the rejected bytes.
    let mut buf = vec![0u8; length + length / 4];

    loop {
        rng.try_fill_bytes(&mut buf)?;
        for &byte in &buf {
            if byte > MAX_UNBIASED_BYTE {
                continue;
            }
            name.push(NAME_ALPHABET[byte as usize % NAME_ALPHABET.len()] as char);
            if name.len() == length {
                return Ok(name);
            }
        }
    }
}
