//! The "base32" encoding Nix renders digests with.
//!
//! It shares nothing but the digit count with RFC4648: the alphabet is
//! custom (the letters `e`, `o`, `u` and `t` are left out), there is never
//! any `=` padding, and digits come out least-significant first, so the
//! rightmost character of the output covers the lowest five bits of the
//! input. None of `data_encoding`'s knobs can express that combination,
//! hence this hand-rolled codec.

use thiserror::Error;

const ALPHABET: &[u8; 32] = b"0123456789abcdfghijklmnpqrsvwxyz";

/// Errors that can occur while decoding nixbase32-encoded data.
#[derive(Debug, Eq, PartialEq, Error)]
pub enum DecodeError {
    #[error("invalid character {0:#04x}")]
    InvalidCharacter(u8),
    #[error("encoded data has leftover bits")]
    TrailingBits,
}

/// Returns encoded input
pub fn encode(input: &[u8]) -> String {
    let mut output = vec![0u8; encode_len(input.len())];

    // Digit n covers bits [5n, 5n+5) of the input, counted from the least
    // significant end; the first character of the output is the most
    // significant digit.
    for (n, c) in output.iter_mut().rev().enumerate() {
        let b = n * 5; // bit offset within the entire input
        let i = b / 8; // input byte index
        let j = b % 8; // bit offset within that input byte

        let mut bits = input[i] >> j;
        if i + 1 < input.len() {
            // pull in the spillover from the following byte; shifting in
            // u16 keeps the shift amount of 8 (when j is 0) legal
            bits |= ((input[i + 1] as u16) << (8 - j as u16)) as u8;
        }

        *c = ALPHABET[(bits & 0x1f) as usize];
    }

    String::from_utf8(output).expect("alphabet is ASCII")
}

/// The value of one encoded character, i.e. its alphabet position.
fn decode_char(c: u8) -> Option<u8> {
    ALPHABET.iter().position(|&a| a == c).map(|i| i as u8)
}

/// Returns decoded input
pub fn decode(input: &[u8]) -> Result<Vec<u8>, DecodeError> {
    let mut output = vec![0u8; decode_len(input.len())];

    // The mirror image of `encode`: the rightmost character carries the
    // lowest five bits, so walk the characters from the right and place
    // each digit's bits at offset 5n.
    for (n, c) in input.iter().rev().enumerate() {
        let digit = decode_char(*c).ok_or(DecodeError::InvalidCharacter(*c))?;
        let b = n * 5;
        let i = b / 8;
        let j = b % 8;

        let bits = (digit as u16) << j;
        output[i] |= (bits & 0xff) as u8;

        let spill = (bits >> 8) as u8;
        if spill != 0 {
            // bits spilling past the last byte mean the string encodes
            // more than the byte count can hold
            match output.get_mut(i + 1) {
                Some(next) => *next |= spill,
                None => return Err(DecodeError::TrailingBits),
            }
        }
    }

    Ok(output)
}

/// Returns the decoded length of an input of length len.
pub fn decode_len(len: usize) -> usize {
    (len * 5) / 8
}

/// Returns the encoded length of an input of length len.
pub fn encode_len(len: usize) -> usize {
    if len == 0 {
        return 0;
    }
    (len * 8 - 1) / 5 + 1
}
