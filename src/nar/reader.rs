//! Read primitives for the NAR wire format.
//!
//! Everything here operates on the framed-string layer: 64-bit
//! little-endian lengths, byte strings padded with zeroes to 8-byte
//! alignment. Syntax violations are reported as [InvalidData] errors
//! carrying a message; the extraction layer maps those to the crate's
//! format error.

use std::io::{self, ErrorKind::InvalidData, Read};

use bstr::ByteSlice;

use crate::nar::wire;

/// Consume a little-endian u64 from the reader.
pub(crate) fn read_u64(reader: &mut impl Read) -> io::Result<u64> {
    let mut buf = [0; 8];
    reader.read_exact(&mut buf)?;
    Ok(u64::from_le_bytes(buf))
}

/// Consume a framed byte string of up to `max_len` bytes, verifying that
/// the padding to the next 8-byte boundary is all zeroes.
pub(crate) fn read_bytes(reader: &mut impl Read, max_len: usize) -> io::Result<Vec<u8>> {
    assert!(max_len <= isize::MAX as usize);

    // read the length, and reject excessively large values
    let len = read_u64(reader)?;
    if len > max_len as u64 {
        return Err(io::Error::new(
            InvalidData,
            format!("string of length {len} exceeds maximum {max_len}"),
        ));
    }
    // we know the length fits in a usize now
    let len = len as usize;

    // string and padding in one read
    let mut buf = vec![0; len + wire::pad_len(len as u64)];
    reader.read_exact(&mut buf)?;

    if buf[len..].iter().any(|&b| b != 0) {
        return Err(io::Error::new(InvalidData, "nonzero padding"));
    }
    buf.truncate(len);

    Ok(buf)
}

/// Consume a framed byte string and require it to be exactly `expected`.
pub(crate) fn expect_bytes(reader: &mut impl Read, expected: &[u8]) -> io::Result<()> {
    let actual = read_bytes(reader, expected.len().max(32))?;
    if actual != expected {
        return Err(io::Error::new(
            InvalidData,
            format!(
                "expected {:?}, got {:?}",
                expected.as_bstr(),
                actual.as_bstr()
            ),
        ));
    }
    Ok(())
}
