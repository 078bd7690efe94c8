//! Small parsing/serialization helpers shared by every format module:
//! fixed-width hex field extraction, whitespace trimming for the
//! `before`/`after` junk capture every record preserves, and line splitting.

use hexrec_errors::Error;
use hexrec_parser::{hex_digit_value, split_lines, Ending};

/// Reads exactly `digits` ASCII hex characters starting at `*pos` in `line`,
/// advancing `*pos` past them.
pub(crate) fn take_hex_field(line: &[u8], pos: &mut usize, digits: usize) -> Result<u64, Error> {
    if line.len() < *pos + digits {
        return Err(Error::Syntax(0));
    }

    let mut value = 0u64;

    for &byte in &line[*pos..*pos + digits] {
        let digit = hex_digit_value(byte).ok_or(Error::InvalidHexDigit(0))?;
        value = (value << 4) | digit as u64;
    }

    *pos += digits;
    Ok(value)
}

/// Reads exactly `pairs` bytes (`2 * pairs` hex characters) starting at
/// `*pos` in `line`, advancing `*pos` past them.
pub(crate) fn take_hex_bytes(line: &[u8], pos: &mut usize, pairs: usize) -> Result<Vec<u8>, Error> {
    if line.len() < *pos + pairs * 2 {
        return Err(Error::Syntax(0));
    }

    let mut out = Vec::with_capacity(pairs);

    for _ in 0..pairs {
        out.push(take_hex_field(line, pos, 2)? as u8);
    }

    Ok(out)
}

/// Splits `line` into `(before, core, after)` by trimming ASCII whitespace
/// from both ends; fails if the trimmed core is empty.
pub(crate) fn trim_junk(line: &[u8]) -> Result<(&[u8], &[u8], &[u8]), Error> {
    let start = line.iter().position(|byte| !byte.is_ascii_whitespace()).ok_or(Error::Syntax(0))?;
    let end = line.iter().rposition(|byte| !byte.is_ascii_whitespace()).map(|p| p + 1).unwrap_or(line.len());

    Ok((&line[..start], &line[start..end], &line[end..]))
}

/// `true` if every byte in `bytes` is ASCII whitespace.
pub(crate) fn is_whitespace(bytes: &[u8]) -> bool {
    bytes.iter().all(|byte| byte.is_ascii_whitespace())
}

/// Bytes for a given line ending, used when re-assembling serialized lines.
pub(crate) fn ending_bytes(ending: Ending) -> &'static [u8] {
    match ending {
        Ending::Crlf => b"\r\n",
        Ending::Lf => b"\n",
        Ending::Cr => b"\r",
        Ending::Eof => b"",
    }
}

/// Splits `bytes` into physical lines, pairing each with the line ending it
/// was terminated by.
pub(crate) fn lines(bytes: &[u8]) -> Vec<(&[u8], Ending)> {
    split_lines(bytes)
}
