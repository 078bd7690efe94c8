use nom::{
    bytes::complete::{tag, take},
    character::complete::one_of,
    combinator::{map, recognize},
    error::{ErrorKind, ParseError},
    multi::count,
    Err, IResult, InputIter, ToUsize,
};

use crate::{bytes::hex_digit_value, Input, Result};

/// Like `take` but it "skips" the parsed value.
pub fn skip<'a, C, E>(count: C) -> impl Fn(Input<'a>) -> IResult<Input<'a>, Input<'a>, E>
where
    C: ToUsize,
    E: ParseError<Input<'a>>,
{
    let count = count.to_usize();

    move |input: Input| match input.slice_index(count) {
        Err(_needed) => Err(Err::Error(E::from_error_kind(input, ErrorKind::Eof))),
        Ok(index) => Ok((&input[index..], &[])),
    }
}

/// Parses exactly `digits` ASCII hex characters and folds them into a `u32`,
/// most-significant digit first.
fn hex_digits<'a, E>(digits: usize) -> impl FnMut(Input<'a>) -> Result<'a, u32, E>
where
    E: ParseError<Input<'a>>,
{
    map(
        count(one_of("0123456789abcdefABCDEF"), digits),
        move |chars: Vec<char>| {
            chars.into_iter().fold(0u32, |accum, c| {
                (accum << 4) | hex_digit_value(c as u8).unwrap_or(0) as u32
            })
        },
    )
}

/// Parses a one-byte (two hex digit) field.
pub fn hex_u8<'a, E>(input: Input<'a>) -> Result<'a, u8, E>
where
    E: ParseError<Input<'a>>,
{
    map(hex_digits(2), |value| value as u8)(input)
}

/// Parses a two-byte (four hex digit) field, most-significant byte first.
pub fn hex_u16<'a, E>(input: Input<'a>) -> Result<'a, u16, E>
where
    E: ParseError<Input<'a>>,
{
    map(hex_digits(4), |value| value as u16)(input)
}

/// Parses a four-byte (eight hex digit) field, most-significant byte first.
pub fn hex_u32<'a, E>(input: Input<'a>) -> Result<'a, u32, E>
where
    E: ParseError<Input<'a>>,
{
    hex_digits(8)(input)
}

/// The line ending a record line was terminated with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ending {
    /// `\r\n`.
    Crlf,
    /// `\n` alone.
    Lf,
    /// A bare `\r`, as produced by classic Mac OS tooling.
    Cr,
    /// End of input, with no trailing line ending at all.
    Eof,
}

/// Recognizes one of `\r\n`, `\n`, `\r`, or end of input, reporting which one
/// was found.
pub fn line_ending<'a, E>(input: Input<'a>) -> Result<'a, Ending, E>
where
    E: ParseError<Input<'a>>,
{
    if let Ok((rest, _)) = tag::<_, _, E>("\r\n")(input) {
        return Ok((rest, Ending::Crlf));
    }

    if let Ok((rest, _)) = tag::<_, _, E>("\n")(input) {
        return Ok((rest, Ending::Lf));
    }

    if let Ok((rest, _)) = tag::<_, _, E>("\r")(input) {
        return Ok((rest, Ending::Cr));
    }

    if input.is_empty() {
        return Ok((input, Ending::Eof));
    }

    Err(Err::Error(E::from_error_kind(input, ErrorKind::Eof)))
}

/// Computes the two's-complement checksum byte used by Intel HEX and MOS
/// Technology papertape records: the low byte of `256 - (sum of bytes mod
/// 256)`, or `0` when the sum is itself a multiple of 256.
pub fn checksum8(bytes: &[u8]) -> u8 {
    let sum: u32 = bytes.iter().map(|&b| b as u32).sum();
    (0x100u32.wrapping_sub(sum & 0xFF) & 0xFF) as u8
}

/// Recognizes a run of ASCII hex digits without decoding it, used to slice
/// out a variable-length data field once its byte count is already known.
pub fn hex_run<'a, E>(digits: usize) -> impl FnMut(Input<'a>) -> Result<'a, Input<'a>, E>
where
    E: ParseError<Input<'a>>,
{
    recognize(take(digits))
}

#[cfg(test)]
mod tests {
    use nom::error::Error as NomError;

    use super::*;

    #[test]
    fn test_hex_u8() {
        let (rest, value) = hex_u8::<NomError<Input>>(b"1Fxyz").unwrap();
        assert_eq!(value, 0x1F);
        assert_eq!(rest, b"xyz");
    }

    #[test]
    fn test_hex_u16() {
        let (rest, value) = hex_u16::<NomError<Input>>(b"10AFrest").unwrap();
        assert_eq!(value, 0x10AF);
        assert_eq!(rest, b"rest");
    }

    #[test]
    fn test_hex_u32() {
        let (rest, value) = hex_u32::<NomError<Input>>(b"0010FFFF!").unwrap();
        assert_eq!(value, 0x0010_FFFF);
        assert_eq!(rest, b"!");
    }

    #[test]
    fn test_line_ending_variants() {
        assert_eq!(line_ending::<NomError<Input>>(b"\r\nrest").unwrap().1, Ending::Crlf);
        assert_eq!(line_ending::<NomError<Input>>(b"\nrest").unwrap().1, Ending::Lf);
        assert_eq!(line_ending::<NomError<Input>>(b"\rrest").unwrap().1, Ending::Cr);
        assert_eq!(line_ending::<NomError<Input>>(b"").unwrap().1, Ending::Eof);
    }

    #[test]
    fn test_checksum8_intel_hex_example() {
        // `:10010000214601360121470136007EFE09D2190140`, the textbook Intel
        // HEX data record: checksum byte is `0x40`.
        let bytes = [
            0x10, 0x01, 0x00, 0x00, 0x21, 0x46, 0x01, 0x36, 0x01, 0x21, 0x47, 0x01, 0x36, 0x00,
            0x7E, 0xFE, 0x09, 0xD2, 0x19, 0x01,
        ];
        assert_eq!(checksum8(&bytes), 0x40);
    }
}
