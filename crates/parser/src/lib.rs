//! Shared parsing primitives for hex-record text formats: byte utilities
//! (hex encoding, chunking, integer literals) and `nom` combinators for the
//! ASCII grammars the codecs in `hexrec-core` build on.

pub mod bytes;
mod combinators;
mod lines;

pub use bytes::{chop, hex_digit_value, hexlify, parse_int, unhexlify};
pub use combinators::{checksum8, hex_u16, hex_u32, hex_u8, line_ending, skip, Ending};
pub use lines::split_lines;

/// Input type every combinator in this crate consumes: a line of an ASCII
/// hex-record file, already split off its line ending.
pub type Input<'a> = &'a [u8];

/// Result type returned by every combinator in this crate.
pub type Result<'a, O, E> = nom::IResult<Input<'a>, O, E>;
