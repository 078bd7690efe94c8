//! Shared record-level types: the token decomposition used for colorized
//! printing, and the builder every format uses to produce both a record's
//! serialized bytes and its token ranges in one pass.

use std::ops::Range;

use hexrec_errors::Error;
use hexrec_parser::Ending;

/// Named byte-range spans of one record's serialized form, so a caller can
/// render each field separately (e.g. colorizing the address differently
/// from the checksum) without re-parsing the line.
///
/// Ranges index into the buffer returned alongside this value (typically
/// the output of [`Record::to_bytestr`][crate::record::Record::to_bytestr]).
/// A range may be empty when the corresponding field doesn't apply to a
/// particular record (e.g. `checksum` on an AVR record, which has none).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tokens {
    /// Junk or whitespace preserved before the record's canonical form.
    pub before: Range<usize>,
    /// The record's start-of-line marker (`:`, `S`, `%`, `;`, `@`, or empty).
    pub begin: Range<usize>,
    /// The byte/character count field, when the format has one.
    pub count: Range<usize>,
    /// The tag field, when the format has one distinct from `begin`.
    pub tag: Range<usize>,
    /// The address field.
    pub address: Range<usize>,
    /// The data payload field.
    pub data: Range<usize>,
    /// The checksum field, when the format has one.
    pub checksum: Range<usize>,
    /// Junk or whitespace preserved after the record's canonical form.
    pub after: Range<usize>,
    /// The line ending.
    pub end: Range<usize>,
    /// Format-specific extra fields not covered by the common set above
    /// (e.g. Tektronix's address-length digit, Motorola's record count).
    pub extra: Vec<(&'static str, Range<usize>)>,
}

impl Tokens {
    /// Slices `buffer` with one of this value's ranges.
    pub fn slice<'a>(&self, buffer: &'a [u8], range: &Range<usize>) -> &'a [u8] {
        &buffer[range.clone()]
    }
}

/// Accumulates a record's serialized bytes while recording the byte range
/// each pushed fragment occupied, so [`Tokens`] and the final byte string
/// are produced together from a single sequence of field writes.
#[derive(Debug, Default)]
pub struct TokenBuilder {
    buffer: Vec<u8>,
}

impl TokenBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `bytes` to the buffer and returns the range it occupies.
    pub fn push(&mut self, bytes: &[u8]) -> Range<usize> {
        let start = self.buffer.len();
        self.buffer.extend_from_slice(bytes);
        start..self.buffer.len()
    }

    /// Consumes the builder, returning the accumulated bytes.
    pub fn finish(self) -> Vec<u8> {
        self.buffer
    }
}

/// The structural contract every format's record type implements: tag,
/// address, and data accessors; the redundant `count`/`checksum` fields
/// derived from them; per-record validation; and the serialized form, both
/// as plain bytes and decomposed into [`Tokens`].
///
/// Parsing a single record is necessarily format-specific — some formats
/// need surrounding cursor state (TI-TXT's running address, AVR's implicit
/// word stride) that a single-line `parse` cannot express uniformly — so it
/// is not part of this trait. [`FormatRecord`][crate::file::FormatRecord]
/// parses whole files instead.
pub trait Record: Sized + Clone + PartialEq {
    /// The format's tag enumeration.
    type Tag: Copy + Eq;

    /// This record's tag.
    fn tag(&self) -> Self::Tag;

    /// This record's address field.
    fn address(&self) -> u64;

    /// This record's data payload.
    fn data(&self) -> &[u8];

    /// Whether this record carries memory contents (as opposed to being a
    /// terminator, extended-address, or header record).
    fn is_data(&self) -> bool;

    /// Whether this record is the distinguished terminator that ends a
    /// file.
    fn is_file_termination(&self) -> bool;

    /// Derives this record's count field from its other fields, or `None`
    /// when the tag has no count field.
    fn compute_count(&self) -> Option<u64>;

    /// Derives this record's checksum field from its other fields, or
    /// `None` when the tag has no checksum field.
    fn compute_checksum(&self) -> Option<u64>;

    /// Validates the stored `count`/`checksum` fields (when `check_count`/
    /// `check_checksum` are set) and every other per-tag invariant.
    fn validate(&self, check_count: bool, check_checksum: bool) -> Result<(), Error>;

    /// Produces the canonical serialization of this record.
    fn to_bytestr(&self, ending: Ending) -> Vec<u8> {
        self.to_tokens(ending).0
    }

    /// Produces the canonical serialization of this record alongside the
    /// named byte ranges of each field within it.
    fn to_tokens(&self, ending: Ending) -> (Vec<u8>, Tokens);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_builder_tracks_ranges() {
        let mut builder = TokenBuilder::new();

        let begin = builder.push(b":");
        let count = builder.push(b"0D");
        let data = builder.push(b"48656C6C6F");

        assert_eq!(builder.finish(), b":0D48656C6C6F");
        assert_eq!(begin, 0..1);
        assert_eq!(count, 1..3);
        assert_eq!(data, 3..13);
    }

    #[test]
    fn test_tokens_slice() {
        let tokens = Tokens { data: 3..8, ..Tokens::default() };
        let buffer = b"abcHELLOxyz";

        assert_eq!(tokens.slice(buffer, &tokens.data), b"HELLO");
    }
}
