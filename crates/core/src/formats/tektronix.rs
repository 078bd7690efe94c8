//! Tektronix extended HEX: a variable-width address field (1-15 hex digits,
//! chosen per file) and a length field that counts itself.

use hexrec_errors::Error;
use hexrec_memory::Memory;
use hexrec_parser::{hex_digit_value, hexlify, Ending};

use crate::file::{FormatRecord, RecordFile};
use crate::formats::support::{ending_bytes, is_whitespace, lines, take_hex_bytes, take_hex_field, trim_junk};
use crate::record::{Record as RecordTrait, TokenBuilder, Tokens};

/// One Tektronix record's tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tag {
    /// Carries memory contents at `address`.
    Data,
    /// Ends the file; `address` carries the start address.
    Eof,
}

impl Tag {
    fn code(self) -> u8 {
        match self {
            Tag::Data => 6,
            Tag::Eof => 8,
        }
    }

    fn from_code(code: u8) -> Result<Self, Error> {
        match code {
            6 => Ok(Tag::Data),
            8 => Ok(Tag::Eof),
            _ => Err(Error::Syntax(0)),
        }
    }
}

/// One Tektronix extended HEX record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    tag: Tag,
    address: u64,
    addrlen: u8,
    data: Vec<u8>,
    before: Vec<u8>,
    after: Vec<u8>,
}

impl Record {
    /// Creates a data record with an explicit address-digit width.
    pub fn data(address: u64, addrlen: u8, data: Vec<u8>) -> Self {
        Self { tag: Tag::Data, address, addrlen, data, before: Vec::new(), after: Vec::new() }
    }

    /// Creates the terminator record, carrying the start address.
    pub fn eof(start_address: u64, addrlen: u8) -> Self {
        Self { tag: Tag::Eof, address: start_address, addrlen, data: Vec::new(), before: Vec::new(), after: Vec::new() }
    }

    fn address_hex(&self) -> String {
        format!("{:0width$X}", self.address, width = self.addrlen as usize)
    }

    /// The payload fields in wire order, excluding `%` and the checksum.
    fn payload_hex(&self, length_hex: &str) -> String {
        let mut payload = String::new();
        payload.push_str(length_hex);
        payload.push_str(&format!("{:X}", self.tag.code()));
        payload.push_str(&format!("{:X}", self.addrlen));
        payload.push_str(&self.address_hex());
        payload.push_str(&hexlify(&self.data, "", true));
        payload
    }

    fn length(&self) -> usize {
        2 + 1 + 1 + self.addrlen as usize + self.data.len() * 2
    }

    fn checksum(&self) -> u8 {
        let length_hex = hexlify(&[self.length() as u8], "", true);
        let payload = self.payload_hex(&length_hex);
        (nibble_sum(&payload) % 256) as u8
    }
}

fn nibble_sum(hex: &str) -> u32 {
    hex.bytes().filter_map(hex_digit_value).map(|digit| digit as u32).sum()
}

impl RecordTrait for Record {
    type Tag = Tag;

    fn tag(&self) -> Tag {
        self.tag
    }

    fn address(&self) -> u64 {
        self.address
    }

    fn data(&self) -> &[u8] {
        &self.data
    }

    fn is_data(&self) -> bool {
        self.tag == Tag::Data
    }

    fn is_file_termination(&self) -> bool {
        self.tag == Tag::Eof
    }

    fn compute_count(&self) -> Option<u64> {
        Some(self.length() as u64)
    }

    fn compute_checksum(&self) -> Option<u64> {
        Some(self.checksum() as u64)
    }

    fn validate(&self, check_count: bool, check_checksum: bool) -> Result<(), Error> {
        if !(1..=15).contains(&self.addrlen) {
            return Err(Error::FieldOverflow(self.addrlen as u64));
        }

        let max_address = 1u64 << (4 * self.addrlen as u32).min(63);
        if self.address >= max_address {
            return Err(Error::AddressOverflow(self.address));
        }

        if self.tag == Tag::Eof && !self.data.is_empty() {
            return Err(Error::FieldOverflow(self.data.len() as u64));
        }

        if check_count && self.length() > 0xFF {
            return Err(Error::FieldOverflow(self.length() as u64));
        }

        let _ = check_checksum;

        if !is_whitespace(&self.before) || !is_whitespace(&self.after) {
            return Err(Error::NonWhitespaceJunk(0));
        }

        Ok(())
    }

    fn to_tokens(&self, ending: Ending) -> (Vec<u8>, Tokens) {
        let mut builder = TokenBuilder::new();
        let mut tokens = Tokens::default();

        let length_hex = hexlify(&[self.length() as u8], "", true);
        let checksum_hex = hexlify(&[self.checksum()], "", true);

        tokens.before = builder.push(&self.before);
        tokens.begin = builder.push(b"%");
        tokens.count = builder.push(length_hex.as_bytes());
        tokens.tag = builder.push(format!("{:X}", self.tag.code()).as_bytes());
        tokens.checksum = builder.push(checksum_hex.as_bytes());
        tokens.extra.push(("addrlen", builder.push(format!("{:X}", self.addrlen).as_bytes())));
        tokens.address = builder.push(self.address_hex().as_bytes());
        tokens.data = builder.push(hexlify(&self.data, "", true).as_bytes());
        tokens.after = builder.push(&self.after);
        tokens.end = builder.push(ending_bytes(ending));

        (builder.finish(), tokens)
    }
}

fn parse_record(line: &[u8]) -> Result<Record, Error> {
    let (before, core, after) = trim_junk(line)?;

    if core.first() != Some(&b'%') {
        return Err(Error::Syntax(0));
    }

    let mut pos = 1;
    let length = take_hex_field(core, &mut pos, 2)? as usize;

    if core.len() - 1 != length {
        return Err(Error::Syntax(0));
    }

    let tag_code = take_hex_field(core, &mut pos, 1)? as u8;
    let checksum = take_hex_field(core, &mut pos, 2)? as u8;
    let addrlen = take_hex_field(core, &mut pos, 1)? as u8;

    if !(1..=15).contains(&addrlen) {
        return Err(Error::FieldOverflow(addrlen as u64));
    }

    let address = take_hex_field(core, &mut pos, addrlen as usize)?;

    let remaining = core.len() - pos;
    if remaining % 2 != 0 {
        return Err(Error::Syntax(0));
    }
    let data = take_hex_bytes(core, &mut pos, remaining / 2)?;

    if pos != core.len() {
        return Err(Error::Syntax(0));
    }

    let tag = Tag::from_code(tag_code)?;
    let record = Record { tag, address, addrlen, data, before: before.to_vec(), after: after.to_vec() };

    if checksum != record.checksum() {
        return Err(Error::ChecksumMismatch(0, checksum as u64, record.checksum() as u64));
    }

    record.validate(true, true)?;
    Ok(record)
}

/// File-level metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Meta {
    /// The start address carried by the terminator record.
    pub start_address: Option<u64>,
    /// The address-digit width used by the most recently seen record.
    pub addrlen: u8,
}

impl Default for Meta {
    fn default() -> Self {
        Self { start_address: None, addrlen: 8 }
    }
}

/// Options accepted by [`Codec::parse`][FormatRecord::parse].
#[derive(Debug, Clone, Default)]
pub struct ParseOptions {
    /// Skip malformed records instead of aborting on the first one.
    pub ignore_errors: bool,
    /// Tolerate arbitrary trailing bytes after the terminator record.
    pub ignore_after_termination: bool,
}

/// Options accepted by [`Codec::update_records`][FormatRecord::update_records].
#[derive(Debug, Clone)]
pub struct UpdateOptions {
    /// Maximum data bytes per emitted data record.
    pub maxdatalen: Option<usize>,
    /// Address-digit width (1-15) to use for every emitted record.
    pub addrlen: u8,
}

impl Default for UpdateOptions {
    fn default() -> Self {
        Self { maxdatalen: Some(16), addrlen: 8 }
    }
}

/// The Tektronix extended HEX codec.
pub struct Codec;

/// A Tektronix extended HEX file.
pub type File = RecordFile<Codec>;

impl FormatRecord for Codec {
    type Record = Record;
    type Meta = Meta;
    type ParseOptions = ParseOptions;
    type UpdateOptions = UpdateOptions;

    fn parse(bytes: &[u8], options: &ParseOptions) -> Result<(Vec<Record>, Meta), Error> {
        let mut records = Vec::new();
        let mut terminated = false;
        let mut meta = Meta::default();

        for (line, _ending) in lines(bytes) {
            if terminated {
                if options.ignore_after_termination || line.is_empty() || is_whitespace(line) {
                    continue;
                }
                return Err(Error::MisplacedTermination);
            }

            if line.is_empty() || is_whitespace(line) {
                continue;
            }

            match parse_record(line) {
                Ok(record) => {
                    meta.addrlen = record.addrlen;
                    if record.tag == Tag::Eof {
                        meta.start_address = Some(record.address);
                        terminated = true;
                    }
                    records.push(record);
                }
                Err(error) => {
                    if options.ignore_errors {
                        continue;
                    }
                    return Err(error);
                }
            }
        }

        Ok((records, meta))
    }

    fn serialize(records: &[Record], _meta: &Meta, ending: Ending) -> Vec<u8> {
        let mut out = Vec::new();
        for record in records {
            out.extend_from_slice(&record.to_bytestr(ending));
        }
        out
    }

    fn update_records(memory: &Memory, meta: &Meta, options: &UpdateOptions) -> Result<Vec<Record>, Error> {
        let maxdatalen = options.maxdatalen.unwrap_or(16).max(1);
        let mut records = Vec::new();

        for block in memory.to_blocks() {
            for (index, chunk) in block.data.chunks(maxdatalen).enumerate() {
                let address = block.start + (index * maxdatalen) as u64;
                records.push(Record::data(address, options.addrlen, chunk.to_vec()));
            }
        }

        let default_start = memory.span().map(|(start, _)| start).unwrap_or(0);
        let start_address = meta.start_address.unwrap_or(default_start);
        records.push(Record::eof(start_address, options.addrlen));

        Ok(records)
    }

    fn apply_records(records: &[Record]) -> Result<(Memory, Meta), Error> {
        let mut memory = Memory::new();
        let mut meta = Meta::default();

        for record in records {
            meta.addrlen = record.addrlen;
            match record.tag {
                Tag::Data => memory.write(record.address, &record.data)?,
                Tag::Eof => meta.start_address = Some(record.address),
            }
        }

        Ok((memory, meta))
    }

    fn validate_records(records: &[Record], data_ordering: bool) -> Result<(), Error> {
        for record in records {
            record.validate(true, true)?;
        }

        if records.iter().filter(|record| record.tag == Tag::Eof).count() != 1 {
            return Err(Error::MisplacedTermination);
        }

        match records.last() {
            Some(last) if last.tag == Tag::Eof => {}
            _ => return Err(Error::MisplacedTermination),
        }

        if data_ordering {
            let mut last_addr: Option<u64> = None;
            for (index, record) in records.iter().enumerate() {
                if record.tag != Tag::Data {
                    continue;
                }
                if let Some(previous) = last_addr {
                    if record.address < previous {
                        return Err(Error::UnorderedRecords(index));
                    }
                }
                last_addr = Some(record.address + record.data.len() as u64);
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_and_terminator_match_literal_bytes() {
        let mut file = File::from_bytes(b"abc".to_vec(), 0x1234);
        *file.meta_mut() = Meta { start_address: Some(0xABCD), addrlen: 8 };

        let serialized = file.serialize(Ending::Crlf).unwrap();
        assert_eq!(serialized, b"%14635800001234616263\r\n%0E84C80000ABCD\r\n".to_vec());
    }

    #[test]
    fn test_round_trip_recovers_memory() {
        let mut file = File::from_bytes(b"hello".to_vec(), 0x100);
        let serialized = file.serialize(Ending::Crlf).unwrap();

        let mut parsed = File::parse(&serialized, &ParseOptions::default()).unwrap();
        assert_eq!(parsed.read(0x100, 0x105, None).unwrap(), b"hello");
    }

    #[test]
    fn test_checksum_mutation_rejected() {
        let mut file = File::from_bytes(b"x".to_vec(), 0);
        let mut bytes = file.serialize(Ending::Crlf).unwrap();

        bytes[4] = b'0';
        bytes[5] = b'0';

        assert!(File::parse(&bytes, &ParseOptions::default()).is_err());
    }
}
