//! TI-TXT: `@HHHH` address directives, whitespace-separated hex byte lines
//! with no count or checksum field at all, and a final `q`.

use hexrec_errors::Error;
use hexrec_memory::Memory;
use hexrec_parser::{hex_digit_value, hexlify, Ending};

use crate::file::{FormatRecord, RecordFile};
use crate::formats::support::{ending_bytes, is_whitespace, lines, trim_junk};
use crate::record::{Record as RecordTrait, TokenBuilder, Tokens};

/// One TI-TXT record's kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tag {
    /// A `@HHHH` directive resetting the running cursor.
    Address,
    /// A whitespace-separated hex byte line, appended at the current cursor.
    Data,
    /// The final `q` terminator.
    End,
}

/// One TI-TXT record.
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
    /// Creates an address directive for `address`, emitted with `addrlen`
    /// digits (zero-padded; wider values still print in full).
    pub fn address(address: u64, addrlen: u8) -> Self {
        Self { tag: Tag::Address, address, addrlen, data: Vec::new(), before: Vec::new(), after: Vec::new() }
    }

    /// Creates a data line appended at the current cursor, `address`.
    pub fn data(address: u64, data: Vec<u8>) -> Self {
        Self { tag: Tag::Data, address, addrlen: 0, data, before: Vec::new(), after: Vec::new() }
    }

    /// Creates the `q` terminator.
    pub fn end() -> Self {
        Self { tag: Tag::End, address: 0, addrlen: 0, data: Vec::new(), before: Vec::new(), after: Vec::new() }
    }
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
        self.tag == Tag::End
    }

    fn compute_count(&self) -> Option<u64> {
        None
    }

    fn compute_checksum(&self) -> Option<u64> {
        None
    }

    fn validate(&self, _check_count: bool, _check_checksum: bool) -> Result<(), Error> {
        match self.tag {
            Tag::Address => {
                if !self.data.is_empty() {
                    return Err(Error::FieldOverflow(self.data.len() as u64));
                }
                if self.address >= 1u64 << 32 {
                    return Err(Error::AddressOverflow(self.address));
                }
            }
            Tag::End => {
                if !self.data.is_empty() {
                    return Err(Error::FieldOverflow(self.data.len() as u64));
                }
            }
            Tag::Data => {}
        }

        if !is_whitespace(&self.before) || !is_whitespace(&self.after) {
            return Err(Error::NonWhitespaceJunk(0));
        }

        Ok(())
    }

    fn to_tokens(&self, ending: Ending) -> (Vec<u8>, Tokens) {
        let mut builder = TokenBuilder::new();
        let mut tokens = Tokens::default();

        tokens.before = builder.push(&self.before);

        match self.tag {
            Tag::Address => {
                tokens.begin = builder.push(b"@");
                let width = self.addrlen.max(1) as usize;
                tokens.address = builder.push(format!("{:0width$X}", self.address, width = width).as_bytes());
            }
            Tag::Data => {
                tokens.data = builder.push(hexlify(&self.data, " ", true).as_bytes());
            }
            Tag::End => {
                tokens.begin = builder.push(b"q");
            }
        }

        tokens.after = builder.push(&self.after);
        tokens.end = builder.push(ending_bytes(ending));

        (builder.finish(), tokens)
    }
}

fn parse_data_line(core: &[u8]) -> Result<Vec<u8>, Error> {
    let mut data = Vec::new();

    for token in core.split(|byte| byte.is_ascii_whitespace()).filter(|token| !token.is_empty()) {
        if token.len() != 2 {
            return Err(Error::Syntax(0));
        }
        let high = hex_digit_value(token[0]).ok_or(Error::InvalidHexDigit(0))?;
        let low = hex_digit_value(token[1]).ok_or(Error::InvalidHexDigit(0))?;
        data.push((high << 4) | low);
    }

    if data.is_empty() {
        return Err(Error::Syntax(0));
    }

    Ok(data)
}

/// File-level metadata: the digit width used for `@` directives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Meta {
    /// Digit width for emitted `@HHHH…` directives (1-8).
    pub addrlen: u8,
}

impl Default for Meta {
    fn default() -> Self {
        Self { addrlen: 4 }
    }
}

/// Options accepted by [`Codec::parse`][FormatRecord::parse].
#[derive(Debug, Clone, Default)]
pub struct ParseOptions {
    /// Skip malformed records instead of aborting on the first one.
    pub ignore_errors: bool,
    /// Tolerate arbitrary trailing bytes after the `q` terminator.
    pub ignore_after_termination: bool,
}

/// Options accepted by [`Codec::update_records`][FormatRecord::update_records].
#[derive(Debug, Clone)]
pub struct UpdateOptions {
    /// Maximum data bytes per emitted data line.
    pub maxdatalen: Option<usize>,
}

impl Default for UpdateOptions {
    fn default() -> Self {
        Self { maxdatalen: Some(16) }
    }
}

/// The TI-TXT codec.
pub struct Codec;

/// A TI-TXT file.
pub type File = RecordFile<Codec>;

impl FormatRecord for Codec {
    type Record = Record;
    type Meta = Meta;
    type ParseOptions = ParseOptions;
    type UpdateOptions = UpdateOptions;

    fn parse(bytes: &[u8], options: &ParseOptions) -> Result<(Vec<Record>, Meta), Error> {
        let mut records = Vec::new();
        let mut terminated = false;
        let mut cursor: u64 = 0;
        let mut meta = Meta::default();

        for (line, _ending) in lines(bytes) {
            if line.is_empty() || is_whitespace(line) {
                continue;
            }

            if terminated {
                if options.ignore_after_termination {
                    continue;
                }
                return Err(Error::MisplacedTermination);
            }

            let (before, core, after) = trim_junk(line)?;

            let result = if core.first() == Some(&b'@') {
                let digits = &core[1..];
                if digits.is_empty() || digits.len() > 8 {
                    Err(Error::Syntax(0))
                } else {
                    let mut value = 0u64;
                    let mut ok = true;
                    for &byte in digits {
                        match hex_digit_value(byte) {
                            Some(digit) => value = (value << 4) | digit as u64,
                            None => {
                                ok = false;
                                break;
                            }
                        }
                    }
                    if ok {
                        let record = Record {
                            tag: Tag::Address,
                            address: value,
                            addrlen: digits.len() as u8,
                            data: Vec::new(),
                            before: before.to_vec(),
                            after: after.to_vec(),
                        };
                        cursor = value;
                        meta.addrlen = digits.len() as u8;
                        Ok(record)
                    } else {
                        Err(Error::InvalidHexDigit(0))
                    }
                }
            } else if core.eq_ignore_ascii_case(b"q") {
                Ok(Record { tag: Tag::End, address: 0, addrlen: 0, data: Vec::new(), before: before.to_vec(), after: after.to_vec() })
            } else {
                parse_data_line(core).map(|data| {
                    let record = Record {
                        tag: Tag::Data,
                        address: cursor,
                        addrlen: 0,
                        data,
                        before: before.to_vec(),
                        after: after.to_vec(),
                    };
                    cursor += record.data.len() as u64;
                    record
                })
            };

            match result {
                Ok(record) => {
                    if record.tag == Tag::End {
                        terminated = true;
                    }
                    record.validate(true, true)?;
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
        let mut cursor: u64 = 0;

        for block in memory.to_blocks() {
            if block.start != cursor {
                records.push(Record::address(block.start, meta.addrlen));
                cursor = block.start;
            }

            for chunk in block.data.chunks(maxdatalen) {
                records.push(Record::data(cursor, chunk.to_vec()));
                cursor += chunk.len() as u64;
            }
        }

        records.push(Record::end());
        Ok(records)
    }

    fn apply_records(records: &[Record]) -> Result<(Memory, Meta), Error> {
        let mut memory = Memory::new();
        let mut meta = Meta::default();

        for record in records {
            match record.tag {
                Tag::Data => memory.write(record.address, &record.data)?,
                Tag::Address => meta.addrlen = record.addrlen,
                Tag::End => {}
            }
        }

        Ok((memory, meta))
    }

    fn validate_records(records: &[Record], data_ordering: bool) -> Result<(), Error> {
        for record in records {
            record.validate(true, true)?;
        }

        if records.iter().filter(|record| record.tag == Tag::End).count() != 1 {
            return Err(Error::MisplacedTermination);
        }

        match records.last() {
            Some(last) if last.tag == Tag::End => {}
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
    fn test_non_contiguous_blocks_match_literal_bytes() {
        let mut file = File::from_blocks([(0u64, b"abc".to_vec()), (0x1234, b"xyz".to_vec())]);

        let serialized = file.serialize(Ending::Crlf).unwrap();
        assert_eq!(serialized, b"61 62 63\r\n@1234\r\n78 79 7A\r\nq\r\n".to_vec());
    }

    #[test]
    fn test_round_trip_recovers_memory() {
        let mut file = File::from_blocks([(0u64, b"abc".to_vec()), (0x1234, b"xyz".to_vec())]);
        let serialized = file.serialize(Ending::Crlf).unwrap();

        let mut parsed = File::parse(&serialized, &ParseOptions::default()).unwrap();
        assert_eq!(parsed.read(0, 3, None).unwrap(), b"abc");
        assert_eq!(parsed.read(0x1234, 0x1237, None).unwrap(), b"xyz");
    }

    #[test]
    fn test_contiguous_block_needs_no_directive() {
        let mut file = File::from_bytes(b"hello".to_vec(), 0);
        let serialized = file.serialize(Ending::Crlf).unwrap();

        assert!(!serialized.starts_with(b"@"));
    }
}
