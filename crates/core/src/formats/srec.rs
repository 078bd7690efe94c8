//! Motorola S-Record: an optional header, three data-width variants, an
//! optional record-count record, and a data-tag-matched terminator.

use hexrec_errors::Error;
use hexrec_memory::Memory;
use hexrec_parser::{hexlify, Ending};

use crate::file::{FormatRecord, RecordFile};
use crate::formats::support::{ending_bytes, is_whitespace, lines, take_hex_bytes, take_hex_field, trim_junk};
use crate::record::{Record as RecordTrait, TokenBuilder, Tokens};

/// One S-Record tag (`S4` is reserved and never used).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tag {
    /// Header record; `data` is a free-form text/byte payload.
    S0,
    /// Data record, 16-bit address.
    S1,
    /// Data record, 24-bit address.
    S2,
    /// Data record, 32-bit address.
    S3,
    /// Record-count record, 16-bit count.
    S5,
    /// Record-count record, 24-bit count.
    S6,
    /// Terminator pairing with S3, 32-bit start address.
    S7,
    /// Terminator pairing with S2, 24-bit start address.
    S8,
    /// Terminator pairing with S1, 16-bit start address.
    S9,
}

impl Tag {
    fn digit(self) -> u8 {
        match self {
            Tag::S0 => 0,
            Tag::S1 => 1,
            Tag::S2 => 2,
            Tag::S3 => 3,
            Tag::S5 => 5,
            Tag::S6 => 6,
            Tag::S7 => 7,
            Tag::S8 => 8,
            Tag::S9 => 9,
        }
    }

    fn from_digit(digit: u8) -> Result<Self, Error> {
        Ok(match digit {
            0 => Tag::S0,
            1 => Tag::S1,
            2 => Tag::S2,
            3 => Tag::S3,
            5 => Tag::S5,
            6 => Tag::S6,
            7 => Tag::S7,
            8 => Tag::S8,
            9 => Tag::S9,
            _ => return Err(Error::Syntax(0)),
        })
    }

    /// Address field width in bytes.
    fn address_len(self) -> usize {
        match self {
            Tag::S0 | Tag::S1 | Tag::S5 | Tag::S9 => 2,
            Tag::S2 | Tag::S6 | Tag::S8 => 3,
            Tag::S3 | Tag::S7 => 4,
        }
    }

    fn is_data(self) -> bool {
        matches!(self, Tag::S1 | Tag::S2 | Tag::S3)
    }

    fn is_terminator(self) -> bool {
        matches!(self, Tag::S7 | Tag::S8 | Tag::S9)
    }

    fn is_count(self) -> bool {
        matches!(self, Tag::S5 | Tag::S6)
    }

    /// The terminator tag matching a data tag of this width.
    fn terminator_for_data(self) -> Tag {
        match self {
            Tag::S1 => Tag::S9,
            Tag::S2 => Tag::S8,
            Tag::S3 => Tag::S7,
            other => other,
        }
    }

    /// The data tag a terminator pairs with.
    fn data_for_terminator(self) -> Option<Tag> {
        match self {
            Tag::S9 => Some(Tag::S1),
            Tag::S8 => Some(Tag::S2),
            Tag::S7 => Some(Tag::S3),
            _ => None,
        }
    }

    /// Smallest data tag whose address width covers `endex`.
    fn fit_data_tag(endex: u64) -> Tag {
        if endex <= 1 << 16 {
            Tag::S1
        } else if endex <= 1 << 24 {
            Tag::S2
        } else {
            Tag::S3
        }
    }
}

/// One Motorola S-Record record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    tag: Tag,
    address: u32,
    data: Vec<u8>,
    before: Vec<u8>,
    after: Vec<u8>,
}

impl Record {
    /// Creates a header (S0) record.
    pub fn header(data: Vec<u8>) -> Self {
        Self { tag: Tag::S0, address: 0, data, before: Vec::new(), after: Vec::new() }
    }

    /// Creates a data record of the given width tag.
    pub fn data(tag: Tag, address: u32, data: Vec<u8>) -> Self {
        Self { tag, address, data, before: Vec::new(), after: Vec::new() }
    }

    /// Creates a record-count record.
    pub fn count(tag: Tag, count: u32) -> Self {
        Self { tag, address: count, data: Vec::new(), before: Vec::new(), after: Vec::new() }
    }

    /// Creates a terminator record carrying the start address.
    pub fn terminator(tag: Tag, start_address: u32) -> Self {
        Self { tag, address: start_address, data: Vec::new(), before: Vec::new(), after: Vec::new() }
    }

    fn address_bytes(&self) -> Vec<u8> {
        let full = self.address.to_be_bytes();
        full[4 - self.tag.address_len()..].to_vec()
    }
}

impl RecordTrait for Record {
    type Tag = Tag;

    fn tag(&self) -> Tag {
        self.tag
    }

    fn address(&self) -> u64 {
        self.address as u64
    }

    fn data(&self) -> &[u8] {
        &self.data
    }

    fn is_data(&self) -> bool {
        self.tag.is_data()
    }

    fn is_file_termination(&self) -> bool {
        self.tag.is_terminator()
    }

    fn compute_count(&self) -> Option<u64> {
        Some(1 + self.tag.address_len() as u64 + self.data.len() as u64)
    }

    fn compute_checksum(&self) -> Option<u64> {
        let count = self.compute_count().unwrap() as u8;
        let sum: u32 = count as u32
            + self.address_bytes().iter().map(|&b| b as u32).sum::<u32>()
            + self.data.iter().map(|&b| b as u32).sum::<u32>();
        Some(((sum & 0xFF) ^ 0xFF) as u64)
    }

    fn validate(&self, check_count: bool, check_checksum: bool) -> Result<(), Error> {
        if self.tag.is_count() && !self.data.is_empty() {
            return Err(Error::FieldOverflow(self.data.len() as u64));
        }

        if self.tag.is_terminator() && !self.data.is_empty() {
            return Err(Error::FieldOverflow(self.data.len() as u64));
        }

        let max_address = 1u64 << (8 * self.tag.address_len());
        if self.address as u64 >= max_address {
            return Err(Error::AddressOverflow(self.address as u64));
        }

        if check_count {
            let expected = self.compute_count().unwrap();
            if expected > 255 {
                return Err(Error::FieldOverflow(expected));
            }
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

        tokens.before = builder.push(&self.before);
        tokens.begin = builder.push(b"S");
        tokens.tag = builder.push(&[b'0' + self.tag.digit()]);
        tokens.count = builder.push(hexlify(&[self.compute_count().unwrap() as u8], "", true).as_bytes());
        tokens.address = builder.push(hexlify(&self.address_bytes(), "", true).as_bytes());
        tokens.data = builder.push(hexlify(&self.data, "", true).as_bytes());
        tokens.checksum = builder.push(hexlify(&[self.compute_checksum().unwrap() as u8], "", true).as_bytes());
        tokens.after = builder.push(&self.after);
        tokens.end = builder.push(ending_bytes(ending));

        (builder.finish(), tokens)
    }
}

fn parse_record(line: &[u8]) -> Result<Record, Error> {
    let (before, core, after) = trim_junk(line)?;

    if core.first() != Some(&b'S') {
        return Err(Error::Syntax(0));
    }

    let mut pos = 1;
    let digit = take_hex_field(core, &mut pos, 1)? as u8;
    let tag = Tag::from_digit(digit)?;

    let count = take_hex_field(core, &mut pos, 2)? as usize;
    if count < 1 + tag.address_len() {
        return Err(Error::Syntax(0));
    }

    let address_bytes = take_hex_bytes(core, &mut pos, tag.address_len())?;
    let mut address_full = [0u8; 4];
    address_full[4 - tag.address_len()..].copy_from_slice(&address_bytes);
    let address = u32::from_be_bytes(address_full);

    let data_len = count - 1 - tag.address_len();
    let data = take_hex_bytes(core, &mut pos, data_len)?;
    let checksum = take_hex_field(core, &mut pos, 2)? as u8;

    if pos != core.len() {
        return Err(Error::Syntax(0));
    }

    let record = Record { tag, address, data, before: before.to_vec(), after: after.to_vec() };

    if record.compute_count().unwrap() != count as u64 {
        return Err(Error::CountMismatch(0, count as u64, record.compute_count().unwrap()));
    }

    let expected_checksum = record.compute_checksum().unwrap() as u8;
    if checksum != expected_checksum {
        return Err(Error::ChecksumMismatch(0, checksum as u64, expected_checksum as u64));
    }

    record.validate(true, true)?;
    Ok(record)
}

/// File-level metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Meta {
    /// The S0 header payload, if any.
    pub header: Option<Vec<u8>>,
    /// The start address carried by the terminator record.
    pub start_address: Option<u32>,
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
    /// Emit an S5/S6 record-count record before the terminator.
    pub emit_count: bool,
}

impl Default for UpdateOptions {
    fn default() -> Self {
        Self { maxdatalen: Some(16), emit_count: true }
    }
}

/// The Motorola S-Record codec.
pub struct Codec;

/// A Motorola S-Record file.
pub type File = RecordFile<Codec>;

impl FormatRecord for Codec {
    type Record = Record;
    type Meta = Meta;
    type ParseOptions = ParseOptions;
    type UpdateOptions = UpdateOptions;

    fn parse(bytes: &[u8], options: &ParseOptions) -> Result<(Vec<Record>, Meta), Error> {
        let mut records = Vec::new();
        let mut terminated = false;
        let mut data_tag: Option<Tag> = None;
        let mut data_count = 0u32;

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
                    if record.tag.is_data() {
                        match data_tag {
                            None => data_tag = Some(record.tag),
                            Some(expected) if expected != record.tag => {
                                if !options.ignore_errors {
                                    return Err(Error::DataTagMismatch(0));
                                }
                                continue;
                            }
                            _ => {}
                        }
                        data_count += 1;
                    }

                    if record.tag.is_terminator() {
                        if let (Some(expected_data), Some(found_data)) =
                            (record.tag.data_for_terminator(), data_tag)
                        {
                            if expected_data != found_data && !options.ignore_errors {
                                return Err(Error::TerminatorMismatch);
                            }
                        }
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

        if let Some(count_record) = records.iter().find(|record| record.tag.is_count()) {
            if count_record.address != data_count {
                return Err(Error::CountMismatch(0, count_record.address as u64, data_count as u64));
            }
        }

        let header = records.iter().find(|record| record.tag == Tag::S0).map(|record| record.data.clone());
        let start_address = records.iter().find(|record| record.tag.is_terminator()).map(|record| record.address);

        Ok((records, Meta { header, start_address }))
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

        if let Some(header) = &meta.header {
            records.push(Record::header(header.clone()));
        }

        let endex = memory.span().map(|(_, endex)| endex).unwrap_or(0);
        let data_tag = Tag::fit_data_tag(endex);

        let mut data_count = 0u32;
        for block in memory.to_blocks() {
            for (index, chunk) in block.data.chunks(maxdatalen).enumerate() {
                let address = block.start + (index * maxdatalen) as u64;
                if address >= 1u64 << (8 * data_tag.address_len()) {
                    return Err(Error::AddressOverflow(address));
                }
                records.push(Record::data(data_tag, address as u32, chunk.to_vec()));
                data_count += 1;
            }
        }

        if options.emit_count {
            let count_tag = if data_count <= 0xFFFF { Tag::S5 } else { Tag::S6 };
            records.push(Record::count(count_tag, data_count));
        }

        let default_start = memory.span().map(|(start, _)| start as u32).unwrap_or(0);
        let terminator_tag = data_tag.terminator_for_data();
        records.push(Record::terminator(terminator_tag, meta.start_address.unwrap_or(default_start)));

        Ok(records)
    }

    fn apply_records(records: &[Record]) -> Result<(Memory, Meta), Error> {
        let mut memory = Memory::new();
        let mut meta = Meta::default();

        for record in records {
            if record.tag.is_data() {
                memory.write(record.address as u64, &record.data)?;
            } else if record.tag == Tag::S0 {
                meta.header = Some(record.data.clone());
            } else if record.tag.is_terminator() {
                meta.start_address = Some(record.address);
            }
        }

        Ok((memory, meta))
    }

    fn validate_records(records: &[Record], data_ordering: bool) -> Result<(), Error> {
        for record in records {
            record.validate(true, true)?;
        }

        let terminators: Vec<&Record> = records.iter().filter(|record| record.tag.is_terminator()).collect();
        if terminators.len() != 1 || !records.last().map(|record| record.tag.is_terminator()).unwrap_or(false) {
            return Err(Error::MisplacedTermination);
        }

        let mut data_tag: Option<Tag> = None;
        let mut data_count = 0u32;
        let mut last_addr: Option<u64> = None;

        for (index, record) in records.iter().enumerate() {
            if record.tag.is_data() {
                match data_tag {
                    None => data_tag = Some(record.tag),
                    Some(expected) if expected != record.tag => return Err(Error::DataTagMismatch(index)),
                    _ => {}
                }
                data_count += 1;

                if data_ordering {
                    if let Some(previous) = last_addr {
                        if (record.address as u64) < previous {
                            return Err(Error::UnorderedRecords(index));
                        }
                    }
                    last_addr = Some(record.address as u64 + record.data.len() as u64);
                }
            }
        }

        if let Some(count_record) = records.iter().find(|record| record.tag.is_count()) {
            if count_record.address != data_count {
                return Err(Error::CountMismatch(0, count_record.address as u64, data_count as u64));
            }
        }

        if let (Some(terminator), Some(data_tag)) = (terminators.first(), data_tag) {
            if terminator.tag.data_for_terminator() != Some(data_tag) {
                return Err(Error::TerminatorMismatch);
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_round_trip_matches_literal_bytes() {
        let mut file = File::from_bytes(b"Hello, World!".to_vec(), 0x1234);
        let options = UpdateOptions { maxdatalen: Some(16), emit_count: false };
        file.update_records(&options).unwrap();

        let serialized = file.serialize(Ending::Crlf).unwrap();
        assert_eq!(serialized, b"S110123448656C6C6F2C20576F726C642140\r\nS9031234B6\r\n".to_vec());
    }

    #[test]
    fn test_header_round_trips() {
        let mut file = File::from_bytes(b"abc".to_vec(), 0);
        *file.meta_mut() = Meta { header: Some(b"HDR".to_vec()), start_address: None };

        let serialized = file.serialize(Ending::Crlf).unwrap();
        let mut parsed = File::parse(&serialized, &ParseOptions::default()).unwrap();

        assert_eq!(parsed.meta().header, Some(b"HDR".to_vec()));
        assert_eq!(parsed.read(0, 3, None).unwrap(), b"abc");
    }

    #[test]
    fn test_mismatched_data_tag_rejected() {
        let bad = b"S110000048656C6C6F2C20576F726C642140\r\nS2040001004142A8\r\nS9031234B6\r\n";
        assert!(File::parse(bad, &ParseOptions::default()).is_err());
    }
}
