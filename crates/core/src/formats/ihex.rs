//! Intel HEX: 16-bit offsets with segment/linear extension, end-of-file, and
//! start-segment/linear records.

use hexrec_errors::Error;
use hexrec_memory::Memory;
use hexrec_parser::{checksum8, hexlify, Ending};

use crate::file::{FormatRecord, RecordFile};
use crate::formats::support::{ending_bytes, is_whitespace, lines, take_hex_bytes, take_hex_field, trim_junk};
use crate::record::{Record as RecordTrait, TokenBuilder, Tokens};

/// An Intel HEX record's kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tag {
    /// Carries up to 255 bytes of memory contents at `address`.
    Data,
    /// Ends the file. Carries no data.
    Eof,
    /// Sets the 20-bit segment base (`value << 4`) for subsequent data.
    ExtendedSegmentAddress,
    /// Sets the CS:IP start address (2 + 2 bytes).
    StartSegmentAddress,
    /// Sets the upper 16 bits of the effective 32-bit address for subsequent
    /// data.
    ExtendedLinearAddress,
    /// Sets the 32-bit EIP start address.
    StartLinearAddress,
}

impl Tag {
    fn code(self) -> u8 {
        match self {
            Tag::Data => 0x00,
            Tag::Eof => 0x01,
            Tag::ExtendedSegmentAddress => 0x02,
            Tag::StartSegmentAddress => 0x03,
            Tag::ExtendedLinearAddress => 0x04,
            Tag::StartLinearAddress => 0x05,
        }
    }

    fn from_code(code: u8) -> Result<Self, Error> {
        Ok(match code {
            0x00 => Tag::Data,
            0x01 => Tag::Eof,
            0x02 => Tag::ExtendedSegmentAddress,
            0x03 => Tag::StartSegmentAddress,
            0x04 => Tag::ExtendedLinearAddress,
            0x05 => Tag::StartLinearAddress,
            _ => return Err(Error::Syntax(0)),
        })
    }
}

/// One Intel HEX record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    tag: Tag,
    /// The on-wire 16-bit `AAAA` field (`0000` for tags that don't use it as
    /// an offset).
    pub address: u16,
    pub data: Vec<u8>,
    before: Vec<u8>,
    after: Vec<u8>,
}

impl Record {
    /// Creates a data record.
    pub fn data(address: u16, data: Vec<u8>) -> Self {
        Self { tag: Tag::Data, address, data, before: Vec::new(), after: Vec::new() }
    }

    /// Creates the end-of-file record.
    pub fn eof() -> Self {
        Self { tag: Tag::Eof, address: 0, data: Vec::new(), before: Vec::new(), after: Vec::new() }
    }

    /// Creates an extended segment address record for segment `seg`.
    pub fn extended_segment_address(seg: u16) -> Self {
        Self {
            tag: Tag::ExtendedSegmentAddress,
            address: 0,
            data: seg.to_be_bytes().to_vec(),
            before: Vec::new(),
            after: Vec::new(),
        }
    }

    /// Creates an extended linear address record for the upper 16 bits
    /// `upper`.
    pub fn extended_linear_address(upper: u16) -> Self {
        Self {
            tag: Tag::ExtendedLinearAddress,
            address: 0,
            data: upper.to_be_bytes().to_vec(),
            before: Vec::new(),
            after: Vec::new(),
        }
    }

    /// Creates a start segment address record for `cs:ip`.
    pub fn start_segment_address(cs: u16, ip: u16) -> Self {
        let mut data = cs.to_be_bytes().to_vec();
        data.extend_from_slice(&ip.to_be_bytes());
        Self { tag: Tag::StartSegmentAddress, address: 0, data, before: Vec::new(), after: Vec::new() }
    }

    /// Creates a start linear address record for `eip`.
    pub fn start_linear_address(eip: u32) -> Self {
        Self {
            tag: Tag::StartLinearAddress,
            address: 0,
            data: eip.to_be_bytes().to_vec(),
            before: Vec::new(),
            after: Vec::new(),
        }
    }

    fn checksum_bytes(&self) -> Vec<u8> {
        let mut bytes = vec![self.data.len() as u8];
        bytes.extend_from_slice(&self.address.to_be_bytes());
        bytes.push(self.tag.code());
        bytes.extend_from_slice(&self.data);
        bytes
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
        self.tag == Tag::Data
    }

    fn is_file_termination(&self) -> bool {
        self.tag == Tag::Eof
    }

    fn compute_count(&self) -> Option<u64> {
        Some(self.data.len() as u64)
    }

    fn compute_checksum(&self) -> Option<u64> {
        Some(checksum8(&self.checksum_bytes()) as u64)
    }

    fn validate(&self, check_count: bool, check_checksum: bool) -> Result<(), Error> {
        if self.data.len() > 255 {
            return Err(Error::FieldOverflow(self.data.len() as u64));
        }

        let expected_len = match self.tag {
            Tag::Data | Tag::Eof => None,
            Tag::ExtendedSegmentAddress | Tag::ExtendedLinearAddress => Some(2),
            Tag::StartSegmentAddress | Tag::StartLinearAddress => Some(4),
        };

        if let Some(expected) = expected_len {
            if self.data.len() != expected {
                return Err(Error::FieldOverflow(self.data.len() as u64));
            }
        }

        if self.tag == Tag::Eof && !self.data.is_empty() {
            return Err(Error::FieldOverflow(self.data.len() as u64));
        }

        if check_count {
            if let Some(expected) = self.compute_count() {
                if expected != self.data.len() as u64 {
                    return Err(Error::CountMismatch(0, self.data.len() as u64, expected));
                }
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
        tokens.begin = builder.push(b":");
        tokens.count = builder.push(hexlify(&[self.data.len() as u8], "", true).as_bytes());
        tokens.address = builder.push(hexlify(&self.address.to_be_bytes(), "", true).as_bytes());
        tokens.tag = builder.push(hexlify(&[self.tag.code()], "", true).as_bytes());
        tokens.data = builder.push(hexlify(&self.data, "", true).as_bytes());

        let checksum = self.compute_checksum().unwrap() as u8;
        tokens.checksum = builder.push(hexlify(&[checksum], "", true).as_bytes());
        tokens.after = builder.push(&self.after);
        tokens.end = builder.push(ending_bytes(ending));

        (builder.finish(), tokens)
    }
}

fn parse_record(line: &[u8]) -> Result<Record, Error> {
    let (before, core, after) = trim_junk(line)?;

    if core.first() != Some(&b':') {
        return Err(Error::Syntax(0));
    }

    let mut pos = 1;
    let count = take_hex_field(core, &mut pos, 2)? as usize;
    let address = take_hex_field(core, &mut pos, 4)? as u16;
    let tag_code = take_hex_field(core, &mut pos, 2)? as u8;
    let data = take_hex_bytes(core, &mut pos, count)?;
    let checksum = take_hex_field(core, &mut pos, 2)? as u8;

    if pos != core.len() {
        return Err(Error::Syntax(0));
    }

    let tag = Tag::from_code(tag_code)?;
    let record = Record { tag, address, data, before: before.to_vec(), after: after.to_vec() };

    let expected_checksum = record.compute_checksum().unwrap() as u8;
    if checksum != expected_checksum {
        return Err(Error::ChecksumMismatch(0, checksum as u64, expected_checksum as u64));
    }

    record.validate(true, true)?;
    Ok(record)
}

/// File-level metadata: the optional start address, in either of the two
/// forms Intel HEX supports.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Meta {
    /// The `CS:IP` pair set by a start segment address record, if any.
    pub start_segment: Option<(u16, u16)>,
    /// The 32-bit EIP set by a start linear address record, if any.
    pub start_linear_address: Option<u32>,
}

/// Options accepted by [`Codec::parse`][FormatRecord::parse].
#[derive(Debug, Clone, Default)]
pub struct ParseOptions {
    /// Skip malformed records instead of aborting on the first one.
    pub ignore_errors: bool,
    /// Tolerate arbitrary trailing bytes after the EOF record.
    pub ignore_after_termination: bool,
}

/// Options accepted by [`Codec::update_records`][FormatRecord::update_records].
#[derive(Debug, Clone)]
pub struct UpdateOptions {
    /// Maximum data bytes per emitted data record.
    pub maxdatalen: Option<usize>,
    /// Emit `ExtendedSegmentAddress` records instead of
    /// `ExtendedLinearAddress` when the upper address bits change.
    pub use_esa: bool,
    /// Always emit an `ExtendedLinearAddress(0)` (or ESA(0)) record before
    /// the first data record, even if the upper bits never leave zero.
    pub emit_initial_ela: bool,
}

impl Default for UpdateOptions {
    fn default() -> Self {
        Self { maxdatalen: Some(16), use_esa: false, emit_initial_ela: false }
    }
}

/// The Intel HEX codec.
pub struct Codec;

/// An Intel HEX file.
pub type File = RecordFile<Codec>;

impl FormatRecord for Codec {
    type Record = Record;
    type Meta = Meta;
    type ParseOptions = ParseOptions;
    type UpdateOptions = UpdateOptions;

    fn parse(bytes: &[u8], options: &ParseOptions) -> Result<(Vec<Record>, Meta), Error> {
        let mut records = Vec::new();
        let mut terminated = false;

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
                    if record.is_file_termination() {
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

        let mut meta = Meta::default();
        for record in &records {
            match record.tag {
                Tag::StartSegmentAddress => {
                    let cs = u16::from_be_bytes([record.data[0], record.data[1]]);
                    let ip = u16::from_be_bytes([record.data[2], record.data[3]]);
                    meta.start_segment = Some((cs, ip));
                }
                Tag::StartLinearAddress => {
                    meta.start_linear_address =
                        Some(u32::from_be_bytes([record.data[0], record.data[1], record.data[2], record.data[3]]));
                }
                _ => {}
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
        let mut last_upper: Option<u16> = None;

        if options.emit_initial_ela {
            push_extended(&mut records, options, 0);
            last_upper = Some(0);
        }

        for block in memory.to_blocks() {
            let mut addr = block.start;
            let mut data = &block.data[..];

            while !data.is_empty() {
                if addr >= 1u64 << 32 {
                    return Err(Error::AddressOverflow(addr));
                }

                let boundary = ((addr >> 16) + 1) << 16;
                let take = maxdatalen.min((boundary - addr) as usize).min(data.len()).max(1);
                let (chunk, rest) = data.split_at(take);

                let upper = (addr >> 16) as u16;
                if last_upper != Some(upper) {
                    push_extended(&mut records, options, upper);
                    last_upper = Some(upper);
                }

                records.push(Record::data((addr & 0xFFFF) as u16, chunk.to_vec()));

                addr += take as u64;
                data = rest;
            }
        }

        if let Some((cs, ip)) = meta.start_segment {
            records.push(Record::start_segment_address(cs, ip));
        }
        if let Some(eip) = meta.start_linear_address {
            records.push(Record::start_linear_address(eip));
        }

        records.push(Record::eof());
        Ok(records)
    }

    fn apply_records(records: &[Record]) -> Result<(Memory, Meta), Error> {
        let mut memory = Memory::new();
        let mut meta = Meta::default();
        let mut base: u64 = 0;

        for record in records {
            match record.tag {
                Tag::Data => {
                    memory.write(base + record.address as u64, &record.data)?;
                }
                Tag::ExtendedSegmentAddress => {
                    let seg = u16::from_be_bytes([record.data[0], record.data[1]]);
                    base = (seg as u64) << 4;
                }
                Tag::ExtendedLinearAddress => {
                    let upper = u16::from_be_bytes([record.data[0], record.data[1]]);
                    base = (upper as u64) << 16;
                }
                Tag::StartSegmentAddress => {
                    let cs = u16::from_be_bytes([record.data[0], record.data[1]]);
                    let ip = u16::from_be_bytes([record.data[2], record.data[3]]);
                    meta.start_segment = Some((cs, ip));
                }
                Tag::StartLinearAddress => {
                    meta.start_linear_address =
                        Some(u32::from_be_bytes([record.data[0], record.data[1], record.data[2], record.data[3]]));
                }
                Tag::Eof => break,
            }
        }

        Ok((memory, meta))
    }

    fn validate_records(records: &[Record], data_ordering: bool) -> Result<(), Error> {
        for record in records {
            record.validate(true, true)?;
        }

        match records.last() {
            Some(last) if last.is_file_termination() => {}
            _ => return Err(Error::MisplacedTermination),
        }

        if records.iter().filter(|record| record.is_file_termination()).count() != 1 {
            return Err(Error::MisplacedTermination);
        }

        if data_ordering {
            let mut base: u64 = 0;
            let mut last_addr: Option<u64> = None;

            for (index, record) in records.iter().enumerate() {
                match record.tag {
                    Tag::ExtendedSegmentAddress => {
                        base = (u16::from_be_bytes([record.data[0], record.data[1]]) as u64) << 4;
                    }
                    Tag::ExtendedLinearAddress => {
                        base = (u16::from_be_bytes([record.data[0], record.data[1]]) as u64) << 16;
                    }
                    Tag::Data => {
                        let absolute = base + record.address as u64;
                        if let Some(previous) = last_addr {
                            if absolute < previous {
                                return Err(Error::UnorderedRecords(index));
                            }
                        }
                        last_addr = Some(absolute + record.data.len() as u64);
                    }
                    _ => {}
                }
            }
        }

        Ok(())
    }
}

fn push_extended(records: &mut Vec<Record>, options: &UpdateOptions, upper: u16) {
    if options.use_esa {
        records.push(Record::extended_segment_address(upper));
    } else {
        records.push(Record::extended_linear_address(upper));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_round_trip_matches_literal_bytes() {
        let mut file = File::from_bytes(b"Hello, World!".to_vec(), 0x1234);

        let serialized = file.serialize(Ending::Crlf).unwrap();
        assert_eq!(
            serialized,
            b":0D12340048656C6C6F2C20576F726C642144\r\n:00000001FF\r\n".to_vec()
        );

        let mut parsed = File::parse(&serialized, &ParseOptions::default()).unwrap();
        assert_eq!(parsed.read(0x1234, 0x1234 + 13, None).unwrap(), b"Hello, World!");
    }

    #[test]
    fn test_extended_linear_address_emitted_on_boundary_cross() {
        let mut memory = Memory::new();
        memory.write(0x1_0000 - 2, b"ABCD").unwrap();

        let records = Codec::update_records(&memory, &Meta::default(), &UpdateOptions::default()).unwrap();

        assert!(records.iter().any(|record| record.tag == Tag::ExtendedLinearAddress));

        let (applied, _) = Codec::apply_records(&records).unwrap();
        assert_eq!(applied.read(0x1_0000 - 2, 0x1_0000 + 2, None).unwrap(), b"ABCD");
    }

    #[test]
    fn test_validate_rejects_checksum_mutation() {
        let mut file = File::from_bytes(b"hi".to_vec(), 0);
        let mut bytes = file.serialize(Ending::Crlf).unwrap();

        let checksum_index = bytes.iter().position(|&b| b == b'\r').unwrap() - 2;
        bytes[checksum_index] = b'0';
        bytes[checksum_index + 1] = b'0';

        assert!(File::parse(&bytes, &ParseOptions::default()).is_err());
    }

    #[test]
    fn test_ignore_errors_skips_malformed_lines() {
        let input = b":0D12340048656C6C6F2C20576F726C642144\r\nnotahexline\r\n:00000001FF\r\n";
        let options = ParseOptions { ignore_errors: true, ignore_after_termination: false };

        let parsed = File::parse(input, &options).unwrap();
        assert_eq!(parsed.meta(), &Meta::default());
    }
}
