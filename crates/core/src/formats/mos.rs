//! MOS Technology papertape: `;CC AAAA D…D SSSS`, an end record whose
//! address field holds the record count, and optional NUL/XOFF framing
//! tolerated on parse and controlled at emit time via [`Meta`].

use hexrec_errors::Error;
use hexrec_memory::Memory;
use hexrec_parser::{hexlify, Ending};

use crate::file::{FormatRecord, RecordFile};
use crate::formats::support::{ending_bytes, is_whitespace, lines, take_hex_bytes, take_hex_field, trim_junk};
use crate::record::{Record as RecordTrait, TokenBuilder, Tokens};

/// A MOS papertape record's kind, distinguished solely by a zero byte count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tag {
    /// Carries memory contents at `address`.
    Data,
    /// Ends the file; `address` carries the total data-record count.
    End,
}

/// One MOS papertape record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    tag: Tag,
    address: u16,
    data: Vec<u8>,
    before: Vec<u8>,
    after: Vec<u8>,
}

impl Record {
    /// Creates a data record.
    pub fn data(address: u16, data: Vec<u8>) -> Self {
        Self { tag: Tag::Data, address, data, before: Vec::new(), after: Vec::new() }
    }

    /// Creates the end-of-file record, carrying the total record count.
    pub fn end(record_count: u16) -> Self {
        Self { tag: Tag::End, address: record_count, data: Vec::new(), before: Vec::new(), after: Vec::new() }
    }

    fn checksum16(&self) -> u16 {
        let sum: u32 = self.data.len() as u32
            + (self.address >> 8) as u32
            + (self.address & 0xFF) as u32
            + self.data.iter().map(|&b| b as u32).sum::<u32>();
        (sum % 0x1_0000) as u16
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
        self.tag == Tag::End
    }

    fn compute_count(&self) -> Option<u64> {
        Some(self.data.len() as u64)
    }

    fn compute_checksum(&self) -> Option<u64> {
        Some(self.checksum16() as u64)
    }

    fn validate(&self, check_count: bool, check_checksum: bool) -> Result<(), Error> {
        if self.data.len() > 255 {
            return Err(Error::FieldOverflow(self.data.len() as u64));
        }

        if check_count && self.tag == Tag::End && !self.data.is_empty() {
            return Err(Error::FieldOverflow(self.data.len() as u64));
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
        tokens.begin = builder.push(b";");
        tokens.count = builder.push(hexlify(&[self.data.len() as u8], "", true).as_bytes());
        tokens.address = builder.push(hexlify(&self.address.to_be_bytes(), "", true).as_bytes());
        tokens.data = builder.push(hexlify(&self.data, "", true).as_bytes());
        tokens.checksum = builder.push(hexlify(&self.checksum16().to_be_bytes(), "", true).as_bytes());
        tokens.after = builder.push(&self.after);
        tokens.end = builder.push(ending_bytes(ending));

        (builder.finish(), tokens)
    }
}

fn is_padding(bytes: &[u8]) -> bool {
    !bytes.is_empty() && bytes.iter().all(|&b| b == 0 || b == 0x13)
}

fn parse_record(line: &[u8]) -> Result<Record, Error> {
    let (before, core, after) = trim_junk(line)?;

    if core.first() != Some(&b';') {
        return Err(Error::Syntax(0));
    }

    let mut pos = 1;
    let count = take_hex_field(core, &mut pos, 2)? as usize;
    let address = take_hex_field(core, &mut pos, 4)? as u16;
    let data = take_hex_bytes(core, &mut pos, count)?;
    let checksum = take_hex_field(core, &mut pos, 4)? as u16;

    if pos != core.len() {
        return Err(Error::Syntax(0));
    }

    let tag = if count == 0 { Tag::End } else { Tag::Data };
    let record = Record { tag, address, data, before: before.to_vec(), after: after.to_vec() };

    if checksum != record.checksum16() {
        return Err(Error::ChecksumMismatch(0, checksum as u64, record.checksum16() as u64));
    }

    record.validate(true, true)?;
    Ok(record)
}

/// File-level metadata controlling optional emit-time framing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Meta {
    /// Number of NUL bytes to append after the end record on emit.
    pub pad_nuls: usize,
    /// Whether to append a trailing XOFF (0x13) byte on emit.
    pub emit_xoff: bool,
}

/// Options accepted by [`Codec::parse`][FormatRecord::parse].
#[derive(Debug, Clone, Default)]
pub struct ParseOptions {
    /// Skip malformed records instead of aborting on the first one.
    pub ignore_errors: bool,
    /// Tolerate arbitrary trailing bytes after the end record (beyond the
    /// NUL/XOFF padding, which is always tolerated).
    pub ignore_after_termination: bool,
}

/// Options accepted by [`Codec::update_records`][FormatRecord::update_records].
#[derive(Debug, Clone)]
pub struct UpdateOptions {
    /// Maximum data bytes per emitted data record.
    pub maxdatalen: Option<usize>,
}

impl Default for UpdateOptions {
    fn default() -> Self {
        Self { maxdatalen: Some(16) }
    }
}

/// The MOS papertape codec.
pub struct Codec;

/// A MOS papertape file.
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
            if line.is_empty() || is_whitespace(line) || is_padding(line) {
                continue;
            }

            if terminated {
                if options.ignore_after_termination {
                    continue;
                }
                return Err(Error::MisplacedTermination);
            }

            match parse_record(line) {
                Ok(record) => {
                    if record.tag == Tag::End {
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

        Ok((records, Meta::default()))
    }

    fn serialize(records: &[Record], meta: &Meta, ending: Ending) -> Vec<u8> {
        let mut out = Vec::new();
        for record in records {
            out.extend_from_slice(&record.to_bytestr(ending));
        }

        out.extend(std::iter::repeat(0u8).take(meta.pad_nuls));
        if meta.emit_xoff {
            out.push(0x13);
        }

        out
    }

    fn update_records(memory: &Memory, _meta: &Meta, options: &UpdateOptions) -> Result<Vec<Record>, Error> {
        let maxdatalen = options.maxdatalen.unwrap_or(16).max(1);
        let mut records = Vec::new();

        for block in memory.to_blocks() {
            for (index, chunk) in block.data.chunks(maxdatalen).enumerate() {
                let address = block.start + (index * maxdatalen) as u64;
                if address > u16::MAX as u64 {
                    return Err(Error::AddressOverflow(address));
                }
                records.push(Record::data(address as u16, chunk.to_vec()));
            }
        }

        let record_count = records.len() as u16;
        records.push(Record::end(record_count));

        Ok(records)
    }

    fn apply_records(records: &[Record]) -> Result<(Memory, Meta), Error> {
        let mut memory = Memory::new();

        for record in records {
            if record.tag == Tag::Data {
                memory.write(record.address as u64, &record.data)?;
            }
        }

        Ok((memory, Meta::default()))
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

        let data_count = records.iter().filter(|record| record.tag == Tag::Data).count() as u64;
        if let Some(end) = records.iter().find(|record| record.tag == Tag::End) {
            if end.address as u64 != data_count {
                return Err(Error::CountMismatch(0, end.address as u64, data_count));
            }
        }

        if data_ordering {
            let mut last_addr: Option<u64> = None;
            for (index, record) in records.iter().enumerate() {
                if record.tag != Tag::Data {
                    continue;
                }
                let address = record.address as u64;
                if let Some(previous) = last_addr {
                    if address < previous {
                        return Err(Error::UnorderedRecords(index));
                    }
                }
                last_addr = Some(address + record.data.len() as u64);
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_and_end_match_literal_bytes() {
        let mut file = File::from_bytes(b"abc".to_vec(), 0x1234);

        let serialized = file.serialize(Ending::Crlf).unwrap();
        assert_eq!(serialized, b";031234616263016F\r\n;0000010001\r\n".to_vec());
    }

    #[test]
    fn test_trailing_padding_tolerated() {
        let mut file = File::from_bytes(b"abc".to_vec(), 0x1234);
        *file.meta_mut() = Meta { pad_nuls: 6, emit_xoff: true };

        let serialized = file.serialize(Ending::Crlf).unwrap();
        let mut parsed = File::parse(&serialized, &ParseOptions::default()).unwrap();

        assert_eq!(parsed.read(0x1234, 0x1237, None).unwrap(), b"abc");
    }

    #[test]
    fn test_stray_non_semicolon_line_rejected() {
        let bad = b"this is not a record\r\n;0000010001\r\n";
        assert!(File::parse(bad, &ParseOptions::default()).is_err());

        let options = ParseOptions { ignore_errors: true, ignore_after_termination: false };
        assert!(File::parse(bad, &options).is_ok());
    }
}
