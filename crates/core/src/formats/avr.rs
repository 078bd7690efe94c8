//! AVR ROM: `WWWWWW:DDDD`, a 24-bit word address paired with one 16-bit
//! word of data, hexlified in its original byte order. No count, checksum,
//! or terminator field exists in this format.

use hexrec_errors::Error;
use hexrec_memory::Memory;
use hexrec_parser::{hexlify, Ending};

use crate::file::{FormatRecord, RecordFile};
use crate::formats::support::{ending_bytes, is_whitespace, lines, take_hex_bytes, take_hex_field, trim_junk};
use crate::record::{Record as RecordTrait, TokenBuilder, Tokens};

/// AVR has exactly one record kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tag {
    /// Carries one 16-bit word of memory contents.
    Data,
}

/// One AVR record: a word address and its two data bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    address: u32,
    data: Vec<u8>,
    before: Vec<u8>,
    after: Vec<u8>,
}

impl Record {
    /// Creates a record for word address `address` (0..2^24), carrying
    /// exactly two data bytes.
    pub fn data(address: u32, data: Vec<u8>) -> Self {
        Self { address, data, before: Vec::new(), after: Vec::new() }
    }
}

impl RecordTrait for Record {
    type Tag = Tag;

    fn tag(&self) -> Tag {
        Tag::Data
    }

    fn address(&self) -> u64 {
        self.address as u64
    }

    fn data(&self) -> &[u8] {
        &self.data
    }

    fn is_data(&self) -> bool {
        true
    }

    fn is_file_termination(&self) -> bool {
        false
    }

    fn compute_count(&self) -> Option<u64> {
        None
    }

    fn compute_checksum(&self) -> Option<u64> {
        None
    }

    fn validate(&self, _check_count: bool, _check_checksum: bool) -> Result<(), Error> {
        if self.data.len() != 2 {
            return Err(Error::WordMisalignment(self.address as u64));
        }
        if self.address >= 1 << 24 {
            return Err(Error::AddressOverflow(self.address as u64));
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
        tokens.address = builder.push(format!("{:06X}", self.address).as_bytes());
        tokens.begin = builder.push(b":");
        tokens.data = builder.push(hexlify(&self.data, "", true).as_bytes());
        tokens.after = builder.push(&self.after);
        tokens.end = builder.push(ending_bytes(ending));

        (builder.finish(), tokens)
    }
}

fn parse_record(line: &[u8]) -> Result<Record, Error> {
    let (before, core, after) = trim_junk(line)?;

    let mut pos = 0;
    let address = take_hex_field(core, &mut pos, 6)? as u32;

    if core.get(pos) != Some(&b':') {
        return Err(Error::Syntax(pos));
    }
    pos += 1;

    let data = take_hex_bytes(core, &mut pos, 2)?;

    if pos != core.len() {
        return Err(Error::Syntax(pos));
    }

    let record = Record { address, data, before: before.to_vec(), after: after.to_vec() };
    record.validate(true, true)?;
    Ok(record)
}

/// AVR carries no file-level metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Meta;

/// Options accepted by [`Codec::parse`][FormatRecord::parse].
#[derive(Debug, Clone, Default)]
pub struct ParseOptions {
    /// Skip malformed lines instead of aborting on the first one.
    pub ignore_errors: bool,
}

/// AVR has no emit-time knobs: each record is always one 16-bit word, so
/// there is nothing for `UpdateOptions` to configure.
#[derive(Debug, Clone, Default)]
pub struct UpdateOptions;

/// The AVR ROM codec.
pub struct Codec;

/// An AVR ROM file.
pub type File = RecordFile<Codec>;

impl FormatRecord for Codec {
    type Record = Record;
    type Meta = Meta;
    type ParseOptions = ParseOptions;
    type UpdateOptions = UpdateOptions;

    fn parse(bytes: &[u8], options: &ParseOptions) -> Result<(Vec<Record>, Meta), Error> {
        let mut records = Vec::new();

        for (line, _ending) in lines(bytes) {
            if line.is_empty() || is_whitespace(line) {
                continue;
            }

            match parse_record(line) {
                Ok(record) => records.push(record),
                Err(error) => {
                    if options.ignore_errors {
                        continue;
                    }
                    return Err(error);
                }
            }
        }

        Ok((records, Meta))
    }

    fn serialize(records: &[Record], _meta: &Meta, ending: Ending) -> Vec<u8> {
        let mut out = Vec::new();
        for record in records {
            out.extend_from_slice(&record.to_bytestr(ending));
        }
        out
    }

    fn update_records(memory: &Memory, _meta: &Meta, _options: &UpdateOptions) -> Result<Vec<Record>, Error> {
        let mut records = Vec::new();

        for block in memory.to_blocks() {
            if block.start % 2 != 0 {
                return Err(Error::WordMisalignment(block.start));
            }
            if block.data.len() % 2 != 0 {
                return Err(Error::WordMisalignment(block.start + block.data.len() as u64));
            }

            for (index, chunk) in block.data.chunks(2).enumerate() {
                let byte_address = block.start + (index * 2) as u64;
                let word_address = byte_address / 2;
                if word_address >= 1 << 24 {
                    return Err(Error::AddressOverflow(word_address));
                }
                records.push(Record::data(word_address as u32, chunk.to_vec()));
            }
        }

        Ok(records)
    }

    fn apply_records(records: &[Record]) -> Result<(Memory, Meta), Error> {
        let mut memory = Memory::new();

        for record in records {
            let byte_address = record.address as u64 * 2;
            memory.write(byte_address, &record.data)?;
        }

        Ok((memory, Meta))
    }

    fn validate_records(records: &[Record], data_ordering: bool) -> Result<(), Error> {
        for record in records {
            record.validate(true, true)?;
        }

        if data_ordering {
            let mut last_address: Option<u32> = None;
            for (index, record) in records.iter().enumerate() {
                if let Some(previous) = last_address {
                    if record.address <= previous {
                        return Err(Error::UnorderedRecords(index));
                    }
                }
                last_address = Some(record.address);
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_record_matches_literal_bytes() {
        let mut file = File::from_bytes(vec![0xAB, 0xCD], 0xCA8642);

        let serialized = file.serialize(Ending::Crlf).unwrap();
        assert_eq!(serialized, b"654321:ABCD\r\n".to_vec());
    }

    #[test]
    fn test_round_trip_recovers_memory() {
        let mut file = File::from_bytes(vec![0xAB, 0xCD, 0x12, 0x34], 0x100);
        let serialized = file.serialize(Ending::Crlf).unwrap();

        let mut parsed = File::parse(&serialized, &ParseOptions::default()).unwrap();
        assert_eq!(parsed.read(0x100, 0x104, None).unwrap(), vec![0xAB, 0xCD, 0x12, 0x34]);
    }

    #[test]
    fn test_misaligned_start_rejected() {
        let mut file = File::from_bytes(vec![0xAB, 0xCD], 0x101);
        assert!(file.serialize(Ending::Crlf).is_err());
    }

    #[test]
    fn test_odd_length_rejected() {
        let mut file = File::from_bytes(vec![0xAB, 0xCD, 0xEF], 0x100);
        assert!(file.serialize(Ending::Crlf).is_err());
    }
}
