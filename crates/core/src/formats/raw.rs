//! Raw binary: a single record carrying the entire contiguous memory range,
//! with no textual framing at all — serialization is the bytes themselves.

use hexrec_errors::Error;
use hexrec_memory::Memory;
use hexrec_parser::Ending;

use crate::file::{FormatRecord, RecordFile};
use crate::record::{Record as RecordTrait, TokenBuilder, Tokens};

/// Raw binary has exactly one record kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tag {
    /// The whole file's contents.
    Data,
}

/// The file's entire contents, starting at `address`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    address: u64,
    data: Vec<u8>,
}

impl Record {
    /// Creates a record carrying `data` starting at `address`.
    pub fn data(address: u64, data: Vec<u8>) -> Self {
        Self { address, data }
    }
}

impl RecordTrait for Record {
    type Tag = Tag;

    fn tag(&self) -> Tag {
        Tag::Data
    }

    fn address(&self) -> u64 {
        self.address
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
        Ok(())
    }

    fn to_tokens(&self, _ending: Ending) -> (Vec<u8>, Tokens) {
        let mut builder = TokenBuilder::new();
        let mut tokens = Tokens::default();

        tokens.data = builder.push(&self.data);

        (builder.finish(), tokens)
    }
}

/// Raw binary carries no file-level metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Meta;

/// Options accepted by [`Codec::parse`][FormatRecord::parse].
#[derive(Debug, Clone)]
pub struct ParseOptions {
    /// Address assigned to the parsed bytes, since raw binary carries no
    /// address of its own.
    pub base_address: u64,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self { base_address: 0 }
    }
}

/// Raw binary has no emit-time knobs: the whole contiguous memory range is
/// always one record.
#[derive(Debug, Clone, Default)]
pub struct UpdateOptions;

/// The raw binary codec.
pub struct Codec;

/// A raw binary file.
pub type File = RecordFile<Codec>;

impl FormatRecord for Codec {
    type Record = Record;
    type Meta = Meta;
    type ParseOptions = ParseOptions;
    type UpdateOptions = UpdateOptions;

    fn parse(bytes: &[u8], options: &ParseOptions) -> Result<(Vec<Record>, Meta), Error> {
        let records = if bytes.is_empty() {
            Vec::new()
        } else {
            vec![Record::data(options.base_address, bytes.to_vec())]
        };

        Ok((records, Meta))
    }

    fn serialize(records: &[Record], _meta: &Meta, _ending: Ending) -> Vec<u8> {
        let mut out = Vec::new();
        for record in records {
            out.extend_from_slice(&record.data);
        }
        out
    }

    fn update_records(memory: &Memory, _meta: &Meta, _options: &UpdateOptions) -> Result<Vec<Record>, Error> {
        let blocks = memory.to_blocks();

        match blocks.len() {
            0 => Ok(Vec::new()),
            1 => {
                let block = &blocks[0];
                Ok(vec![Record::data(block.start, block.data.clone())])
            }
            _ => {
                let (start, endex) = memory.span().unwrap_or((0, 0));
                Err(Error::NonContiguousView(start, endex))
            }
        }
    }

    fn apply_records(records: &[Record]) -> Result<(Memory, Meta), Error> {
        let mut memory = Memory::new();

        for record in records {
            memory.write(record.address, &record.data)?;
        }

        Ok((memory, Meta))
    }

    fn validate_records(records: &[Record], data_ordering: bool) -> Result<(), Error> {
        if records.len() > 1 {
            return Err(Error::OverlappingRecords(1));
        }

        if data_ordering {
            if let Some(record) = records.first() {
                if record.address != 0 {
                    return Err(Error::AddressOverflow(record.address));
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialize_is_identity() {
        let mut file = File::from_bytes(b"Hello, World!".to_vec(), 0);

        let serialized = file.serialize(Ending::Eof).unwrap();
        assert_eq!(serialized, b"Hello, World!".to_vec());
    }

    #[test]
    fn test_round_trip_recovers_memory() {
        let mut file = File::from_bytes(b"abc".to_vec(), 0x1234);
        let serialized = file.serialize(Ending::Eof).unwrap();

        let options = ParseOptions { base_address: 0x1234 };
        let mut parsed = File::parse(&serialized, &options).unwrap();
        assert_eq!(parsed.read(0x1234, 0x1237, None).unwrap(), b"abc");
    }

    #[test]
    fn test_non_contiguous_memory_rejected() {
        let mut file = File::from_blocks([(0u64, b"abc".to_vec()), (0x100, b"xyz".to_vec())]);
        assert!(file.serialize(Ending::Eof).is_err());
    }

    #[test]
    fn test_start_at_zero_enforced() {
        let mut file = File::from_bytes(b"abc".to_vec(), 0x10);
        assert!(file.validate_records(true).is_err());
        assert!(file.validate_records(false).is_ok());
    }
}
