//! The dual `records ⇄ memory` representation every format's file type
//! shares, plus the [`FormatRecord`] contract a concrete codec implements so
//! [`RecordFile`] can move bytes ⇄ records ⇄ memory without knowing the
//! format's wire details.
//!
//! The "records" and "memory" sides are each an `Option`: `None` means
//! "unset, derive it from the other side on demand". This is the same
//! `{RecordsOnly, MemoryOnly, Both, Neither}` state the design calls for,
//! expressed as two `Option`s rather than a redundant explicit enum — the
//! four states are exactly the four combinations of `Option::None`/`Some`.

use hexrec_errors::Error;
use hexrec_memory::Memory;
use hexrec_parser::Ending;

use crate::record::Record;

/// Per-format hooks a concrete codec provides so [`RecordFile`] can parse,
/// serialize, and pivot between the records and memory sides.
///
/// A codec is a zero-sized marker type; all of its logic is free functions
/// taking and returning plain data, matching the "closed variant, not an
/// inheritance chain" dispatch the design favors.
pub trait FormatRecord {
    /// This format's concrete record type.
    type Record: Record;

    /// File-level metadata that isn't carried by any single record (e.g.
    /// Intel HEX's start-linear-address, S-Record's header bytes).
    type Meta: Default + Clone + PartialEq;

    /// Options accepted while parsing (`ignore_errors`,
    /// `ignore_after_termination`, and any format-specific knobs).
    type ParseOptions: Default + Clone;

    /// Options accepted while deriving records from memory (`maxdatalen`
    /// and any format-specific knobs).
    type UpdateOptions: Default + Clone;

    /// Parses a whole file's bytes into a record sequence and its metadata.
    fn parse(
        bytes: &[u8],
        options: &Self::ParseOptions,
    ) -> Result<(Vec<Self::Record>, Self::Meta), Error>;

    /// Serializes a record sequence (plus metadata, for formats whose framing
    /// depends on it) back into bytes.
    fn serialize(records: &[Self::Record], meta: &Self::Meta, ending: Ending) -> Vec<u8>;

    /// Derives a record sequence from sparse memory, the `update_records`
    /// direction of the records ⇄ memory pivot.
    fn update_records(
        memory: &Memory,
        meta: &Self::Meta,
        options: &Self::UpdateOptions,
    ) -> Result<Vec<Self::Record>, Error>;

    /// Derives sparse memory (and refreshed metadata) from a record
    /// sequence, the `apply_records` direction of the pivot.
    fn apply_records(records: &[Self::Record]) -> Result<(Memory, Self::Meta), Error>;

    /// Enforces the format's sequence-level invariants: ordering, overlap,
    /// terminator presence/position, and any format-specific rule.
    fn validate_records(records: &[Self::Record], data_ordering: bool) -> Result<(), Error>;
}

/// A file in one hex-record format: a pair `(records?, memory?)` kept in
/// sync, plus whatever file-level metadata the format carries.
#[derive(Debug, Clone)]
pub struct RecordFile<F: FormatRecord> {
    records: Option<Vec<F::Record>>,
    memory: Option<Memory>,
    meta: F::Meta,
}

impl<F: FormatRecord> RecordFile<F> {
    /// Creates an empty file: no records, an empty memory.
    pub fn new() -> Self {
        Self { records: None, memory: Some(Memory::new()), meta: F::Meta::default() }
    }

    /// Creates a file holding `data` as a single block starting at `offset`,
    /// with memory as the authoritative side.
    pub fn from_bytes(data: impl Into<Vec<u8>>, offset: u64) -> Self {
        Self::from_memory(Memory::from_bytes(data, offset))
    }

    /// Creates a file from a list of blocks, with memory as the
    /// authoritative side.
    pub fn from_blocks(blocks: impl IntoIterator<Item = (u64, Vec<u8>)>) -> Self {
        Self::from_memory(Memory::from_blocks(blocks))
    }

    /// Creates a file with `memory` as the authoritative side; `records` is
    /// unset until [`RecordFile::update_records`] or [`RecordFile::records`]
    /// is called.
    pub fn from_memory(memory: Memory) -> Self {
        Self { records: None, memory: Some(memory), meta: F::Meta::default() }
    }

    /// Creates a file with `records` (and `meta`) as the authoritative side;
    /// `memory` is unset until [`RecordFile::apply_records`] or
    /// [`RecordFile::memory`] is called.
    pub fn from_records(records: Vec<F::Record>, meta: F::Meta) -> Self {
        Self { records: Some(records), memory: None, meta }
    }

    /// Parses `bytes` into a file with `records` as the authoritative side.
    pub fn parse(bytes: &[u8], options: &F::ParseOptions) -> Result<Self, Error> {
        let (records, meta) = F::parse(bytes, options)?;
        Ok(Self { records: Some(records), memory: None, meta })
    }

    /// Serializes this file's records, lazily deriving them from memory with
    /// default update options if unset.
    pub fn serialize(&mut self, ending: Ending) -> Result<Vec<u8>, Error> {
        self.records(&F::UpdateOptions::default())?;
        Ok(F::serialize(self.records.as_ref().unwrap(), &self.meta, ending))
    }

    /// Returns the record sequence, deriving it from memory (with
    /// `update_options`) if unset.
    pub fn records(&mut self, update_options: &F::UpdateOptions) -> Result<&[F::Record], Error> {
        if self.records.is_none() {
            self.update_records(update_options)?;
        }

        Ok(self.records.as_ref().unwrap())
    }

    /// Returns the sparse memory, deriving it from records (via
    /// [`FormatRecord::apply_records`]) if unset.
    pub fn memory(&mut self) -> Result<&Memory, Error> {
        if self.memory.is_none() {
            self.apply_records()?;
        }

        Ok(self.memory.as_ref().unwrap())
    }

    /// Rebuilds `records` from `memory` with the format's rules. Leaves
    /// `memory` untouched.
    pub fn update_records(&mut self, options: &F::UpdateOptions) -> Result<(), Error> {
        let memory = self.memory()?;
        let records = F::update_records(memory, &self.meta, options)?;
        self.records = Some(records);
        Ok(())
    }

    /// Rebuilds `memory` (and `meta`) from `records` with the format's
    /// rules. Leaves `records` untouched.
    pub fn apply_records(&mut self) -> Result<(), Error> {
        let empty = Vec::new();
        let records = self.records.as_ref().unwrap_or(&empty);
        let (memory, meta) = F::apply_records(records)?;
        self.memory = Some(memory);
        self.meta = meta;
        Ok(())
    }

    /// Discards `records`; `memory` becomes the sole authoritative side.
    pub fn discard_records(&mut self) {
        self.records = None;
    }

    /// Discards `memory`; `records` becomes the sole authoritative side.
    pub fn discard_memory(&mut self) {
        self.memory = None;
    }

    /// Enforces the format's sequence-level invariants on the current
    /// records (deriving them from memory first, with default update
    /// options, if unset).
    pub fn validate_records(&mut self, data_ordering: bool) -> Result<(), Error> {
        self.records(&F::UpdateOptions::default())?;
        F::validate_records(self.records.as_ref().unwrap(), data_ordering)
    }

    /// This file's format-specific metadata.
    pub fn meta(&self) -> &F::Meta {
        &self.meta
    }

    /// A mutable handle to this file's format-specific metadata.
    pub fn meta_mut(&mut self) -> &mut F::Meta {
        &mut self.meta
    }

    fn invalidate_records_after<T>(&mut self, result: Result<T, Error>) -> Result<T, Error> {
        if result.is_ok() {
            self.records = None;
        }
        result
    }

    /// Replaces bytes at `[address, address + data.len())`. Invalidates
    /// `records`.
    pub fn write(&mut self, address: u64, data: &[u8]) -> Result<(), Error> {
        self.memory()?;
        let result = self.memory.as_mut().unwrap().write(address, data);
        self.invalidate_records_after(result)
    }

    /// Deletes bytes in `[start, endex)`, leaving a hole. Invalidates
    /// `records`.
    pub fn clear(&mut self, start: u64, endex: u64) -> Result<(), Error> {
        self.memory()?;
        let result = self.memory.as_mut().unwrap().clear(start, endex);
        self.invalidate_records_after(result)
    }

    /// Deletes bytes in `[start, endex)` and shifts trailing content down.
    /// Invalidates `records`.
    pub fn delete(&mut self, start: u64, endex: u64) -> Result<(), Error> {
        self.memory()?;
        let result = self.memory.as_mut().unwrap().delete(start, endex);
        self.invalidate_records_after(result)
    }

    /// Writes `pattern` across `[start, endex)`, overwriting existing
    /// content. Invalidates `records`.
    pub fn fill(&mut self, start: u64, endex: u64, pattern: &[u8]) -> Result<(), Error> {
        self.memory()?;
        let result = self.memory.as_mut().unwrap().fill(start, endex, pattern);
        self.invalidate_records_after(result)
    }

    /// Writes `pattern` only into holes within `[start, endex)`. Invalidates
    /// `records`.
    pub fn flood(&mut self, start: u64, endex: u64, pattern: &[u8]) -> Result<(), Error> {
        self.memory()?;
        let result = self.memory.as_mut().unwrap().flood(start, endex, pattern);
        self.invalidate_records_after(result)
    }

    /// Removes all content outside `[start, endex)`. Invalidates `records`.
    pub fn crop(&mut self, start: u64, endex: u64) -> Result<(), Error> {
        self.memory()?;
        let result = self.memory.as_mut().unwrap().crop(start, endex);
        self.invalidate_records_after(result)
    }

    /// Adds `amount` to every block's start address. Invalidates `records`.
    pub fn shift(&mut self, amount: i64) -> Result<(), Error> {
        self.memory()?;
        let result = self.memory.as_mut().unwrap().shift(amount);
        self.invalidate_records_after(result)
    }

    /// Overlays `other`'s memory onto this file's memory. Invalidates
    /// `records`.
    pub fn merge(&mut self, other: &Memory, clear: bool) -> Result<(), Error> {
        self.memory()?;
        let result = self.memory.as_mut().unwrap().merge(other, clear);
        self.invalidate_records_after(result)
    }

    /// A read-only, borrowed, contiguous view over `[start, endex)`.
    pub fn view(&mut self, start: u64, endex: u64) -> Result<&[u8], Error> {
        self.memory()?;
        self.memory.as_ref().unwrap().view(start, endex)
    }

    /// Reads `[start, endex)`, substituting `fill` for any hole.
    pub fn read(&mut self, start: u64, endex: u64, fill: Option<u8>) -> Result<Vec<u8>, Error> {
        self.memory()?;
        self.memory.as_ref().unwrap().read(start, endex, fill)
    }
}

impl<F: FormatRecord> Default for RecordFile<F> {
    fn default() -> Self {
        Self::new()
    }
}
