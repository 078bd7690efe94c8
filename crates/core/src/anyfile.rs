//! A runtime-dispatched wrapper over every [`crate::formats`] file type, so
//! a caller that only knows a [`Format`] value (not a concrete codec type)
//! can still load, edit, and save a file. This is the trait-object-style
//! variant dispatch the core crate otherwise avoids in favor of generics;
//! it exists solely for callers (the CLI, chiefly) that pick a format at
//! run time from a path or a flag.

use hexrec_errors::Error;
use hexrec_memory::Memory;
use hexrec_parser::Ending;

use crate::formats;
use crate::record::Record as RecordTrait;
use crate::registry::Format;

/// One file, of whichever format [`Format`] names.
pub enum AnyFile {
    /// An Intel HEX file.
    #[cfg(feature = "ihex")]
    Ihex(formats::ihex::File),
    /// A Motorola S-Record file.
    #[cfg(feature = "srec")]
    Srec(formats::srec::File),
    /// A Tektronix extended HEX file.
    #[cfg(feature = "tektronix")]
    Tektronix(formats::tektronix::File),
    /// A MOS Technology papertape file.
    #[cfg(feature = "mos")]
    Mos(formats::mos::File),
    /// A TI-TXT file.
    #[cfg(feature = "titxt")]
    Titxt(formats::titxt::File),
    /// An AVR ROM file.
    #[cfg(feature = "avr")]
    Avr(formats::avr::File),
    /// A raw binary file.
    #[cfg(feature = "raw")]
    Raw(formats::raw::File),
}

/// Dispatches a method call with identical signature/return type across
/// every enabled [`AnyFile`] variant, forwarding to the wrapped concrete
/// file. Every `RecordFile<F>` exposes the same inherent methods for any
/// `F`, so the call itself never needs format-specific logic — only the
/// match arm selecting which field to call it on does.
macro_rules! dispatch {
    ($self:expr, $method:ident $(, $arg:expr )* $(,)?) => {
        match $self {
            #[cfg(feature = "ihex")]
            AnyFile::Ihex(file) => file.$method($($arg),*),
            #[cfg(feature = "srec")]
            AnyFile::Srec(file) => file.$method($($arg),*),
            #[cfg(feature = "tektronix")]
            AnyFile::Tektronix(file) => file.$method($($arg),*),
            #[cfg(feature = "mos")]
            AnyFile::Mos(file) => file.$method($($arg),*),
            #[cfg(feature = "titxt")]
            AnyFile::Titxt(file) => file.$method($($arg),*),
            #[cfg(feature = "avr")]
            AnyFile::Avr(file) => file.$method($($arg),*),
            #[cfg(feature = "raw")]
            AnyFile::Raw(file) => file.$method($($arg),*),
        }
    };
}

impl AnyFile {
    /// This file's format.
    pub fn format(&self) -> Format {
        match self {
            #[cfg(feature = "ihex")]
            AnyFile::Ihex(_) => Format::Ihex,
            #[cfg(feature = "srec")]
            AnyFile::Srec(_) => Format::Srec,
            #[cfg(feature = "tektronix")]
            AnyFile::Tektronix(_) => Format::Tektronix,
            #[cfg(feature = "mos")]
            AnyFile::Mos(_) => Format::Mos,
            #[cfg(feature = "titxt")]
            AnyFile::Titxt(_) => Format::Titxt,
            #[cfg(feature = "avr")]
            AnyFile::Avr(_) => Format::Avr,
            #[cfg(feature = "raw")]
            AnyFile::Raw(_) => Format::Raw,
        }
    }

    /// Parses `bytes` as `format`, using that format's default parse
    /// options.
    pub fn load(format: Format, bytes: &[u8]) -> Result<Self, Error> {
        Ok(match format {
            #[cfg(feature = "ihex")]
            Format::Ihex => AnyFile::Ihex(formats::ihex::File::parse(bytes, &Default::default())?),
            #[cfg(feature = "srec")]
            Format::Srec => AnyFile::Srec(formats::srec::File::parse(bytes, &Default::default())?),
            #[cfg(feature = "tektronix")]
            Format::Tektronix => AnyFile::Tektronix(formats::tektronix::File::parse(bytes, &Default::default())?),
            #[cfg(feature = "mos")]
            Format::Mos => AnyFile::Mos(formats::mos::File::parse(bytes, &Default::default())?),
            #[cfg(feature = "titxt")]
            Format::Titxt => AnyFile::Titxt(formats::titxt::File::parse(bytes, &Default::default())?),
            #[cfg(feature = "avr")]
            Format::Avr => AnyFile::Avr(formats::avr::File::parse(bytes, &Default::default())?),
            #[cfg(feature = "raw")]
            Format::Raw => AnyFile::Raw(formats::raw::File::parse(bytes, &Default::default())?),
        })
    }

    /// Builds a file of `format` directly from sparse memory, with no
    /// records parsed — used by the CLI's `convert`/`merge` commands (and
    /// every editing command) to re-target a different output format than
    /// the one a file was loaded as.
    pub fn from_memory(format: Format, memory: Memory) -> Self {
        match format {
            #[cfg(feature = "ihex")]
            Format::Ihex => AnyFile::Ihex(formats::ihex::File::from_memory(memory)),
            #[cfg(feature = "srec")]
            Format::Srec => AnyFile::Srec(formats::srec::File::from_memory(memory)),
            #[cfg(feature = "tektronix")]
            Format::Tektronix => AnyFile::Tektronix(formats::tektronix::File::from_memory(memory)),
            #[cfg(feature = "mos")]
            Format::Mos => AnyFile::Mos(formats::mos::File::from_memory(memory)),
            #[cfg(feature = "titxt")]
            Format::Titxt => AnyFile::Titxt(formats::titxt::File::from_memory(memory)),
            #[cfg(feature = "avr")]
            Format::Avr => AnyFile::Avr(formats::avr::File::from_memory(memory)),
            #[cfg(feature = "raw")]
            Format::Raw => AnyFile::Raw(formats::raw::File::from_memory(memory)),
        }
    }

    /// Serializes this file with `ending`, deriving records from memory
    /// first if unset.
    pub fn serialize(&mut self, ending: Ending) -> Result<Vec<u8>, Error> {
        dispatch!(self, serialize, ending)
    }

    /// Returns the sparse memory, deriving it from records if unset.
    pub fn memory(&mut self) -> Result<&Memory, Error> {
        dispatch!(self, memory)
    }

    /// Reads `[start, endex)`, substituting `fill` for any hole.
    pub fn read(&mut self, start: u64, endex: u64, fill: Option<u8>) -> Result<Vec<u8>, Error> {
        dispatch!(self, read, start, endex, fill)
    }

    /// Replaces bytes at `[address, address + data.len())`.
    pub fn write(&mut self, address: u64, data: &[u8]) -> Result<(), Error> {
        dispatch!(self, write, address, data)
    }

    /// Deletes bytes in `[start, endex)`, leaving a hole.
    pub fn clear(&mut self, start: u64, endex: u64) -> Result<(), Error> {
        dispatch!(self, clear, start, endex)
    }

    /// Deletes bytes in `[start, endex)` and shifts trailing content down.
    pub fn delete(&mut self, start: u64, endex: u64) -> Result<(), Error> {
        dispatch!(self, delete, start, endex)
    }

    /// Writes `pattern` across `[start, endex)`, overwriting existing
    /// content.
    pub fn fill(&mut self, start: u64, endex: u64, pattern: &[u8]) -> Result<(), Error> {
        dispatch!(self, fill, start, endex, pattern)
    }

    /// Writes `pattern` only into holes within `[start, endex)`.
    pub fn flood(&mut self, start: u64, endex: u64, pattern: &[u8]) -> Result<(), Error> {
        dispatch!(self, flood, start, endex, pattern)
    }

    /// Removes all content outside `[start, endex)`.
    pub fn crop(&mut self, start: u64, endex: u64) -> Result<(), Error> {
        dispatch!(self, crop, start, endex)
    }

    /// Adds `amount` to every block's start address.
    pub fn shift(&mut self, amount: i64) -> Result<(), Error> {
        dispatch!(self, shift, amount)
    }

    /// Overlays `other`'s memory onto this file's memory.
    pub fn merge(&mut self, other: &Memory, clear: bool) -> Result<(), Error> {
        dispatch!(self, merge, other, clear)
    }

    /// Validates every record (`check_count`/`check_checksum`) and the
    /// sequence-level invariants (`data_ordering`).
    pub fn validate(&mut self, check_count: bool, check_checksum: bool, data_ordering: bool) -> Result<(), Error> {
        macro_rules! validate_variant {
            ($file:expr) => {{
                let records = $file.records(&Default::default())?.to_vec();
                for record in &records {
                    record.validate(check_count, check_checksum)?;
                }
                $file.validate_records(data_ordering)
            }};
        }

        match self {
            #[cfg(feature = "ihex")]
            AnyFile::Ihex(file) => validate_variant!(file),
            #[cfg(feature = "srec")]
            AnyFile::Srec(file) => validate_variant!(file),
            #[cfg(feature = "tektronix")]
            AnyFile::Tektronix(file) => validate_variant!(file),
            #[cfg(feature = "mos")]
            AnyFile::Mos(file) => validate_variant!(file),
            #[cfg(feature = "titxt")]
            AnyFile::Titxt(file) => validate_variant!(file),
            #[cfg(feature = "avr")]
            AnyFile::Avr(file) => validate_variant!(file),
            #[cfg(feature = "raw")]
            AnyFile::Raw(file) => validate_variant!(file),
        }
    }

    /// The S-Record S0 header payload, when this file is a Motorola
    /// S-Record file with one.
    #[cfg(feature = "srec")]
    pub fn srec_header(&mut self) -> Result<Option<Vec<u8>>, Error> {
        match self {
            AnyFile::Srec(file) => Ok(file.meta().header.clone()),
            #[allow(unreachable_patterns)]
            _ => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_reports_its_own_format() {
        let file = AnyFile::load(Format::Raw, b"abc").unwrap();
        assert_eq!(file.format(), Format::Raw);
    }

    #[test]
    fn test_edit_and_serialize_round_trips() {
        let mut file = AnyFile::load(Format::Raw, b"").unwrap();
        file.write(0, b"abc").unwrap();
        assert_eq!(file.read(0, 3, None).unwrap(), b"abc");
    }

    #[test]
    fn test_from_memory_retargets_format() {
        let mut ihex = formats::ihex::File::from_bytes(b"ABC".to_vec(), 0);
        let serialized = ihex.serialize(hexrec_parser::Ending::Crlf).unwrap();

        let mut loaded = AnyFile::load(Format::Ihex, &serialized).unwrap();
        let memory = loaded.memory().unwrap().clone();

        let mut raw = AnyFile::from_memory(Format::Raw, memory);
        assert_eq!(raw.format(), Format::Raw);
        assert_eq!(raw.read(0, 3, None).unwrap(), b"ABC");
    }
}
