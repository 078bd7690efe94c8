//! `hexrec-core` reads and writes the hexadecimal record formats used in
//! embedded firmware workflows: Intel HEX, Motorola S-Record, Tektronix
//! extended HEX, MOS Technology papertape, TI-TXT, AVR ROM, and raw binary.
//!
//! Every format shares two contracts: a [`Record`][record::Record] (one
//! framed line) and a [`File`][file::RecordFile] that keeps a record
//! sequence and a [`Memory`][hexrec_memory::Memory] in sync.

#![deny(unused)]
#![deny(warnings)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::private_intra_doc_links)]
#![deny(rustdoc::missing_crate_level_docs)]
#![deny(rustdoc::invalid_codeblock_attributes)]
#![deny(rustdoc::invalid_rust_codeblocks)]

pub mod anyfile;
pub mod file;
pub mod formats;
pub mod record;
pub mod registry;

pub use anyfile::AnyFile;
pub use file::RecordFile;
pub use record::Tokens;
pub use registry::Format;
