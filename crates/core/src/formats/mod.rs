//! One module per concrete hex-record format. Each module owns a `Tag`
//! enum, a `Record` type implementing [`crate::record::Record`], a zero-sized
//! `Codec` type implementing [`crate::file::FormatRecord`], and a `File` type
//! alias over [`crate::file::RecordFile`].
//!
//! Every module is gated by the Cargo feature of the same name, so a
//! consumer that only needs, say, Intel HEX can build with
//! `default-features = false, features = ["ihex"]`.

#[allow(dead_code)]
pub(crate) mod support;

#[cfg(feature = "avr")]
pub mod avr;
#[cfg(feature = "ihex")]
pub mod ihex;
#[cfg(feature = "mos")]
pub mod mos;
#[cfg(feature = "raw")]
pub mod raw;
#[cfg(feature = "srec")]
pub mod srec;
#[cfg(feature = "tektronix")]
pub mod tektronix;
#[cfg(feature = "titxt")]
pub mod titxt;
