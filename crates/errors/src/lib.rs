//! `hexrec_errors` provides basic features to declare human-understandable
//! errors, along with diagnostics.
//!
//! First off, `hexrec_errors` provides the [`error!`] macro that helps to
//! declare types that implement [`std::error::Error`], and also derive
//! [`thiserror::Error`] and [`miette::Diagnostic`]. The macro helps to define
//! error code, message, formatted message, and help. It automatically
//! generates documentation, with intra-links to the [`Diagnostics`] type. As
//! an example, see the [`Error`] type that is built with this macro!
//!
//! The second feature provided by `hexrec_errors` is [`Diagnostics`]. When an
//! error has a code, e.g. `E003`, it can be used to further explain an error
//! with `hexrec --explain E003`, à la `rustc`. That's almost the same
//! mechanism. But the diagnostics are also part of the documentation itself,
//! check for example [`Diagnostics::E003`]. There is 2 ways to get the
//! detailed diagnostics based on error code.
//!
//! The error taxonomy follows the six kinds used throughout the record and
//! memory codecs: syntax, overflow, consistency, structure, memory, and I/O.

#![deny(unused)]
#![deny(warnings)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::private_intra_doc_links)]
#![deny(rustdoc::missing_crate_level_docs)]
#![deny(rustdoc::invalid_codeblock_attributes)]
#![deny(rustdoc::invalid_rust_codeblocks)]

mod error_codes;

pub use error_codes::Diagnostics;
#[cfg(feature = "diagnostics")]
pub use error_codes::DIAGNOSTICS;
pub use miette::Result;

#[doc(hidden)]
#[macro_export]
macro_rules! as_item {
    ($item:item) => {
        $item
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! link_error_code {
    ($error_code:ident) => {
        concat!(
            "[`",
            stringify!($error_code),
            "`](hexrec_errors::Diagnostics::",
            stringify!($error_code),
            ")."
        )
    };
}

/// Use this macro to declare a type that acts like a human-understandable
/// error, with diagnostics.
///
/// # Example
///
/// An example is better than a long text:
///
/// ```rust
/// use hexrec_errors::error;
///
/// error! {
///     pub enum Error {
///         #[code = E000]
///         #[message = "The given error code is invalid."]
///         #[formatted_message("`{0}` is not a valid error code.")]
///         #[help = "Did you mistype the error code?"]
///         InvalidCode(String),
///     }
/// }
///
/// # fn main() {
/// let error = Error::InvalidCode("xyz".to_string());
///
/// // Get the error as a string.
/// assert_eq!(
///     error.to_string(),
///     "`xyz` is not a valid error code.".to_string()
/// );
///
/// // Get more information on the errors, via `miette`.
///
/// use miette::Diagnostic;
///
/// assert_eq!(
///     error.code().map(|code| code.to_string()),
///     Some("E000".to_string())
/// );
/// assert_eq!(
///     error.help().map(|help| help.to_string()),
///     Some("Did you mistype the error code?".to_string())
/// );
/// # }
/// ```
///
/// This creates an `Error` enum type, with an `InvalidCode` tuple variant.
/// This newly created `Error` enum type implements [`thiserror::Error`] and
/// [`miette::Diagnostic`].
///
/// # Syntax
///
/// So far, the macro only supports an `enum` declaration, no `struct` yet.
/// `enum` supports variant, or tuple variant only.
///
/// Each variant can have the following attributes:
///
/// * `#[cfg(…)]` (optional),
/// * `#[code = E...]` to define the error code (optional),
/// * `#[message = "…"]` to define a literal string message; it will be used as
///   documentation.
/// * `#[formatted_message("format {0} {}", .0.accessor)]` to define a
///   “dynamic” string message; it will be used for the
///   [`std::fmt::Display`] implementation, and follows the same rules as the
///   `#[error(…)]` attribute of [`thiserror`] (optional).
/// * `#[help = "…"]` to define a help, a hint, a tip, to drive the user to a
///   solution; note that this is mandatory.
///
/// Alternatively, it is possible to annotate a variant with `#[cfg(…)]`
/// (optional) and `#[transparent]` only, which makes the variant
/// “transparent” and forwards everything to the first tuple item of the
/// variant. Note that tuple items can use the same [`thiserror`] attributes,
/// like `#[from]`.
///
/// ```rust
/// use hexrec_errors::error;
///
/// error! {
///     pub enum Error {
///         #[transparent]
///         Other(#[from] std::io::Error),
///     }
/// }
/// ```
#[macro_export]
macro_rules! error {
    // Error declaration with a static literal message.
    (
        @variant
        [ $( $declaration:tt )* ]
        [ $( $accumulator:tt )* ]
        $( #[cfg( $cfg:meta )] )*
        $( #[code = $error_code:ident] )?
        #[message = $error_message:expr]
        #[help = $error_help:literal]
        $( $tail:tt )*
    ) => {
        error! {
            @variant
            [ $( $declaration )* ]
            [
                $( $accumulator )*

                $(
                    #[doc = concat!("Error code: ", $crate::link_error_code!($error_code))]
                    #[doc = "\n"]
                )?
                #[doc = $error_message]
                #[error($error_message)]
                #[diagnostic(
                    $( code($error_code), )?
                    help($error_help),
                )]
                $( #[cfg( $cfg )] )*
            ]
            $( $tail )*
        }
    };

    // Error declaration with a dynamic message.
    (
        @variant
        [ $( $declaration:tt )* ]
        [ $( $accumulator:tt )* ]
        $( #[cfg( $cfg:meta )] )*
        $( #[code = $error_code:ident] )?
        #[message = $error_message:expr]
        #[formatted_message( $error_message_format:literal $( , . $error_message_arguments:expr )* $( , )* )]
        #[help = $error_help:literal]
        $( $tail:tt )*
    ) => {
        error! {
            @variant
            [ $( $declaration )* ]
            [
                $( $accumulator )*

                $(
                    #[doc = concat!("Error code: ", $crate::link_error_code!($error_code))]
                    #[doc = "\n"]
                )?
                #[doc = $error_message]
                #[error( $error_message_format $( , . $error_message_arguments ),* )]
                #[diagnostic(
                    $( code($error_code), )?
                    help($error_help),
                )]
                $( #[cfg( $cfg )] )*
            ]
            $( $tail )*
        }
    };

    // Transparent error.
    (
        @variant
        [ $( $declaration:tt )* ]
        [ $( $accumulator:tt )* ]
        $( #[cfg( $cfg:meta )] )*
        #[transparent]
        $( $tail:tt )*
    ) => {
        error! {
            @variant
            [ $( $declaration )* ]
            [
                $( $accumulator )*

                #[doc = "Transparent error. Please see the inner fields."]
                #[error(transparent)]
                $( #[cfg( $cfg )] )*
            ]
            $( $tail )*
        }
    };

    // Unit variant.
    (
        @variant
        [ $( $declaration:tt )* ]
        [ $( $accumulator:tt )* ]
        $variant_name:ident ,
        $( $tail:tt )*
    ) => {
        error! {
            @variant
            [ $( $declaration )* ]
            [
                $( $accumulator )*
                $variant_name,
            ]
            $( $tail )*
        }
    };

    // Tuple variant.
    (
        @variant
        [ $( $declaration:tt )* ]
        [ $( $accumulator:tt )* ]
        $variant_name:ident (
            $(
                $( #[ $field_meta:meta ] )*
                $field_visibility:vis $field_type:ty
            ),*
            $( , )?
        ) ,
        $( $tail:tt )*
    ) => {
        error! {
            @variant
            [ $( $declaration )* ]
            [
                $( $accumulator )*
                $variant_name (
                    $(
                        $( #[ $field_meta ] )*
                        $field_visibility $field_type,
                    )*
                ) ,
            ]
            $( $tail )*
        }
    };


    // End point.
    (
        @variant
        [ $( $declaration:tt )* ]
        [ $( $accumulator:tt )* ]
    ) => {
        $crate::as_item! {
            $( $declaration )* {
                $( $accumulator )*
            }
        }
    };

    // Entry point.
    (
        $( #[doc = $documentation:expr ] )*
        $visibility:vis enum $error_name:ident {
            $( $variants:tt )*
        }
    ) => {
        error! {
            @variant
            [
                $( #[doc = $documentation ] )*
                #[derive(Debug, thiserror::Error, miette::Diagnostic)]
                $visibility enum $error_name
            ]
            []
            $( $variants )*
        }
    };
}

// The `error!` macro generates links to `hexrec_errors::Diagnostics::E...`.
// To avoid having a warning, since this `Error` type below is living inside
// `hexrec_errors` itself, a new alias is created from `crate` to
// `hexrec_errors`, and tadaa, no more warning.
#[cfg(doc)]
use crate as hexrec_errors;

error! {
    #[doc = "Error type shared by every `hexrec` crate."]
    #[doc = "\n"]
    #[doc = "The major interest of this type is its `Self::explain` method that can be"]
    #[doc = "used to fetch the diagnostic of a particular error code."]
    pub enum Error {
        #[code = E000]
        #[message = "The given error code is invalid."]
        #[formatted_message("`{0}` is not a valid error code.")]
        #[help = "Did you mistype the error code? The pattern is `E[0-9]{{3}}`, i.e. an `E` followed by 3 digits, such as `E000`."]
        InvalidCode(String),

        #[code = E001]
        #[message = "A record line does not match the grammar of its format."]
        #[formatted_message("line {0}: the record does not match the expected grammar.")]
        #[help = "Check that the line is framed the way the target format expects (leading tag character, field widths, no stray characters)."]
        Syntax(usize),

        #[code = E002]
        #[message = "A field that is expected to hold hexadecimal digits holds something else."]
        #[formatted_message("line {0}: expected hexadecimal digits, found something else.")]
        #[help = "Hexadecimal fields only accept the digits `0-9`, `a-f`, `A-F`."]
        InvalidHexDigit(usize),

        #[code = E003]
        #[message = "An address exceeds the range allowed by the format or by the sparse memory model."]
        #[formatted_message("address 0x{0:X} is out of range.")]
        #[help = "Addresses must stay within the bounds the format and the memory model allow; see the format's address-width rules."]
        AddressOverflow(u64),

        #[code = E004]
        #[message = "A count or checksum field does not fit the width the format allows."]
        #[formatted_message("value {0} overflows its field width.")]
        #[help = "Counts and checksums are bounded by the number of hexadecimal digits the field allocates; shrink the payload or split the record."]
        FieldOverflow(u64),

        #[code = E005]
        #[message = "The record's stored count does not match its computed count."]
        #[formatted_message("line {0}: stored count {1} does not match computed count {2}.")]
        #[help = "Recompute the count from the address/data fields, or pass `count = false` to `validate` to skip this check."]
        CountMismatch(usize, u64, u64),

        #[code = E006]
        #[message = "The record's stored checksum does not match its computed checksum."]
        #[formatted_message("line {0}: stored checksum 0x{1:X} does not match computed checksum 0x{2:X}.")]
        #[help = "Recompute the checksum from the record's fields, or pass `checksum = false` to `validate` to skip this check."]
        ChecksumMismatch(usize, u64, u64),

        #[code = E007]
        #[message = "A Motorola S-Record data tag does not match the width used by the rest of the sequence."]
        #[formatted_message("line {0}: data tag does not match the sequence's established address width.")]
        #[help = "All data records (S1/S2/S3) in one S-Record file must share the same address width."]
        DataTagMismatch(usize),

        #[code = E008]
        #[message = "A terminator record does not match the data tag it is supposed to close."]
        #[formatted_message("the terminator record does not pair with the sequence's data tag.")]
        #[help = "S1 pairs with S9, S2 with S8, S3 with S7; pick the terminator matching the data width in use."]
        TerminatorMismatch,

        #[code = E009]
        #[message = "Records are not in non-decreasing address order."]
        #[formatted_message("line {0}: record address is lower than a previous record's address.")]
        #[help = "Sort records by address before validating, or pass `data_ordering = false` to skip this check."]
        UnorderedRecords(usize),

        #[code = E010]
        #[message = "Two records claim overlapping address ranges."]
        #[formatted_message("line {0}: record overlaps a previous record's address range.")]
        #[help = "Overlapping data is ambiguous; split or merge the input before retrying."]
        OverlappingRecords(usize),

        #[code = E011]
        #[message = "The file termination record is missing, duplicated, or not last."]
        #[formatted_message("the file's termination record is missing or misplaced.")]
        #[help = "Every supported format requires exactly one termination record, as the last record of the sequence."]
        MisplacedTermination,

        #[code = E012]
        #[message = "Junk surrounding a record is not whitespace."]
        #[formatted_message("line {0}: non-whitespace junk surrounds the record.")]
        #[help = "Only whitespace may appear before or after the framed record text; remove stray characters or enable `ignore_errors`."]
        NonWhitespaceJunk(usize),

        #[code = E013]
        #[message = "A view was requested over a range that is not fully covered by a single contiguous block."]
        #[formatted_message("the range [0x{0:X}, 0x{1:X}) is not contiguous in memory.")]
        #[help = "Use `read` with an explicit fill byte instead of `view` if holes are expected."]
        NonContiguousView(u64, u64),

        #[code = E014]
        #[message = "A read encountered a hole and no fill byte was supplied."]
        #[formatted_message("the range [0x{0:X}, 0x{1:X}) contains unmapped bytes and no fill value was given.")]
        #[help = "Pass a fill byte to `read`, or narrow the range to a fully mapped region."]
        UnfilledHole(u64, u64),

        #[code = E015]
        #[message = "An AVR word address is not byte-aligned, or the data length is odd."]
        #[formatted_message("address 0x{0:X} (or its data length) is not word-aligned.")]
        #[help = "AVR records address 16-bit words; both the address and the data length must be even."]
        WordMisalignment(u64),

        #[code = E016]
        #[message = "The requested address range exceeds the configured size guard."]
        #[formatted_message("the range [0x{0:X}, 0x{1:X}) exceeds the configured size guard.")]
        #[help = "Raise or disable the size guard if the wide read/fill/flood is intentional."]
        SizeGuardExceeded(u64, u64),

        #[code = E017]
        #[message = "A mutation would have placed content outside the memory's explicit bound."]
        #[formatted_message("the range [0x{0:X}, 0x{1:X}) falls outside the memory's bound.")]
        #[help = "Clear the bound, or widen it, before retrying the operation."]
        BoundsViolation(u64, u64),

        #[transparent]
        Io(#[from] std::io::Error),
    }
}

impl Error {
    /// Given a specific error code, this method returns the associated
    /// diagnostic, if the error exists.
    ///
    /// ```
    /// use hexrec_errors::Error;
    ///
    /// # fn main() {
    /// // Explain a valid error.
    /// assert!(Error::explain("E000").is_ok());
    ///
    /// // Explain an invalid error.
    /// assert!(Error::explain("oops").is_err());
    /// # }
    /// ```
    #[cfg(feature = "diagnostics")]
    pub fn explain(error_code: &str) -> Result<&'static str, Self> {
        DIAGNOSTICS
            .iter()
            .find_map(
                |(current_error_code, diagnostic)| {
                    if *current_error_code == error_code {
                        Some(*diagnostic)
                    } else {
                        None
                    }
                },
            )
            .ok_or(Self::InvalidCode(error_code.to_owned()))
    }
}
