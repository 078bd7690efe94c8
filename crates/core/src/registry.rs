//! A process-wide, read-only table mapping format names and file extensions
//! to the concrete format modules under [`crate::formats`], so a caller (the
//! CLI, chiefly) can pick a format at runtime from a path or a `--format`
//! flag instead of naming a module at compile time.

/// One of the hexadecimal record formats this crate can read and write.
///
/// Variants are gated by the same Cargo feature as their
/// [`crate::formats`] module, so `Format` only ever names a format this
/// build actually supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    /// Intel HEX (`:LLAAAATTDD…CC`).
    #[cfg(feature = "ihex")]
    Ihex,
    /// Motorola S-Record (`SnLLAAAA…DD…CC`).
    #[cfg(feature = "srec")]
    Srec,
    /// Tektronix extended HEX (`%LLTKKALA…D…`).
    #[cfg(feature = "tektronix")]
    Tektronix,
    /// MOS Technology papertape (`;CCAAAAD…SSSS`).
    #[cfg(feature = "mos")]
    Mos,
    /// TI-TXT (`@HHHH` directives plus hex byte lines).
    #[cfg(feature = "titxt")]
    Titxt,
    /// AVR ROM (`WWWWWW:DDDD`).
    #[cfg(feature = "avr")]
    Avr,
    /// Raw binary, no textual framing.
    #[cfg(feature = "raw")]
    Raw,
}

impl Format {
    /// All formats this build supports, in a stable order.
    pub const ALL: &'static [Format] = &[
        #[cfg(feature = "ihex")]
        Format::Ihex,
        #[cfg(feature = "srec")]
        Format::Srec,
        #[cfg(feature = "tektronix")]
        Format::Tektronix,
        #[cfg(feature = "mos")]
        Format::Mos,
        #[cfg(feature = "titxt")]
        Format::Titxt,
        #[cfg(feature = "avr")]
        Format::Avr,
        #[cfg(feature = "raw")]
        Format::Raw,
    ];

    /// This format's canonical short name, as accepted by a `--format` flag.
    pub fn name(self) -> &'static str {
        match self {
            #[cfg(feature = "ihex")]
            Format::Ihex => "ihex",
            #[cfg(feature = "srec")]
            Format::Srec => "srec",
            #[cfg(feature = "tektronix")]
            Format::Tektronix => "tektronix",
            #[cfg(feature = "mos")]
            Format::Mos => "mos",
            #[cfg(feature = "titxt")]
            Format::Titxt => "titxt",
            #[cfg(feature = "avr")]
            Format::Avr => "avr",
            #[cfg(feature = "raw")]
            Format::Raw => "raw",
        }
    }

    /// File extensions (without the leading dot) conventionally used by
    /// this format.
    pub fn extensions(self) -> &'static [&'static str] {
        match self {
            #[cfg(feature = "ihex")]
            Format::Ihex => &["hex", "ihex", "mcs"],
            #[cfg(feature = "srec")]
            Format::Srec => &["mot", "s19", "s28", "s37", "srec", "exo"],
            #[cfg(feature = "tektronix")]
            Format::Tektronix => &["tek"],
            #[cfg(feature = "mos")]
            Format::Mos => &["mos"],
            #[cfg(feature = "titxt")]
            Format::Titxt => &["txt"],
            #[cfg(feature = "avr")]
            Format::Avr => &["rom"],
            #[cfg(feature = "raw")]
            Format::Raw => &["bin", "dat", "raw"],
        }
    }

    /// Looks up a format by its canonical short name.
    pub fn from_name(name: &str) -> Option<Format> {
        Format::ALL.iter().copied().find(|format| format.name().eq_ignore_ascii_case(name))
    }

    /// Looks up a format by a file extension (without the leading dot).
    ///
    /// Ambiguous extensions (none, currently) would return the first match
    /// in [`Format::ALL`] order; callers needing certainty should prefer an
    /// explicit `--format` flag over extension sniffing.
    pub fn from_extension(extension: &str) -> Option<Format> {
        Format::ALL.iter().copied().find(|format| format.extensions().iter().any(|ext| ext.eq_ignore_ascii_case(extension)))
    }

    /// Guesses a format from a file path's extension.
    pub fn from_path(path: &std::path::Path) -> Option<Format> {
        path.extension().and_then(|ext| ext.to_str()).and_then(Format::from_extension)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trips_every_name() {
        for format in Format::ALL {
            assert_eq!(Format::from_name(format.name()), Some(*format));
        }
    }

    #[test]
    fn test_known_extensions_resolve() {
        #[cfg(feature = "ihex")]
        assert_eq!(Format::from_extension("hex"), Some(Format::Ihex));
        #[cfg(feature = "srec")]
        assert_eq!(Format::from_extension("S19"), Some(Format::Srec));
        #[cfg(feature = "raw")]
        assert_eq!(Format::from_extension("bin"), Some(Format::Raw));
    }

    #[test]
    fn test_unknown_extension_is_none() {
        assert_eq!(Format::from_extension("zzz"), None);
    }
}
