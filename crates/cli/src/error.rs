#[cfg(feature = "fancy-errors")]
use miette::{set_hook, MietteHandlerOpts};
use miette::{Diagnostic, InstallError, Result};
use thiserror::Error;
use hexrec_errors::Error as HexrecError;

#[derive(Error, Diagnostic, Debug)]
pub(crate) enum Error {
    #[error("The argument `{0}` contains invalid Unicode data.")]
    InvalidArgumentEncoding(String),

    #[error("The program name is missing from the command-line.")]
    ProgramNameIsMissing,

    #[error("I was not able to read the command-line properly:\n{0}")]
    #[diagnostic(code(E001), help("See the command-line usage with `hexrec --help`."))]
    CommandLine(String),

    #[error("no subcommand was given")]
    #[diagnostic(help("Run `hexrec --help` to see the available subcommands."))]
    NoCommand,

    #[error("`{0}` does not name a known format")]
    #[diagnostic(help("Known formats: ihex, srec, tektronix, mos, titxt, avr, raw."))]
    UnknownFormat(String),

    #[error("`{0}` is standard input/output (`-`); an explicit format is required")]
    #[diagnostic(help("Pass `--input-format <name>` (or `--output-format <name>`) alongside `-`."))]
    FormatRequiredForStdio(String),

    #[error("`--pattern` requires at least one byte")]
    #[diagnostic(help("Pass one or more comma-separated integers, e.g. `--pattern 0xFF` or `--pattern 0,1,2,3`."))]
    EmptyPattern,

    #[error("this file's format has no S-Record header")]
    #[diagnostic(help("`srec get-header` only applies to Motorola S-Record files."))]
    NotSrec,

    #[error(transparent)]
    #[diagnostic(transparent)]
    Hexrec(#[from] HexrecError),
}

impl Error {
    pub(crate) fn install_and_configure() -> Result<(), InstallError> {
        #[cfg(feature = "fancy-errors")]
        set_hook(Box::new(|_| {
            Box::new(
                MietteHandlerOpts::new()
                    .with_cause_chain()
                    .footer(
                        "For more information about an error, try \
                        `hexrec --explain <error>` where `<error>` \
                        has the `E[0-9]{{3}} pattern."
                            .to_string(),
                    )
                    .width(85)
                    .terminal_links(false)
                    .build(),
            )
        }))?;

        Ok(())
    }

    pub(crate) fn explain(error_code: &str) -> Result<&'static str, HexrecError> {
        HexrecError::explain(error_code)
    }
}
