//! `hexrec-cli` is the executable of `hexrec`: a command-line front end over
//! `hexrec-core`'s format codecs and `hexrec-memory`'s sparse memory model.
//!
//! Every subcommand is a thin driver: it loads one or more files, delegates
//! to a single library operation, and saves the result. None of the
//! format-specific or memory-algebra logic lives here.

mod error;

use std::{
    env,
    ffi::OsString,
    path::Path,
    process,
};

use argh::FromArgs;
use error::Error;
use hexrec_core::{AnyFile, Format};
use hexrec_errors::{Error as HexrecError, Result};
use hexrec_memory::Memory;
use hexrec_parser::Ending;

/// The `hexrec` command reads, edits, converts, and merges hexadecimal
/// record files (Intel HEX, Motorola S-Record, Tektronix extended HEX, MOS
/// Technology papertape, TI-TXT, AVR ROM, and raw binary).
#[derive(Debug, FromArgs)]
struct Hexrec {
    /// explain a particular error based on its code (of kind `E...`).
    #[argh(option)]
    explain: Option<String>,

    #[argh(subcommand)]
    command: Option<Command>,
}

impl Hexrec {
    /// Creates a new `Self` type based on [`std::env::args_os`].
    fn new() -> Result<Self, Error> {
        // Collect all arguments.
        let arguments =
            env::args_os().map(OsString::into_string).collect::<Result<Vec<_>, _>>().map_err(
                |argument| Error::InvalidArgumentEncoding(argument.to_string_lossy().to_string()),
            )?;

        // Check whether `argv` is present.
        if arguments.is_empty() {
            return Err(Error::ProgramNameIsMissing);
        }

        // Extract the base command from a path.
        let command = Path::new(&arguments[0])
            .file_name()
            .and_then(|file_name| file_name.to_str())
            .unwrap_or(&arguments[0]);

        // Extract all arguments.
        let arguments =
            arguments.iter().skip(1).map(|argument| argument.as_str()).collect::<Vec<_>>();

        // Parse and build `Self`.
        match Hexrec::from_args(&[command], &arguments) {
            Ok(hexrec) => Ok(hexrec),
            Err(early_exit) => match early_exit.status {
                // The command was parsed successfully and the early exit is due to a flag like
                // `--help` causing early exit with output.
                Ok(()) => {
                    println!("{}", early_exit.output);

                    process::exit(0);
                }

                // The arguments were not successfully parsed.
                Err(()) => Err(Error::CommandLine(early_exit.output.trim().to_string())),
            },
        }
    }
}

/// One subcommand of `hexrec`.
#[derive(Debug, FromArgs)]
#[argh(subcommand)]
enum Command {
    Convert(ConvertArgs),
    Merge(MergeArgs),
    Fill(FillArgs),
    Flood(FloodArgs),
    Clear(ClearArgs),
    Crop(CropArgs),
    Delete(DeleteArgs),
    Shift(ShiftArgs),
    Validate(ValidateArgs),
    Srec(SrecArgs),
    Dump(DumpArgs),
}

/// Loads `input`, saves it as `output`; the format of each is inferred from
/// its extension unless given explicitly (required when either path is
/// `-`).
#[derive(Debug, FromArgs)]
#[argh(subcommand, name = "convert")]
struct ConvertArgs {
    /// input file path (`-` for stdin).
    #[argh(positional)]
    input: String,
    /// output file path (`-` for stdout).
    #[argh(positional)]
    output: String,
    /// input format, required when `input` is `-`.
    #[argh(option)]
    input_format: Option<String>,
    /// output format, required when `output` is `-`.
    #[argh(option)]
    output_format: Option<String>,
}

/// Loads every input in order, overlaying each onto the previous (later
/// inputs overwrite earlier ones), and saves the result as the last path.
#[derive(Debug, FromArgs)]
#[argh(subcommand, name = "merge")]
struct MergeArgs {
    /// input file paths, in overlay order, followed by the output path.
    #[argh(positional)]
    paths: Vec<String>,
    /// output format, required when the output path is `-`.
    #[argh(option)]
    output_format: Option<String>,
}

/// Writes `--pattern` (default `0xFF`) across `[--start, --endex)`,
/// overwriting any existing content.
#[derive(Debug, FromArgs)]
#[argh(subcommand, name = "fill")]
struct FillArgs {
    /// input file path (`-` for stdin).
    #[argh(positional)]
    input: String,
    /// output file path (`-` for stdout).
    #[argh(positional)]
    output: String,
    /// first address of the range, accepts the same grammar as `parse_int`
    /// (`0x1000`, `4Ki`, …).
    #[argh(option)]
    start: String,
    /// address just past the range.
    #[argh(option)]
    endex: String,
    /// comma-separated byte pattern, cycled across the range.
    #[argh(option)]
    pattern: Option<String>,
    /// input format, required when `input` is `-`.
    #[argh(option)]
    input_format: Option<String>,
    /// output format, required when `output` is `-`.
    #[argh(option)]
    output_format: Option<String>,
}

/// Writes `--pattern` only into holes within `[--start, --endex)`, leaving
/// existing content untouched.
#[derive(Debug, FromArgs)]
#[argh(subcommand, name = "flood")]
struct FloodArgs {
    /// input file path (`-` for stdin).
    #[argh(positional)]
    input: String,
    /// output file path (`-` for stdout).
    #[argh(positional)]
    output: String,
    /// first address of the range.
    #[argh(option)]
    start: String,
    /// address just past the range.
    #[argh(option)]
    endex: String,
    /// comma-separated byte pattern, cycled across the range.
    #[argh(option)]
    pattern: String,
    /// input format, required when `input` is `-`.
    #[argh(option)]
    input_format: Option<String>,
    /// output format, required when `output` is `-`.
    #[argh(option)]
    output_format: Option<String>,
}

/// Deletes bytes in `[--start, --endex)`, leaving a hole; nothing is
/// shifted.
#[derive(Debug, FromArgs)]
#[argh(subcommand, name = "clear")]
struct ClearArgs {
    /// input file path (`-` for stdin).
    #[argh(positional)]
    input: String,
    /// output file path (`-` for stdout).
    #[argh(positional)]
    output: String,
    /// first address of the range.
    #[argh(option)]
    start: String,
    /// address just past the range.
    #[argh(option)]
    endex: String,
    /// input format, required when `input` is `-`.
    #[argh(option)]
    input_format: Option<String>,
    /// output format, required when `output` is `-`.
    #[argh(option)]
    output_format: Option<String>,
}

/// Removes all content outside `[--start, --endex)`.
#[derive(Debug, FromArgs)]
#[argh(subcommand, name = "crop")]
struct CropArgs {
    /// input file path (`-` for stdin).
    #[argh(positional)]
    input: String,
    /// output file path (`-` for stdout).
    #[argh(positional)]
    output: String,
    /// first address of the range to keep.
    #[argh(option)]
    start: String,
    /// address just past the range to keep.
    #[argh(option)]
    endex: String,
    /// input format, required when `input` is `-`.
    #[argh(option)]
    input_format: Option<String>,
    /// output format, required when `output` is `-`.
    #[argh(option)]
    output_format: Option<String>,
}

/// Deletes bytes in `[--start, --endex)` and shifts everything at or after
/// `--endex` down by `endex - start`.
#[derive(Debug, FromArgs)]
#[argh(subcommand, name = "delete")]
struct DeleteArgs {
    /// input file path (`-` for stdin).
    #[argh(positional)]
    input: String,
    /// output file path (`-` for stdout).
    #[argh(positional)]
    output: String,
    /// first address of the range to delete.
    #[argh(option)]
    start: String,
    /// address just past the range to delete.
    #[argh(option)]
    endex: String,
    /// input format, required when `input` is `-`.
    #[argh(option)]
    input_format: Option<String>,
    /// output format, required when `output` is `-`.
    #[argh(option)]
    output_format: Option<String>,
}

/// Adds `--amount` (signed) to every block's start address.
#[derive(Debug, FromArgs)]
#[argh(subcommand, name = "shift")]
struct ShiftArgs {
    /// input file path (`-` for stdin).
    #[argh(positional)]
    input: String,
    /// output file path (`-` for stdout).
    #[argh(positional)]
    output: String,
    /// signed number of bytes to shift every block by.
    #[argh(option)]
    amount: String,
    /// input format, required when `input` is `-`.
    #[argh(option)]
    input_format: Option<String>,
    /// output format, required when `output` is `-`.
    #[argh(option)]
    output_format: Option<String>,
}

/// Parses and validates a file's records; exits non-zero with a one-line
/// diagnostic on the first violation.
#[derive(Debug, FromArgs)]
#[argh(subcommand, name = "validate")]
struct ValidateArgs {
    /// input file path (`-` for stdin).
    #[argh(positional)]
    input: String,
    /// skip the per-record count check.
    #[argh(switch)]
    no_count: bool,
    /// skip the per-record checksum check.
    #[argh(switch)]
    no_checksum: bool,
    /// input format, required when `input` is `-`.
    #[argh(option)]
    input_format: Option<String>,
}

/// Motorola S-Record introspection subcommands.
#[derive(Debug, FromArgs)]
#[argh(subcommand, name = "srec")]
struct SrecArgs {
    #[argh(subcommand)]
    command: SrecCommand,
}

/// One `srec` subcommand.
#[derive(Debug, FromArgs)]
#[argh(subcommand)]
enum SrecCommand {
    GetHeader(GetHeaderArgs),
}

/// Prints the S-Record file's S0 header payload, as text (when printable)
/// and as hex.
#[derive(Debug, FromArgs)]
#[argh(subcommand, name = "get-header")]
struct GetHeaderArgs {
    /// input file path (`-` for stdin).
    #[argh(positional)]
    input: String,
    /// input format, required when `input` is `-`.
    #[argh(option)]
    input_format: Option<String>,
}

/// Prints a minimal columnar byte/ASCII listing of `[--start, --endex)`
/// (default: the file's full mapped span), 16 bytes per row. Not a
/// full `xxd`/`hexdump` replacement: no color themes, no `-s`/`-l`/`-g`
/// flags.
#[derive(Debug, FromArgs)]
#[argh(subcommand, name = "dump")]
struct DumpArgs {
    /// input file path (`-` for stdin).
    #[argh(positional)]
    input: String,
    /// first address to print; defaults to the file's lowest mapped byte.
    #[argh(option)]
    start: Option<String>,
    /// address just past the last byte to print; defaults to the file's
    /// highest mapped byte.
    #[argh(option)]
    endex: Option<String>,
    /// input format, required when `input` is `-`.
    #[argh(option)]
    input_format: Option<String>,
}

fn resolve_format(path: &str, explicit: Option<&str>) -> std::result::Result<Format, Error> {
    if let Some(name) = explicit {
        return Format::from_name(name).ok_or_else(|| Error::UnknownFormat(name.to_string()));
    }

    if hexrec_file::is_stdio(path) {
        return Err(Error::FormatRequiredForStdio(path.to_string()));
    }

    Format::from_path(Path::new(path)).ok_or_else(|| Error::UnknownFormat(path.to_string()))
}

fn load_file(path: &str, format: Option<&str>) -> std::result::Result<AnyFile, Error> {
    let format = resolve_format(path, format)?;
    let bytes = hexrec_file::load(Some(path))?;

    Ok(AnyFile::load(format, &bytes)?)
}

fn save_file(path: &str, format: Option<&str>, memory: Memory) -> std::result::Result<(), Error> {
    let format = resolve_format(path, format)?;
    let mut file = AnyFile::from_memory(format, memory);
    let bytes = file.serialize(Ending::Crlf)?;

    hexrec_file::save(Some(path), &bytes)?;
    Ok(())
}

fn parse_addr(value: &str) -> std::result::Result<u64, Error> {
    let parsed = hexrec_parser::parse_int(Some(value))?.expect("`Some` input always yields `Some`");

    u64::try_from(parsed).map_err(|_| HexrecError::AddressOverflow(parsed.unsigned_abs() as u64).into())
}

fn parse_amount(value: &str) -> std::result::Result<i64, Error> {
    let parsed = hexrec_parser::parse_int(Some(value))?.expect("`Some` input always yields `Some`");

    i64::try_from(parsed).map_err(|_| HexrecError::AddressOverflow(parsed.unsigned_abs() as u64).into())
}

fn parse_pattern(value: &str) -> std::result::Result<Vec<u8>, Error> {
    let mut pattern = Vec::new();

    for part in value.split(',') {
        let part = part.trim();

        if part.is_empty() {
            continue;
        }

        let parsed = hexrec_parser::parse_int(Some(part))?.expect("`Some` input always yields `Some`");
        let byte = u8::try_from(parsed).map_err(|_| HexrecError::FieldOverflow(parsed.unsigned_abs() as u64))?;

        pattern.push(byte);
    }

    if pattern.is_empty() {
        return Err(Error::EmptyPattern);
    }

    Ok(pattern)
}

fn cmd_convert(args: ConvertArgs) -> std::result::Result<(), Error> {
    let mut input = load_file(&args.input, args.input_format.as_deref())?;
    let memory = input.memory()?.clone();

    save_file(&args.output, args.output_format.as_deref(), memory)
}

fn cmd_merge(args: MergeArgs) -> std::result::Result<(), Error> {
    if args.paths.len() < 2 {
        return Err(Error::CommandLine(
            "`merge` needs at least one input path and one output path.".to_string(),
        ));
    }

    let (inputs, output) = args.paths.split_at(args.paths.len() - 1);
    let output = &output[0];

    let mut merged = Memory::new();
    for input_path in inputs {
        let mut file = load_file(input_path, None)?;
        let memory = file.memory()?;

        merged.merge(memory, false)?;
    }

    save_file(output, args.output_format.as_deref(), merged)
}

fn cmd_fill(args: FillArgs) -> std::result::Result<(), Error> {
    let mut file = load_file(&args.input, args.input_format.as_deref())?;
    let start = parse_addr(&args.start)?;
    let endex = parse_addr(&args.endex)?;
    let pattern = match &args.pattern {
        Some(pattern) => parse_pattern(pattern)?,
        None => vec![0xFF],
    };

    file.fill(start, endex, &pattern)?;

    let memory = file.memory()?.clone();
    save_file(&args.output, args.output_format.as_deref(), memory)
}

fn cmd_flood(args: FloodArgs) -> std::result::Result<(), Error> {
    let mut file = load_file(&args.input, args.input_format.as_deref())?;
    let start = parse_addr(&args.start)?;
    let endex = parse_addr(&args.endex)?;
    let pattern = parse_pattern(&args.pattern)?;

    file.flood(start, endex, &pattern)?;

    let memory = file.memory()?.clone();
    save_file(&args.output, args.output_format.as_deref(), memory)
}

fn cmd_clear(args: ClearArgs) -> std::result::Result<(), Error> {
    let mut file = load_file(&args.input, args.input_format.as_deref())?;
    let start = parse_addr(&args.start)?;
    let endex = parse_addr(&args.endex)?;

    file.clear(start, endex)?;

    let memory = file.memory()?.clone();
    save_file(&args.output, args.output_format.as_deref(), memory)
}

fn cmd_crop(args: CropArgs) -> std::result::Result<(), Error> {
    let mut file = load_file(&args.input, args.input_format.as_deref())?;
    let start = parse_addr(&args.start)?;
    let endex = parse_addr(&args.endex)?;

    file.crop(start, endex)?;

    let memory = file.memory()?.clone();
    save_file(&args.output, args.output_format.as_deref(), memory)
}

fn cmd_delete(args: DeleteArgs) -> std::result::Result<(), Error> {
    let mut file = load_file(&args.input, args.input_format.as_deref())?;
    let start = parse_addr(&args.start)?;
    let endex = parse_addr(&args.endex)?;

    file.delete(start, endex)?;

    let memory = file.memory()?.clone();
    save_file(&args.output, args.output_format.as_deref(), memory)
}

fn cmd_shift(args: ShiftArgs) -> std::result::Result<(), Error> {
    let mut file = load_file(&args.input, args.input_format.as_deref())?;
    let amount = parse_amount(&args.amount)?;

    file.shift(amount)?;

    let memory = file.memory()?.clone();
    save_file(&args.output, args.output_format.as_deref(), memory)
}

fn cmd_validate(args: ValidateArgs) -> std::result::Result<(), Error> {
    let mut file = load_file(&args.input, args.input_format.as_deref())?;

    file.validate(!args.no_count, !args.no_checksum, true)?;
    Ok(())
}

fn cmd_srec_get_header(args: GetHeaderArgs) -> std::result::Result<(), Error> {
    let format = resolve_format(&args.input, args.input_format.as_deref())?;
    if format != Format::Srec {
        return Err(Error::NotSrec);
    }

    let mut file = load_file(&args.input, Some("srec"))?;

    match file.srec_header()? {
        None => println!("(no S0 header record)"),
        Some(header) => {
            let text = printable_ascii(&header);
            println!("{text}");
            println!("{}", hexrec_parser::hexlify(&header, " ", true));
        }
    }

    Ok(())
}

fn cmd_dump(args: DumpArgs) -> std::result::Result<(), Error> {
    let mut file = load_file(&args.input, args.input_format.as_deref())?;
    let (mapped_start, mapped_endex) = file.memory()?.span().unwrap_or((0, 0));

    let start = match &args.start {
        Some(start) => parse_addr(start)?,
        None => mapped_start,
    };
    let endex = match &args.endex {
        Some(endex) => parse_addr(endex)?,
        None => mapped_endex,
    };

    let bytes = file.read(start, endex, Some(0x00))?;
    print_dump(start, &bytes);

    Ok(())
}

fn print_dump(base: u64, data: &[u8]) {
    for (row_index, row) in data.chunks(16).enumerate() {
        let address = base + (row_index * 16) as u64;
        let hex = hexrec_parser::hexlify(row, " ", true);
        let ascii = printable_ascii(row);

        println!("{address:08X}  {hex:<47}  {ascii}");
    }
}

fn printable_ascii(bytes: &[u8]) -> String {
    bytes.iter().map(|&byte| if byte.is_ascii_graphic() || byte == b' ' { byte as char } else { '.' }).collect()
}

fn main() -> Result<()> {
    // Install the error report.
    Error::install_and_configure()?;

    // Build the command-line arguments.
    let hexrec = Hexrec::new()?;

    // Handle the `--explain` option.
    if let Some(error_code) = &hexrec.explain {
        println!("{}", Error::explain(error_code)?);

        return Ok(());
    }

    let command = hexrec.command.ok_or(Error::NoCommand)?;

    match command {
        Command::Convert(args) => cmd_convert(args)?,
        Command::Merge(args) => cmd_merge(args)?,
        Command::Fill(args) => cmd_fill(args)?,
        Command::Flood(args) => cmd_flood(args)?,
        Command::Clear(args) => cmd_clear(args)?,
        Command::Crop(args) => cmd_crop(args)?,
        Command::Delete(args) => cmd_delete(args)?,
        Command::Shift(args) => cmd_shift(args)?,
        Command::Validate(args) => cmd_validate(args)?,
        Command::Srec(args) => match args.command {
            SrecCommand::GetHeader(args) => cmd_srec_get_header(args)?,
        },
        Command::Dump(args) => cmd_dump(args)?,
    }

    Ok(())
}
