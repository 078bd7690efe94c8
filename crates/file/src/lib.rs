//! `hexrec_file` is a thin crate that loads and saves hex-record files,
//! treating `-` (or the absence of a path) as standard input/output.

#![deny(unused)]
#![deny(warnings)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::private_intra_doc_links)]
#![deny(rustdoc::missing_crate_level_docs)]
#![deny(rustdoc::invalid_codeblock_attributes)]
#![deny(rustdoc::invalid_rust_codeblocks)]

use std::{
    fs,
    io::{Read, Write},
    path::Path,
};

use hexrec_errors::Error;

/// `true` if `path` names standard input/output rather than a real file.
pub fn is_stdio(path: &str) -> bool {
    path == "-"
}

/// Reads `path`'s entire contents. `None`, or `Some("-")`, reads standard
/// input instead of opening a file.
pub fn load(path: Option<&str>) -> Result<Vec<u8>, Error> {
    match path {
        None => read_stdin(),
        Some(path) if is_stdio(path) => read_stdin(),
        Some(path) => Ok(fs::read(path)?),
    }
}

/// Writes `data` to `path`, truncating any existing contents. `None`, or
/// `Some("-")`, writes to standard output instead of opening a file.
pub fn save(path: Option<&str>, data: &[u8]) -> Result<(), Error> {
    match path {
        None => write_stdout(data),
        Some(path) if is_stdio(path) => write_stdout(data),
        Some(path) => Ok(fs::write(path, data)?),
    }
}

/// The file extension named by `path` (without its leading dot), if any —
/// used by the format registry to infer a format from a path.
pub fn extension(path: &str) -> Option<&str> {
    Path::new(path).extension().and_then(|ext| ext.to_str())
}

fn read_stdin() -> Result<Vec<u8>, Error> {
    let mut buffer = Vec::new();
    std::io::stdin().read_to_end(&mut buffer)?;
    Ok(buffer)
}

fn write_stdout(data: &[u8]) -> Result<(), Error> {
    std::io::stdout().write_all(data)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_then_load_round_trips() {
        let path = std::env::temp_dir().join("hexrec_file_test_round_trip.bin");
        let path = path.to_str().unwrap();

        save(Some(path), b"abcdef").unwrap();
        assert_eq!(load(Some(path)).unwrap(), b"abcdef");

        fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_is_stdio_sentinel() {
        assert!(is_stdio("-"));
        assert!(!is_stdio("file.hex"));
    }

    #[test]
    fn test_extension() {
        assert_eq!(extension("firmware.hex"), Some("hex"));
        assert_eq!(extension("firmware"), None);
        assert_eq!(extension("-"), None);
    }
}
