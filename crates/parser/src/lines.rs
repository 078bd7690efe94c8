use bstr::ByteSlice;

use crate::combinators::Ending;

/// Splits `input` into lines, reporting the terminator each one ended with.
///
/// Recognizes `\r\n`, `\n`, and a bare `\r` (as produced by classic Mac OS
/// tooling), and reports [`Ending::Eof`] for a final, unterminated line. An
/// empty trailing line after the last terminator is not emitted, matching
/// how every hex-record format treats a trailing newline as end-of-file
/// rather than an empty record.
pub fn split_lines(input: &[u8]) -> Vec<(&[u8], Ending)> {
    let mut lines = Vec::new();
    let mut rest = input;

    while !rest.is_empty() {
        match rest.find_byteset(b"\r\n") {
            Some(index) => {
                let (line, tail) = rest.split_at(index);

                let (ending, skip) = if tail.starts_with(b"\r\n") {
                    (Ending::Crlf, 2)
                } else if tail.starts_with(b"\n") {
                    (Ending::Lf, 1)
                } else {
                    (Ending::Cr, 1)
                };

                lines.push((line, ending));
                rest = &tail[skip..];
            }
            None => {
                lines.push((rest, Ending::Eof));
                rest = &[];
            }
        }
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_lines_mixed_endings() {
        let input = b"one\r\ntwo\nthree\rfour";

        assert_eq!(
            split_lines(input),
            vec![
                (&b"one"[..], Ending::Crlf),
                (&b"two"[..], Ending::Lf),
                (&b"three"[..], Ending::Cr),
                (&b"four"[..], Ending::Eof),
            ]
        );
    }

    #[test]
    fn test_split_lines_trailing_newline_has_no_trailing_empty_line() {
        let input = b"only\n";

        assert_eq!(split_lines(input), vec![(&b"only"[..], Ending::Lf)]);
    }

    #[test]
    fn test_split_lines_empty_input() {
        assert_eq!(split_lines(b""), Vec::<(&[u8], Ending)>::new());
    }
}
