use std::borrow::Cow;
use std::fs;
use std::io::{self, IsTerminal, Read};
use std::path::Path;

use anyhow::{anyhow, Context};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};

use super::data_url::parse_data_url;
use super::{Delimiter, HeaderMode, InputFormat, Table};
use crate::error::Result;

const BOM: char = '\u{feff}';

static DECIMAL_LITERAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[+-]?([0-9]+\.?[0-9]*|\.[0-9]+)([eE][+-]?[0-9]+)?$").unwrap());

static RADIX_LITERAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^0([xX][0-9a-fA-F]+|[oO][0-7]+|[bB][01]+)$").unwrap());

/// Read from stdin and parse into a Table.
pub fn parse_stdin(format: InputFormat, header: HeaderMode) -> anyhow::Result<Table> {
    if io::stdin().is_terminal() {
        return Err(anyhow!(
            "no input provided; pipe data into datatab or pass a file path"
        ));
    }
    let mut input = String::new();
    io::stdin().read_to_string(&mut input)?;
    Ok(parse_input(&input, format, header)?)
}

pub fn parse_file(path: &Path, format: InputFormat, header: HeaderMode) -> anyhow::Result<Table> {
    let input = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    Ok(parse_input(&input, format, header)?)
}

/// Parse either a `data:` URL or raw delimited text into a Table
/// (testable core).
pub fn parse_input(input: &str, format: InputFormat, header: HeaderMode) -> Result<Table> {
    let text = match format {
        InputFormat::Csv => Cow::Borrowed(input),
        InputFormat::DataUrl => Cow::Owned(decode_data_url(input.trim())?),
        InputFormat::Auto => {
            let trimmed = input.trim();
            if trimmed.starts_with("data:") {
                Cow::Owned(decode_data_url(trimmed)?)
            } else {
                Cow::Borrowed(input)
            }
        }
    };

    Ok(parse_csv_with(&text, header))
}

fn decode_data_url(url: &str) -> Result<String> {
    let data_url = parse_data_url(url)?;
    if !data_url.mime.starts_with("text/") {
        warn!(
            "Data URL has mime type {}; reading it as text anyway",
            data_url.mime
        );
    }
    Ok(data_url.text()?)
}

/// Parse delimited text, guessing the delimiter and whether the first row
/// is a header. Never fails: malformed lines come through as ragged rows.
pub fn parse_csv(text: &str) -> Table {
    parse_csv_with(text, HeaderMode::Infer)
}

pub fn parse_csv_with(text: &str, header: HeaderMode) -> Table {
    let normalized = normalize_line_endings(text);
    let body = normalized.strip_prefix(BOM).unwrap_or(&normalized);

    // Blank lines are dropped, including intentionally empty rows.
    let lines: Vec<&str> = body.split('\n').filter(|line| !line.is_empty()).collect();
    let first_line = match lines.first() {
        Some(line) => *line,
        None => return Table::default(),
    };

    let delimiter = detect_delimiter(first_line);
    let mut rows: Vec<Vec<String>> = lines
        .iter()
        .map(|line| split_fields(line, delimiter))
        .collect();

    let has_header = match header {
        HeaderMode::Infer => rows.first().map_or(false, |row| is_header_row(row)),
        HeaderMode::Present => true,
        HeaderMode::Absent => false,
    };

    debug!(
        "Parsed {} lines with delimiter {:?}, header: {}",
        lines.len(),
        delimiter,
        has_header
    );

    if has_header {
        let headers = rows.remove(0);
        Table {
            headers: Some(headers),
            rows,
        }
    } else {
        Table {
            headers: None,
            rows,
        }
    }
}

/// Rewrite `\r\n` and lone `\r` as `\n`.
pub fn normalize_line_endings(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n")
}

/// Pick the candidate that occurs most often in `line`. Ties keep the
/// earlier candidate, and a line with none of them yields a comma.
pub fn detect_delimiter(line: &str) -> Delimiter {
    let mut delimiter = Delimiter::Comma;
    let mut max_count = 0;

    for candidate in Delimiter::CANDIDATES.iter().copied() {
        let count = line.matches(candidate.as_char()).count();
        if count > max_count {
            max_count = count;
            delimiter = candidate;
        }
    }

    delimiter
}

fn split_fields(line: &str, delimiter: Delimiter) -> Vec<String> {
    line.split(delimiter.as_char()).map(unquote_field).collect()
}

// Only fields quoted at both ends are unescaped; a stray or lone quote is
// kept as-is.
fn unquote_field(field: &str) -> String {
    if field.len() >= 2 && field.starts_with('"') && field.ends_with('"') {
        field[1..field.len() - 1].replace("\"\"", "\"")
    } else {
        field.to_string()
    }
}

fn is_header_row(row: &[String]) -> bool {
    row.iter().all(|field| !is_loosely_numeric(field))
}

// Unicode White_Space minus NEL, plus the BOM.
fn is_number_whitespace(c: char) -> bool {
    (c.is_whitespace() && c != '\u{85}') || c == BOM
}

/// Whether a field would coerce to a number under loose string-to-number
/// rules. Blank fields count as zero, so they are numeric.
pub fn is_loosely_numeric(field: &str) -> bool {
    let trimmed = field.trim_matches(is_number_whitespace);
    if trimmed.is_empty() {
        return true;
    }

    matches!(trimmed, "Infinity" | "+Infinity" | "-Infinity")
        || DECIMAL_LITERAL.is_match(trimmed)
        || RADIX_LITERAL.is_match(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, FormatError};
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn strings(fields: &[&str]) -> Vec<String> {
        fields.iter().map(|f| f.to_string()).collect()
    }

    // --- Sniffing ---

    #[test]
    fn csv_with_inferred_header() {
        let table = parse_csv("a,b,c\n1,2,3");

        assert_eq!(table.headers, Some(strings(&["a", "b", "c"])));
        assert_eq!(table.rows, vec![strings(&["1", "2", "3"])]);
    }

    #[test]
    fn numeric_first_row_is_data() {
        let table = parse_csv("1,2,3\n4,5,6");

        assert_eq!(table.headers, None);
        assert_eq!(
            table.rows,
            vec![strings(&["1", "2", "3"]), strings(&["4", "5", "6"])]
        );
    }

    #[test]
    fn one_numeric_field_makes_first_row_data() {
        let table = parse_csv("name,2021\nAlice,30");

        assert_eq!(table.headers, None);
        assert_eq!(table.rows.len(), 2);
    }

    #[test]
    fn blank_first_row_is_data() {
        let table = parse_csv(",,\nx,y,z");

        assert_eq!(table.headers, None);
        assert_eq!(table.rows[0], strings(&["", "", ""]));
    }

    #[test]
    fn csv_empty() {
        assert_eq!(parse_csv(""), Table::default());
        assert_eq!(parse_csv("\n\n"), Table::default());
        assert_eq!(parse_csv("\r\n\r"), Table::default());
        assert_eq!(parse_csv("\u{feff}"), Table::default());
    }

    #[test]
    fn semicolon_wins_on_first_line() {
        let table = parse_csv("\"a,b\";c;\"d\"\"e\"");

        assert_eq!(table.headers, Some(strings(&["a,b", "c", "d\"e"])));
        assert!(table.rows.is_empty());
    }

    #[test]
    fn tab_separated() {
        let table = parse_csv("name\tage\nAlice\t30\nBob\t25");

        assert_eq!(table.headers, Some(strings(&["name", "age"])));
        assert_eq!(
            table.rows,
            vec![strings(&["Alice", "30"]), strings(&["Bob", "25"])]
        );
    }

    #[test]
    fn delimiter_comes_from_first_line_only() {
        let table = parse_csv("a;b\nc,d;e,f");

        assert_eq!(table.headers, Some(strings(&["a", "b"])));
        assert_eq!(table.rows, vec![strings(&["c,d", "e,f"])]);
    }

    #[test]
    fn no_delimiter_gives_single_field_rows() {
        let table = parse_csv("item\napple\nbanana");

        assert_eq!(table.headers, Some(strings(&["item"])));
        assert_eq!(table.rows, vec![strings(&["apple"]), strings(&["banana"])]);
    }

    #[test]
    fn ragged_rows_are_kept() {
        let table = parse_csv("a,b\nc");
        assert_eq!(table.headers, Some(strings(&["a", "b"])));
        assert_eq!(table.rows, vec![strings(&["c"])]);

        let table = parse_csv("1,2\n3\n4,5,6");
        assert_eq!(table.headers, None);
        assert_eq!(
            table.rows,
            vec![strings(&["1", "2"]), strings(&["3"]), strings(&["4", "5", "6"])]
        );
    }

    #[test]
    fn crlf_bom_and_blank_lines() {
        let table = parse_csv("\u{feff}name,age\r\n\r\nAlice,30\rBob,25\r\n");

        assert_eq!(table.headers, Some(strings(&["name", "age"])));
        assert_eq!(
            table.rows,
            vec![strings(&["Alice", "30"]), strings(&["Bob", "25"])]
        );
    }

    #[test]
    fn quotes_only_stripped_when_on_both_ends() {
        let table = parse_csv("x,y,z,w\n\"a,b\"c,\"\",\",say \"\"hi\"\"");

        // The quoted comma is not protected, so the first field splits.
        assert_eq!(
            table.rows,
            vec![strings(&["\"a", "b\"c", "", "\"", "say \"\"hi\"\""])]
        );
    }

    #[test]
    fn lone_quote_field_is_kept() {
        let table = parse_csv("h,k\n\",x");

        assert_eq!(table.headers, Some(strings(&["h", "k"])));
        assert_eq!(table.rows, vec![strings(&["\"", "x"])]);
    }

    #[test]
    fn doubled_quotes_unescape_inside_quoted_field() {
        let table = parse_csv("h\n\"say \"\"hi\"\"\"");
        assert_eq!(table.rows, vec![strings(&["say \"hi\""])]);
    }

    #[test]
    fn header_mode_overrides_inference() {
        let table = parse_csv_with("1,2\n3,4", HeaderMode::Present);
        assert_eq!(table.headers, Some(strings(&["1", "2"])));
        assert_eq!(table.rows, vec![strings(&["3", "4"])]);

        let table = parse_csv_with("a,b\nc,d", HeaderMode::Absent);
        assert_eq!(table.headers, None);
        assert_eq!(table.rows.len(), 2);
    }

    // --- Heuristics ---

    #[test]
    fn delimiter_ties_prefer_earlier_candidates() {
        assert_eq!(detect_delimiter("a,b;c"), Delimiter::Comma);
        assert_eq!(detect_delimiter("a;b\tc"), Delimiter::Semicolon);
        assert_eq!(detect_delimiter("a\tb\tc,d"), Delimiter::Tab);
        assert_eq!(detect_delimiter("abc"), Delimiter::Comma);
    }

    #[test]
    fn loose_numeric_coercion() {
        for field in &[
            "", "  ", "0", "-1", "+2.5", "3.", ".5", "1e10", "1E-3", " 42 ", "0x1F", "0b101",
            "0o17", "Infinity", "-Infinity",
        ] {
            assert!(is_loosely_numeric(field), "expected {field:?} to be numeric");
        }

        for field in &[
            "a", "NaN", "inf", "infinity", "1,5", "1.2.3", ".", "-", "e5", "0x", "-0x1F", "12px",
            "١٢",
        ] {
            assert!(!is_loosely_numeric(field), "expected {field:?} not to be numeric");
        }
    }

    #[test]
    fn number_whitespace_excludes_next_line() {
        assert!(!is_loosely_numeric("\u{85}"));
        assert!(!is_loosely_numeric("\u{85}1"));
        assert!(is_loosely_numeric("\u{a0}1\u{2028}"));
        assert!(is_loosely_numeric("\u{feff}7\u{3000}"));
    }

    #[test]
    fn normalize_line_endings_rewrites_carriage_returns() {
        assert_eq!(normalize_line_endings("a\r\nb\rc\n"), "a\nb\nc\n");
        assert_eq!(normalize_line_endings("\r\r\n"), "\n\n");
    }

    // --- Input composition ---

    #[test]
    fn auto_detects_base64_data_url() {
        // "name,age\nAlice,30\n"
        let input = "data:text/csv;base64,bmFtZSxhZ2UKQWxpY2UsMzAK\n";
        let table = parse_input(input, InputFormat::Auto, HeaderMode::Infer).unwrap();

        assert_eq!(table.headers, Some(strings(&["name", "age"])));
        assert_eq!(table.rows, vec![strings(&["Alice", "30"])]);
    }

    #[test]
    fn plain_data_url_payload_is_parsed_as_is() {
        let input = "data:text/csv,1;2;3";
        let table = parse_input(input, InputFormat::DataUrl, HeaderMode::Infer).unwrap();

        assert_eq!(table.headers, None);
        assert_eq!(table.rows, vec![strings(&["1", "2", "3"])]);
    }

    #[test]
    fn csv_format_never_decodes() {
        let table = parse_input("data:x,y", InputFormat::Csv, HeaderMode::Absent).unwrap();
        assert_eq!(table.rows, vec![strings(&["data:x", "y"])]);
    }

    #[test]
    fn data_url_errors_propagate() {
        let result = parse_input("a,b", InputFormat::DataUrl, HeaderMode::Infer);
        assert!(matches!(
            result,
            Err(Error::Format(FormatError::NotDataUrl))
        ));

        let result = parse_input("data:;base64,!!!", InputFormat::Auto, HeaderMode::Infer);
        assert!(matches!(result, Err(Error::Decode(_))));
    }

    proptest! {
        #[test]
        fn normalization_is_idempotent(text in "[a-z,;\t\r\n\"]{0,64}") {
            let once = normalize_line_endings(&text);
            prop_assert_eq!(normalize_line_endings(&once), once.clone());
            prop_assert!(!once.contains('\r'));
        }

        #[test]
        fn header_takes_exactly_one_line(text in "[a-z0-9,;\t\r\n\"]{0,64}") {
            let non_empty_lines = normalize_line_endings(&text)
                .split('\n')
                .filter(|line| !line.is_empty())
                .count();
            let table = parse_csv(&text);
            let expected = if table.headers.is_some() {
                non_empty_lines - 1
            } else {
                non_empty_lines
            };
            prop_assert_eq!(table.rows.len(), expected);
        }

        #[test]
        fn arbitrary_text_never_panics(text in any::<String>()) {
            let _ = parse_csv(&text);
        }
    }
}
