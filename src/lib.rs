//! Turns raw delimited text, or a `data:` URL carrying it, into a [`Table`]
//! without being told the delimiter, the quoting, or whether there is a
//! header row.

pub mod data;
pub mod error;

pub use data::data_url::{decode_base64_to_text, parse_data_url};
pub use data::parse::{
    detect_delimiter, is_loosely_numeric, normalize_line_endings, parse_csv, parse_csv_with,
    parse_input,
};
pub use data::{DataUrl, Delimiter, HeaderMode, InputFormat, OutputFormat, Table};
pub use error::{DecodeError, Error, FormatError, Result};
