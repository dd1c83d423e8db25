use serde::Serialize;

pub mod data_url;
pub mod output;
pub mod parse;

pub use data_url::DataUrl;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Table {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headers: Option<Vec<String>>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    /// Returns the number of columns: the header width, or the width of the
    /// first row when there is no header. Rows may be wider or narrower.
    pub fn num_columns(&self) -> usize {
        self.headers
            .as_ref()
            .map(|h| h.len())
            .unwrap_or_else(|| self.rows.first().map_or(0, |r| r.len()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    /// Data URL if the input starts with `data:`, raw text otherwise.
    Auto,
    Csv,
    DataUrl,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderMode {
    Infer,
    Present,
    Absent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delimiter {
    Comma,
    Semicolon,
    Tab,
}

impl Delimiter {
    /// Candidates in tie-break order.
    pub const CANDIDATES: [Delimiter; 3] = [Delimiter::Comma, Delimiter::Semicolon, Delimiter::Tab];

    pub fn as_char(self) -> char {
        match self {
            Delimiter::Comma => ',',
            Delimiter::Semicolon => ';',
            Delimiter::Tab => '\t',
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Plain,
    Json,
    Csv,
}
