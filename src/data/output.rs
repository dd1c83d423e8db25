use anyhow::{Context, Result};

use super::{OutputFormat, Table};

pub fn format_table(table: &Table, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string(table)?),
        OutputFormat::Plain => {
            let lines: Vec<String> = table
                .headers
                .iter()
                .chain(table.rows.iter())
                .map(|row| row.join(","))
                .collect();
            Ok(lines.join("\n"))
        }
        OutputFormat::Csv => csv_encode_rows(table.headers.iter().chain(table.rows.iter())),
    }
}

pub fn format_row(table: &Table, format: OutputFormat, row_idx: usize) -> Result<String> {
    let row = table
        .rows
        .get(row_idx)
        .with_context(|| format!("row {row_idx} is out of range"))?;

    match format {
        OutputFormat::Plain => Ok(row.join(",")),
        OutputFormat::Csv => csv_encode_rows(std::iter::once(row)),
        OutputFormat::Json => {
            if let Some(headers) = &table.headers {
                // Cells past the last header, and cells under a repeated
                // header name, are keyed by column index. Missing cells are empty.
                let width = headers.len().max(row.len());
                let mut obj = serde_json::Map::new();
                for i in 0..width {
                    let key = match headers.get(i) {
                        Some(h) if !obj.contains_key(h) => h.clone(),
                        _ => i.to_string(),
                    };
                    let val = row.get(i).cloned().unwrap_or_default();
                    obj.insert(key, serde_json::Value::String(val));
                }
                Ok(serde_json::to_string(&obj)?)
            } else {
                Ok(serde_json::to_string(row)?)
            }
        }
    }
}

fn csv_encode_rows<'a>(rows: impl Iterator<Item = &'a Vec<String>>) -> Result<String> {
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_writer(Vec::new());
    for row in rows {
        wtr.write_record(row)?;
    }
    wtr.flush()?;
    let bytes = wtr.into_inner().map_err(|err| err.into_error())?;
    Ok(String::from_utf8(bytes)?.trim_end().to_string())
}
