/// Encoding-tolerant dataset loader
///
/// The raw bytes are decoded with each encoding of a fixed priority list in
/// turn. The first encoding whose text parses into a structurally valid table
/// wins and later encodings are never tried.

use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::Path;

use csv::StringRecord;
use log::{debug, info, warn};

use crate::core::table::{Column, Table};
use crate::error::DataFormatError;

/// Cell contents that are read as a missing value
pub const NA_TOKENS: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// Text encodings the loader knows how to try
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextEncoding {
    Utf8,
    Latin1,
    Iso8859_1,
    Windows1252,
    Utf16,
}

/// Order in which encodings are attempted
pub const ENCODING_PRIORITY: [TextEncoding; 5] = [
    TextEncoding::Utf8,
    TextEncoding::Latin1,
    TextEncoding::Iso8859_1,
    TextEncoding::Windows1252,
    TextEncoding::Utf16,
];

impl TextEncoding {
    pub fn label(self) -> &'static str {
        match self {
            TextEncoding::Utf8 => "utf-8",
            TextEncoding::Latin1 => "latin-1",
            TextEncoding::Iso8859_1 => "iso-8859-1",
            TextEncoding::Windows1252 => "cp1252",
            TextEncoding::Utf16 => "utf-16",
        }
    }

    /// Decode raw bytes, treating malformed input as an error
    ///
    /// # Arguments
    ///
    /// * `bytes` - Raw file contents
    ///
    /// # Returns
    ///
    /// The decoded text or a description of why decoding failed
    pub fn decode(self, bytes: &[u8]) -> Result<Cow<'_, str>, String> {
        match self {
            TextEncoding::Utf8 => {
                let body = bytes.strip_prefix(&[0xEFu8, 0xBB, 0xBF][..]).unwrap_or(bytes);
                std::str::from_utf8(body)
                    .map(Cow::Borrowed)
                    .map_err(|e| e.to_string())
            }
            // Every byte maps to the code point of the same value
            TextEncoding::Latin1 | TextEncoding::Iso8859_1 => {
                Ok(Cow::Owned(bytes.iter().map(|&b| char::from(b)).collect()))
            }
            TextEncoding::Windows1252 => encoding_rs::WINDOWS_1252
                .decode_without_bom_handling_and_without_replacement(bytes)
                .ok_or_else(|| "malformed windows-1252 sequence".to_string()),
            TextEncoding::Utf16 => {
                let (encoding, body) = match bytes {
                    [0xFF, 0xFE, rest @ ..] => (encoding_rs::UTF_16LE, rest),
                    [0xFE, 0xFF, rest @ ..] => (encoding_rs::UTF_16BE, rest),
                    _ => (sniff_utf16_byte_order(bytes)?, bytes),
                };

                if body.len() % 2 != 0 {
                    return Err("truncated UTF-16 code unit".to_string());
                }

                encoding
                    .decode_without_bom_handling_and_without_replacement(body)
                    .ok_or_else(|| "malformed UTF-16 sequence".to_string())
            }
        }
    }
}

/// Guess the byte order of UTF-16 text that has no byte order mark
///
/// ASCII-range text in UTF-16 has a zero high byte in every code unit, so
/// zero bytes cluster at odd offsets (little-endian) or even offsets
/// (big-endian). Input with no zero byte at all is not UTF-16.
fn sniff_utf16_byte_order(bytes: &[u8]) -> Result<&'static encoding_rs::Encoding, String> {
    let zeros_at = |parity: usize| {
        bytes
            .iter()
            .skip(parity)
            .step_by(2)
            .filter(|&&b| b == 0)
            .count()
    };

    let (even, odd) = (zeros_at(0), zeros_at(1));
    match (even, odd) {
        (0, 0) => Err("no byte order mark and no UTF-16 zero-byte pattern".to_string()),
        (even, odd) if odd >= even => Ok(encoding_rs::UTF_16LE),
        _ => Ok(encoding_rs::UTF_16BE),
    }
}

impl fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Load a delimited text file into a `Table`
///
/// # Arguments
///
/// * `path` - Path to the dataset
///
/// # Returns
///
/// The table together with the encoding that produced it, or a
/// `DataFormatError` naming the path when no encoding worked
pub fn load_table(path: &Path) -> Result<(Table, TextEncoding), DataFormatError> {
    info!("Loading dataset: {}", path.display());

    let bytes = fs::read(path).map_err(|e| DataFormatError {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    parse_bytes(&bytes).map_err(|failures| DataFormatError {
        path: path.to_path_buf(),
        reason: format!("no supported encoding worked ({})", failures.join("; ")),
    })
}

/// Try every encoding in priority order against in-memory bytes
///
/// # Returns
///
/// The first successful table and its encoding, or one failure message per
/// attempted encoding
pub fn parse_bytes(bytes: &[u8]) -> Result<(Table, TextEncoding), Vec<String>> {
    let mut failures = Vec::with_capacity(ENCODING_PRIORITY.len());

    for encoding in ENCODING_PRIORITY {
        info!("Trying encoding: {}", encoding);

        let attempt = encoding
            .decode(bytes)
            .and_then(|text| parse_delimited(&text));

        match attempt {
            Ok(table) => {
                let (rows, cols) = table.shape();
                info!("Parsed {} rows x {} columns using {}", rows, cols, encoding);
                return Ok((table, encoding));
            }
            Err(e) => {
                warn!("Failed with encoding {}: {}", encoding, e);
                failures.push(format!("{}: {}", encoding, e));
            }
        }
    }

    Err(failures)
}

/// Parse decoded text as a comma-separated table with a header row
///
/// Records shorter than the header are padded with missing values; longer
/// records make the whole text invalid.
pub fn parse_delimited(text: &str) -> Result<Table, String> {
    if text.contains('\0') {
        return Err("embedded NUL character".to_string());
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());

    let raw_headers = reader.headers().map_err(|e| e.to_string())?.clone();
    if raw_headers.is_empty() {
        return Err("no columns to parse".to_string());
    }

    let names = normalize_headers(&raw_headers);
    let width = names.len();
    let mut cells: Vec<Vec<Option<String>>> = vec![Vec::new(); width];

    for record in reader.records() {
        let record = record.map_err(|e| e.to_string())?;

        if record.len() > width {
            let line = record.position().map(|p| p.line()).unwrap_or(0);
            return Err(format!(
                "line {}: expected {} fields, saw {}",
                line,
                width,
                record.len()
            ));
        }

        for (index, column) in cells.iter_mut().enumerate() {
            let cell = record.get(index).filter(|value| !NA_TOKENS.contains(value));
            column.push(cell.map(str::to_string));
        }
    }

    let rows = cells.first().map(Vec::len).unwrap_or(0);
    let columns = names
        .into_iter()
        .zip(cells)
        .map(|(name, values)| infer_column(name, values, rows))
        .collect();

    Table::new(columns).map_err(|e| e.to_string())
}

/// Give every header a unique, non-empty name
///
/// A repeated name gets a `.N` suffix; the suffix is bumped until the
/// result collides with no earlier name, generated or not.
fn normalize_headers(raw: &StringRecord) -> Vec<String> {
    let mut counts: HashMap<String, usize> = HashMap::new();

    raw.iter()
        .enumerate()
        .map(|(index, name)| {
            let mut name = if name.is_empty() {
                format!("Unnamed: {}", index)
            } else {
                name.to_string()
            };

            let mut count = counts.get(&name).copied().unwrap_or(0);
            while count > 0 {
                counts.insert(name.clone(), count + 1);
                name = format!("{}.{}", name, count);
                count = counts.get(&name).copied().unwrap_or(0);
            }
            counts.insert(name.clone(), count + 1);
            name
        })
        .collect()
}

/// Decide the column type from its cells
///
/// A column is numeric when every present cell parses as a number. Columns of
/// an empty table are textual.
fn infer_column(name: String, values: Vec<Option<String>>, rows: usize) -> Column {
    if rows == 0 {
        return Column::text(name, values);
    }

    let parsed: Option<Vec<Option<f64>>> = values
        .iter()
        .map(|cell| match cell {
            Some(text) => text.trim().parse::<f64>().ok().map(Some),
            None => Some(None),
        })
        .collect();

    match parsed {
        Some(numbers) => {
            debug!("Column '{}' inferred as numeric", name);
            Column::numeric(name, numbers)
        }
        None => {
            debug!("Column '{}' inferred as text", name);
            Column::text(name, values)
        }
    }
}
