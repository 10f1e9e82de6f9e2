use encoding_rs::{Encoding, UTF_8};
use polars::prelude::{CsvReadOptions, SerReader};
use std::fs;
use std::io::Cursor;
use std::path::Path;
use tracing::{debug, info, instrument};

use crate::error::{EtlError, Result};
use crate::table::{unique_column_names, Table};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Reader for comma (or otherwise) delimited text with encoding fallback
#[derive(Debug, Clone)]
pub struct DelimitedReader {
    encodings: Vec<&'static Encoding>,
    delimiter: u8,
}

impl DelimitedReader {
    /// `labels` are WHATWG encoding labels (`utf-8`, `latin1`, `windows-1252`, ...)
    pub fn new(labels: &[String], delimiter: char) -> Result<Self> {
        let encodings = labels
            .iter()
            .map(|label| {
                Encoding::for_label(label.as_bytes())
                    .ok_or_else(|| EtlError::Config(format!("unknown encoding '{label}'")))
            })
            .collect::<Result<Vec<_>>>()?;
        if encodings.is_empty() {
            return Err(EtlError::Config(
                "at least one candidate encoding is required".to_string(),
            ));
        }
        if !delimiter.is_ascii() {
            return Err(EtlError::Config(format!(
                "delimiter '{delimiter}' must be ASCII"
            )));
        }
        Ok(Self {
            encodings,
            delimiter: delimiter as u8,
        })
    }

    #[instrument(skip(self), fields(path = %path.display()))]
    pub fn read_path(&self, path: &Path) -> Result<Table> {
        let bytes = fs::read(path).map_err(|source| EtlError::SourceRead {
            path: path.to_path_buf(),
            source,
        })?;
        let (text, encoding) = self.decode(path, &bytes)?;
        info!("Decoded {} as {}", path.display(), encoding.name());

        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("delimited");
        self.parse_str(name, &text)
    }

    /// Tries each candidate encoding in order. Only a decoding failure moves on
    /// to the next candidate.
    fn decode(&self, path: &Path, bytes: &[u8]) -> Result<(String, &'static Encoding)> {
        for &encoding in &self.encodings {
            let body = if encoding == UTF_8 && bytes.starts_with(UTF8_BOM) {
                &bytes[UTF8_BOM.len()..]
            } else {
                bytes
            };
            match encoding.decode_without_bom_handling_and_without_replacement(body) {
                Some(text) => return Ok((text.into_owned(), encoding)),
                None => debug!("{} is not valid {}, trying next encoding", path.display(), encoding.name()),
            }
        }
        Err(EtlError::Decode {
            path: path.to_path_buf(),
            tried: self.encodings.iter().map(|e| e.name().to_string()).collect(),
        })
    }

    /// Parses already-decoded text. Rows wider than the header are skipped,
    /// narrower rows are padded with nulls; column types are inferred from
    /// every row.
    pub fn parse_str(&self, name: &str, text: &str) -> Result<Table> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(self.delimiter)
            .flexible(true)
            .from_reader(text.as_bytes());

        let headers = header_names(reader.headers()?);
        if headers.is_empty() {
            debug!("{} has no header row", name);
            return Ok(Table::empty(name));
        }
        let width = headers.len();

        // Rewritten as rectangular comma-separated text for the dataframe reader
        let mut rectangular = csv::Writer::from_writer(Vec::new());
        rectangular.write_record(&headers)?;
        let mut skipped = 0usize;
        for result in reader.records() {
            let record = result?;
            if record.len() > width {
                skipped += 1;
                debug!(
                    line = record.position().map(|p| p.line()),
                    fields = record.len(),
                    expected = width,
                    "skipping malformed row"
                );
                continue;
            }
            let padding = width - record.len();
            rectangular.write_record(record.iter().chain(std::iter::repeat("").take(padding)))?;
        }
        if skipped > 0 {
            info!("Skipped {} malformed row(s) in {}", skipped, name);
        }
        let bytes = rectangular
            .into_inner()
            .map_err(|e| EtlError::Io(e.into_error()))?;

        let frame = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(None)
            .into_reader_with_file_handle(Cursor::new(bytes))
            .finish()?;
        Ok(Table::new(name, frame))
    }
}

/// Header cells with blanks named by position and repeats suffixed
fn header_names(record: &csv::StringRecord) -> Vec<String> {
    let names = record
        .iter()
        .enumerate()
        .map(|(i, h)| {
            if h.is_empty() {
                format!("Unnamed: {i}")
            } else {
                h.to_string()
            }
        })
        .collect();
    unique_column_names(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::DataType;
    use std::io::Write;
    use tempfile::tempdir;

    fn reader(labels: &[&str]) -> DelimitedReader {
        let labels: Vec<String> = labels.iter().map(|s| s.to_string()).collect();
        DelimitedReader::new(&labels, ',').unwrap()
    }

    #[test]
    fn test_infers_column_types() {
        let table = reader(&["utf-8"])
            .parse_str("t", "Index,Title,Energy\n1,Song,0.5\n2,Other,7\n")
            .unwrap();

        assert_eq!(table.columns(), vec!["Index", "Title", "Energy"]);
        assert_eq!(table.dtype("Index"), DataType::Int64);
        assert_eq!(table.dtype("Title"), DataType::String);
        assert_eq!(table.dtype("Energy"), DataType::Float64);
        assert_eq!(table.texts("Title"), vec![Some("Song".to_string()), Some("Other".to_string())]);
    }

    #[test]
    fn test_skips_wide_rows_and_pads_short_rows() {
        let table = reader(&["utf-8"])
            .parse_str("t", "a,b,c\n1,2,3\n4,5,6,7\n8,9\n")
            .unwrap();

        assert_eq!(table.row_count(), 2);
        assert_eq!(table.ints("a"), vec![Some(1), Some(8)]);
        assert_eq!(table.ints("c"), vec![Some(3), None]);
    }

    #[test]
    fn test_blank_and_repeated_headers() {
        let table = reader(&["utf-8"])
            .parse_str("t", "Title,,Title\nx,1,y\n")
            .unwrap();
        assert_eq!(table.columns(), vec!["Title", "Unnamed: 1", "Title.1"]);
    }

    #[test]
    fn test_empty_cells_are_null() {
        let table = reader(&["utf-8"])
            .parse_str("t", "Artist,Streams\nA,\n,10\n")
            .unwrap();
        assert_eq!(table.texts("Artist"), vec![Some("A".to_string()), None]);
        assert_eq!(table.ints("Streams"), vec![None, Some(10)]);
    }

    #[test]
    fn test_semicolon_delimiter() {
        let labels = vec!["utf-8".to_string()];
        let table = DelimitedReader::new(&labels, ';')
            .unwrap()
            .parse_str("t", "a;b\n1;x,y\n")
            .unwrap();
        assert_eq!(table.texts("b"), vec![Some("x,y".to_string())]);
    }

    #[test]
    fn test_falls_back_to_latin1() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("music.csv");
        let mut file = fs::File::create(&path).unwrap();
        // "Beyoncé" in latin1 is not valid UTF-8
        file.write_all(b"Artist,Year\nBeyonc\xE9,2008\n").unwrap();

        let table = reader(&["utf-8", "latin1"]).read_path(&path).unwrap();
        assert_eq!(table.name(), "music");
        assert_eq!(table.texts("Artist"), vec![Some("Beyoncé".to_string())]);
    }

    #[test]
    fn test_decode_error_when_no_candidate_fits() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.csv");
        fs::write(&path, b"Artist\n\xFF\xFE\n").unwrap();

        let err = reader(&["utf-8"]).read_path(&path).unwrap_err();
        assert!(matches!(err, EtlError::Decode { ref tried, .. } if tried == &vec!["UTF-8".to_string()]));
    }

    #[test]
    fn test_strips_utf8_bom() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bom.csv");
        fs::write(&path, b"\xEF\xBB\xBFArtist\nAdele\n").unwrap();

        let table = reader(&["utf-8"]).read_path(&path).unwrap();
        assert_eq!(table.columns(), vec!["Artist"]);
    }

    #[test]
    fn test_missing_file_is_a_source_read_error() {
        let err = reader(&["utf-8"])
            .read_path(Path::new("/nonexistent/Music Test.csv"))
            .unwrap_err();
        assert!(matches!(err, EtlError::SourceRead { .. }));
    }
}
