//! CSV loading

use crate::error::{ForecastError, Result};
use polars::prelude::*;
use std::fs::File;
use std::io::Cursor;
use std::path::Path;
use std::time::Instant;
use tracing::debug;

/// Loads historical sales tables
#[derive(Debug, Clone)]
pub struct DataLoader {
    /// Rows scanned for type inference (None = whole file)
    infer_schema_length: Option<usize>,
    separator: u8,
}

impl Default for DataLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl DataLoader {
    pub fn new() -> Self {
        Self {
            infer_schema_length: None,
            separator: b',',
        }
    }

    /// Limit the rows used to infer column types
    pub fn with_infer_schema_length(mut self, rows: usize) -> Self {
        self.infer_schema_length = Some(rows);
        self
    }

    pub fn with_separator(mut self, separator: u8) -> Self {
        self.separator = separator;
        self
    }

    fn options(&self) -> CsvReadOptions {
        CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(self.infer_schema_length)
            .with_parse_options(CsvParseOptions::default().with_separator(self.separator))
    }

    /// Load a CSV file
    pub fn load_csv(&self, path: impl AsRef<Path>) -> Result<DataFrame> {
        let path = path.as_ref();
        let start = Instant::now();
        let file = File::open(path).map_err(|e| {
            ForecastError::MalformedDataset(format!("cannot open {}: {}", path.display(), e))
        })?;

        let df = self.options().into_reader_with_file_handle(file).finish()?;
        debug!(
            path = %path.display(),
            rows = df.height(),
            cols = df.width(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "CSV loaded"
        );
        Ok(df)
    }

    /// Load CSV content already held in memory, e.g. an upload body
    pub fn load_csv_bytes(&self, bytes: impl Into<Vec<u8>>) -> Result<DataFrame> {
        let bytes = bytes.into();
        if bytes.iter().all(|b| b.is_ascii_whitespace()) {
            return Err(ForecastError::MalformedDataset("empty CSV".to_string()));
        }
        let df = self
            .options()
            .into_reader_with_file_handle(Cursor::new(bytes))
            .finish()?;
        Ok(df)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const CSV: &str = "Date,day_of_week,meal_period,is_holiday,weather,temperature,sales_last_30d_avg,no_of_servings\n\
01-03-2024,Friday,lunch,0,sunny,31,62.5,70\n\
02-03-2024,Saturday,dinner,1,rainy,24.5,64,81\n";

    #[test]
    fn test_load_csv_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(CSV.as_bytes()).unwrap();

        let df = DataLoader::new().load_csv(file.path()).unwrap();
        assert_eq!(df.height(), 2);
        assert_eq!(df.width(), 8);
    }

    #[test]
    fn test_load_csv_bytes() {
        let df = DataLoader::new().load_csv_bytes(CSV.as_bytes()).unwrap();
        assert_eq!(df.height(), 2);
        assert!(df.column("no_of_servings").is_ok());
    }

    #[test]
    fn test_missing_file() {
        let err = DataLoader::new().load_csv("/definitely/not/here.csv").unwrap_err();
        assert!(matches!(err, ForecastError::MalformedDataset(_)));
    }

    #[test]
    fn test_empty_bytes() {
        assert!(DataLoader::new().load_csv_bytes(Vec::new()).is_err());
    }
}
