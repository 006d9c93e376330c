//! Export projection and encoders.
//!
//! The projection fixes which columns leave the system and in what order.
//! Encoders turn projected rows into file bytes.

use std::fmt;
use std::str::FromStr;

use rust_xlsxwriter::{Format, Workbook, XlsxError};
use serde::Serialize;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use weatherdash_types::WeatherRecord;

use crate::error::{Error, Result};

/// Export columns, in output order. `feels_like` and the raw payload are
/// never exported.
pub const EXPORT_COLUMNS: [&str; 9] = [
    "timestamp",
    "location",
    "latitude",
    "longitude",
    "temperature",
    "humidity",
    "wind_speed",
    "condition",
    "rain_probability",
];

/// One exported row. Field order matches [`EXPORT_COLUMNS`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportRow {
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub location: String,
    pub latitude: f64,
    pub longitude: f64,
    pub temperature: f64,
    pub humidity: f64,
    pub wind_speed: f64,
    pub condition: String,
    pub rain_probability: f64,
}

impl From<&WeatherRecord> for ExportRow {
    fn from(record: &WeatherRecord) -> Self {
        Self {
            timestamp: record.timestamp,
            location: record.location.clone(),
            latitude: record.latitude,
            longitude: record.longitude,
            temperature: record.temperature,
            humidity: record.humidity,
            wind_speed: record.wind_speed,
            condition: record.condition.clone(),
            rain_probability: record.rain_probability,
        }
    }
}

/// Project records onto export rows, keeping their order.
pub fn project(records: &[WeatherRecord]) -> Vec<ExportRow> {
    records.iter().map(ExportRow::from).collect()
}

/// File formats a client may ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Xlsx,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Xlsx => "xlsx",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            ExportFormat::Csv => "text/csv; charset=utf-8",
            ExportFormat::Xlsx => {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            }
        }
    }
}

impl FromStr for ExportFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "xlsx" => Ok(ExportFormat::Xlsx),
            other => Err(Error::UnsupportedFormat(other.to_string())),
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Turns export rows into file bytes.
pub trait ExportEncoder: Send + Sync {
    fn format(&self) -> ExportFormat;

    fn encode(&self, rows: &[ExportRow]) -> Result<Vec<u8>>;
}

/// CSV with a header line and every cell quoted.
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvEncoder;

impl ExportEncoder for CsvEncoder {
    fn format(&self) -> ExportFormat {
        ExportFormat::Csv
    }

    fn encode(&self, rows: &[ExportRow]) -> Result<Vec<u8>> {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .quote_style(csv::QuoteStyle::Always)
            .from_writer(Vec::new());

        writer.write_record(EXPORT_COLUMNS)?;
        for row in rows {
            writer.serialize(row)?;
        }

        writer
            .into_inner()
            .map_err(|e| Error::Encode(std::io::Error::other(e.to_string()).into()))
    }
}

/// Name of the single sheet in an xlsx export.
pub const XLSX_SHEET_NAME: &str = "Weather Data";

/// Excel workbook with one sheet: a bold header row, then one row per record.
///
/// Numbers stay numeric cells; the timestamp is written as RFC 3339 text.
#[derive(Debug, Clone, Copy, Default)]
pub struct XlsxEncoder;

impl ExportEncoder for XlsxEncoder {
    fn format(&self) -> ExportFormat {
        ExportFormat::Xlsx
    }

    fn encode(&self, rows: &[ExportRow]) -> Result<Vec<u8>> {
        let mut workbook = Workbook::new();
        let header_format = Format::new().set_bold();

        let worksheet = workbook.add_worksheet();
        worksheet.set_name(XLSX_SHEET_NAME)?;

        for (col, name) in (0u16..).zip(EXPORT_COLUMNS) {
            worksheet.write_string_with_format(0, col, name, &header_format)?;
        }

        for (i, row) in rows.iter().enumerate() {
            let line = u32::try_from(i + 1).map_err(|_| XlsxError::RowColumnLimitError)?;
            worksheet.write_string(line, 0, row.timestamp.format(&Rfc3339)?)?;
            worksheet.write_string(line, 1, row.location.as_str())?;
            worksheet.write_number(line, 2, row.latitude)?;
            worksheet.write_number(line, 3, row.longitude)?;
            worksheet.write_number(line, 4, row.temperature)?;
            worksheet.write_number(line, 5, row.humidity)?;
            worksheet.write_number(line, 6, row.wind_speed)?;
            worksheet.write_string(line, 7, row.condition.as_str())?;
            worksheet.write_number(line, 8, row.rain_probability)?;
        }

        Ok(workbook.save_to_buffer()?)
    }
}

/// The encoder for a format.
pub fn encoder_for(format: ExportFormat) -> Result<Box<dyn ExportEncoder>> {
    match format {
        ExportFormat::Csv => Ok(Box::new(CsvEncoder)),
        ExportFormat::Xlsx => Ok(Box::new(XlsxEncoder)),
    }
}

/// An encoded export, ready to be served as a download.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportFile {
    pub content_type: &'static str,
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl ExportFile {
    /// `weather-data-YYYY-MM-DD.<ext>`, dated in UTC.
    pub fn filename_for(format: ExportFormat, now: OffsetDateTime) -> String {
        let date = now.to_offset(time::UtcOffset::UTC).date();
        format!(
            "weather-data-{:04}-{:02}-{:02}.{}",
            date.year(),
            u8::from(date.month()),
            date.day(),
            format.extension()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn record() -> WeatherRecord {
        WeatherRecord {
            timestamp: datetime!(2025-04-02 15:00:00 UTC),
            location: "Recife, Brasil".to_string(),
            latitude: -8.05,
            longitude: -34.9,
            temperature: 29.5,
            feels_like: 33.1,
            humidity: 70.0,
            wind_speed: 12.4,
            condition: "partly_cloudy".to_string(),
            rain_probability: 0.25,
        }
    }

    #[test]
    fn test_projection_excludes_feels_like() {
        let row = ExportRow::from(&record());
        let value = serde_json::to_value(&row).unwrap();
        let object = value.as_object().unwrap();

        assert_eq!(object.len(), EXPORT_COLUMNS.len());
        assert!(!object.contains_key("feels_like"));
        assert!(!object.contains_key("raw"));
        for column in EXPORT_COLUMNS {
            assert!(object.contains_key(column), "missing {column}");
        }
    }

    #[test]
    fn test_csv_header_and_quoting() {
        let bytes = CsvEncoder.encode(&project(&[record()])).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let mut lines = text.lines();

        assert_eq!(
            lines.next().unwrap(),
            "\"timestamp\",\"location\",\"latitude\",\"longitude\",\"temperature\",\"humidity\",\"wind_speed\",\"condition\",\"rain_probability\""
        );
        assert_eq!(
            lines.next().unwrap(),
            "\"2025-04-02T15:00:00Z\",\"Recife, Brasil\",\"-8.05\",\"-34.9\",\"29.5\",\"70.0\",\"12.4\",\"partly_cloudy\",\"0.25\""
        );
        assert!(lines.next().is_none());
    }

    #[test]
    fn test_csv_empty_still_has_header() {
        let bytes = CsvEncoder.encode(&[]).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert_eq!(text.lines().count(), 1);
        assert!(text.starts_with("\"timestamp\""));
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!("csv".parse::<ExportFormat>().unwrap(), ExportFormat::Csv);
        assert_eq!("XLSX".parse::<ExportFormat>().unwrap(), ExportFormat::Xlsx);
        assert!(matches!(
            "pdf".parse::<ExportFormat>(),
            Err(Error::UnsupportedFormat(f)) if f == "pdf"
        ));
    }

    #[test]
    fn test_encoder_for_every_format() {
        for format in [ExportFormat::Csv, ExportFormat::Xlsx] {
            assert_eq!(encoder_for(format).unwrap().format(), format);
        }
    }

    #[test]
    fn test_xlsx_is_zip_workbook() {
        let bytes = XlsxEncoder.encode(&project(&[record(), record()])).unwrap();
        assert!(bytes.starts_with(b"PK\x03\x04"));

        let empty = XlsxEncoder.encode(&[]).unwrap();
        assert!(empty.starts_with(b"PK\x03\x04"));
        assert!(bytes.len() > empty.len());
    }

    #[test]
    fn test_filename() {
        let name = ExportFile::filename_for(ExportFormat::Csv, datetime!(2025-04-02 23:30:00 -03:00));
        assert_eq!(name, "weather-data-2025-04-03.csv");
    }
}
