use chrono::NaiveDateTime;
use csv::{ReaderBuilder, StringRecord, Trim};
use serde::{Deserialize, Serialize};

use crate::{
    prelude::*,
    quantity::{Quantity, power::Kilowatts},
};

/// Single instantaneous production sample.
#[must_use]
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub timestamp: NaiveDateTime,

    #[serde(rename = "power_kw")]
    pub power: Kilowatts,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub enum PowerUnit {
    #[default]
    #[serde(rename = "W")]
    Watts,

    #[serde(rename = "kW")]
    Kilowatts,
}

impl PowerUnit {
    const fn to_kilowatts(self, value: f64) -> Kilowatts {
        match self {
            Self::Watts => Kilowatts::from_watts(value),
            Self::Kilowatts => Quantity(value),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct CsvSettings {
    /// Exact timestamp column header, auto-detected when missing.
    pub timestamp_column: Option<String>,

    /// Exact power column header, auto-detected when missing.
    pub power_column: Option<String>,

    pub power_unit: PowerUnit,

    /// `strftime` patterns, tried in order.
    pub timestamp_formats: Vec<String>,

    pub delimiter: char,
}

impl Default for CsvSettings {
    fn default() -> Self {
        Self {
            timestamp_column: None,
            power_column: None,
            power_unit: PowerUnit::default(),
            timestamp_formats: [
                "%d/%m/%Y %H:%M",
                "%Y-%m-%d %H:%M:%S",
                "%Y-%m-%d %H:%M",
                "%m/%d/%Y %H:%M",
                "%Y-%m-%dT%H:%M:%S",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            delimiter: ',',
        }
    }
}

/// Indices of the columns the readings are taken from.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
struct Columns {
    timestamp: usize,
    power: usize,
}

impl Columns {
    fn resolve(headers: &StringRecord, settings: &CsvSettings) -> Result<Self> {
        ensure!(headers.len() >= 2, "the export must have at least two columns, got {headers:?}");

        let timestamp = match &settings.timestamp_column {
            Some(name) => Self::position(headers, name)?,
            None => headers
                .iter()
                .position(|header| {
                    let header = header.to_lowercase();
                    header.contains("time") || header.contains("date")
                })
                .unwrap_or(0),
        };
        let power = match &settings.power_column {
            Some(name) => Self::position(headers, name)?,
            None => headers
                .iter()
                .enumerate()
                .position(|(index, header)| {
                    let header = header.to_lowercase();
                    index != timestamp && header.contains("production") && header.contains("ac")
                })
                .unwrap_or(if timestamp == 1 { 0 } else { 1 }),
        };
        ensure!(timestamp != power, "timestamp and power cannot share column #{timestamp}");

        debug!(
            timestamp = headers.get(timestamp),
            power = headers.get(power),
            "resolved the columns",
        );
        Ok(Self { timestamp, power })
    }

    fn position(headers: &StringRecord, name: &str) -> Result<usize> {
        headers
            .iter()
            .position(|header| header.eq_ignore_ascii_case(name.trim()))
            .with_context(|| format!("column `{name}` is missing from {headers:?}"))
    }
}

/// Parses the portal export into [`Reading`]s.
#[must_use]
pub struct Reader<'a> {
    settings: &'a CsvSettings,
}

impl<'a> Reader<'a> {
    pub const fn new(settings: &'a CsvSettings) -> Self {
        Self { settings }
    }

    /// Lazily read the rows in file order.
    ///
    /// Fails only when the export is empty or its header cannot be used.
    /// Malformed rows are logged and skipped.
    #[instrument(skip_all)]
    pub fn read(&self, text: &'a str) -> Result<impl Iterator<Item = Reading> + 'a> {
        let text = text.trim_start_matches('\u{feff}');
        ensure!(!text.trim().is_empty(), "the export is empty");

        let delimiter = self.settings.delimiter;
        ensure!(
            delimiter.is_ascii(),
            "the CSV delimiter must be an ASCII character, got `{delimiter}`",
        );
        let delimiter = u8::try_from(delimiter)?;
        let mut reader = ReaderBuilder::new()
            .delimiter(delimiter)
            .flexible(true)
            .trim(Trim::All)
            .from_reader(text.as_bytes());
        let columns =
            Columns::resolve(reader.headers().context("failed to read the header")?, self.settings)?;

        let settings = self.settings;
        Ok(reader.into_records().filter_map(move |record| {
            let record = match record {
                Ok(record) => record,
                Err(error) => {
                    warn!("skipping an unreadable row: {error:#}");
                    return None;
                }
            };
            let line = record.position().map(csv::Position::line);
            match parse_record(&record, columns, settings) {
                Ok(reading) => reading,
                Err(error) => {
                    warn!(?line, "skipping a malformed row: {error:#}");
                    None
                }
            }
        }))
    }
}

/// Parse a single row, `Ok(None)` means an intentionally empty row.
fn parse_record(
    record: &StringRecord,
    columns: Columns,
    settings: &CsvSettings,
) -> Result<Option<Reading>> {
    let timestamp = record.get(columns.timestamp).context("missing the timestamp cell")?;
    let power = record.get(columns.power).context("missing the power cell")?;

    let Some(power) = parse_power(power)? else {
        debug!(timestamp, "no power value");
        return Ok(None);
    };
    Ok(Some(Reading {
        timestamp: parse_timestamp(timestamp, &settings.timestamp_formats)?,
        power: settings.power_unit.to_kilowatts(power),
    }))
}

fn parse_timestamp(value: &str, formats: &[String]) -> Result<NaiveDateTime> {
    formats
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .with_context(|| format!("unrecognised timestamp `{value}`"))
}

/// Strip thousands separators and unit suffixes, then parse.
fn parse_power(value: &str) -> Result<Option<f64>> {
    let cleaned = value.replace(',', "");
    let cleaned = cleaned.trim_end_matches(|c: char| c.is_ascii_alphabetic() || c.is_whitespace());
    if cleaned.is_empty()
        || cleaned == "-"
        || value.eq_ignore_ascii_case("none")
        || value.eq_ignore_ascii_case("null")
    {
        return Ok(None);
    }
    cleaned.parse().map(Some).with_context(|| format!("unrecognised power value `{value}`"))
}
