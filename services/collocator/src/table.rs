//! Sample table I/O.
//!
//! The input is a CSV table with a header row. Every input column is passed
//! through to the output unchanged and in order; the collocated columns
//! follow. An output column whose name already exists in the input replaces
//! that column's values in place.

use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::Path;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use collocation::{Extracted, SampleRecord};
use csv::StringRecord;
use tracing::debug;

use crate::config::ColumnNames;

/// An input table and the samples parsed from it, row for row.
#[derive(Debug, Clone)]
pub struct SampleTable {
    headers: Vec<String>,
    rows: Vec<StringRecord>,
    samples: Vec<SampleRecord>,
}

struct ColumnIndex {
    year: usize,
    month: usize,
    day: usize,
    lat: usize,
    lon: usize,
}

impl SampleTable {
    /// Read a CSV file.
    pub fn read(path: &Path, columns: &ColumnNames) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open input table {:?}", path))?;
        Self::from_reader(file, columns)
            .with_context(|| format!("Failed to read input table {:?}", path))
    }

    /// Read CSV from any reader.
    ///
    /// Fails if a required column is missing or a date or coordinate cell
    /// cannot be parsed.
    pub fn from_reader<R: Read>(reader: R, columns: &ColumnNames) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(reader);

        let headers: Vec<String> = rdr.headers()?.iter().map(str::to_string).collect();
        let index = locate_columns(&headers, columns)?;
        debug!(columns = headers.len(), "Read CSV header");

        let mut rows = Vec::new();
        let mut samples = Vec::new();
        for (row, result) in rdr.records().enumerate() {
            let record =
                result.with_context(|| format!("Malformed CSV record at row {}", row + 1))?;

            let date = parse_date(&record, &index, columns, row)?;
            let lat = parse_coordinate(&record, index.lat, &columns.lat, row)?;
            let lon = parse_coordinate(&record, index.lon, &columns.lon, row)?;

            samples.push(SampleRecord::new(row, date, lat, lon));
            rows.push(record);
        }

        Ok(Self {
            headers,
            rows,
            samples,
        })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> &[SampleRecord] {
        &self.samples
    }

    pub fn samples_mut(&mut self) -> &mut [SampleRecord] {
        &mut self.samples
    }

    /// Write the table with `output_columns` to a CSV file, creating its
    /// directory if needed.
    pub fn write(&self, path: &Path, output_columns: &[String], no_data: &str) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create output directory {:?}", parent))?;
        }
        let file = File::create(path)
            .with_context(|| format!("Failed to create output file {:?}", path))?;
        self.write_to(file, output_columns, no_data)
            .with_context(|| format!("Failed to write output table {:?}", path))
    }

    /// Write the table with `output_columns` as CSV.
    ///
    /// "No data" cells are written as `no_data`. A sample left without an
    /// output (cancelled run) keeps the input value of an existing column.
    pub fn write_to<W: Write>(
        &self,
        writer: W,
        output_columns: &[String],
        no_data: &str,
    ) -> Result<()> {
        let mut header = self.headers.clone();
        let mut targets: Vec<(usize, &str)> = Vec::with_capacity(output_columns.len());
        for column in output_columns {
            let position = match header.iter().position(|h| h == column) {
                Some(i) => i,
                None => {
                    header.push(column.clone());
                    header.len() - 1
                }
            };
            targets.push((position, column.as_str()));
        }

        let mut wtr = csv::Writer::from_writer(writer);
        wtr.write_record(&header)?;

        for (record, sample) in self.rows.iter().zip(&self.samples) {
            let mut cells: Vec<String> = record.iter().map(str::to_string).collect();
            let passthrough = cells.len();
            cells.resize(header.len(), String::new());

            for &(position, column) in &targets {
                match sample.output(column) {
                    Some(value) => cells[position] = format_cell(value, no_data),
                    None if position >= passthrough => cells[position] = no_data.to_string(),
                    None => {}
                }
            }
            wtr.write_record(&cells)?;
        }

        wtr.flush()?;
        Ok(())
    }
}

/// Text of one output cell.
pub fn format_cell(value: &Extracted, no_data: &str) -> String {
    match value {
        Extracted::Value(v) => v.to_string(),
        Extracted::NoData(_) => no_data.to_string(),
    }
}

fn locate_columns(headers: &[String], columns: &ColumnNames) -> Result<ColumnIndex> {
    let position = |name: &str| headers.iter().position(|h| h == name);

    let required = [
        &columns.year,
        &columns.month,
        &columns.day,
        &columns.lat,
        &columns.lon,
    ];
    let missing: Vec<&str> = required
        .iter()
        .filter(|name| position(name).is_none())
        .map(|name| name.as_str())
        .collect();
    if !missing.is_empty() {
        bail!("Missing columns in input table: {:?}", missing);
    }

    // All present, checked above
    let at = |name: &str| position(name).unwrap_or_default();
    Ok(ColumnIndex {
        year: at(&columns.year),
        month: at(&columns.month),
        day: at(&columns.day),
        lat: at(&columns.lat),
        lon: at(&columns.lon),
    })
}

fn cell<'r>(record: &'r StringRecord, index: usize) -> &'r str {
    record.get(index).unwrap_or("").trim()
}

/// Integer cell, also accepting integral floats such as `2020.0`.
fn parse_integer(raw: &str) -> Option<i64> {
    if let Ok(v) = raw.parse::<i64>() {
        return Some(v);
    }
    let v: f64 = raw.parse().ok()?;
    (v.is_finite() && v.fract() == 0.0).then_some(v as i64)
}

fn parse_date(
    record: &StringRecord,
    index: &ColumnIndex,
    columns: &ColumnNames,
    row: usize,
) -> Result<NaiveDate> {
    let part = |i: usize, name: &str| -> Result<i64> {
        let raw = cell(record, i);
        parse_integer(raw)
            .with_context(|| format!("Row {}: cannot parse {} value {:?}", row + 1, name, raw))
    };

    let year = part(index.year, &columns.year)?;
    let month = part(index.month, &columns.month)?;
    let day = part(index.day, &columns.day)?;

    let date = i32::try_from(year).ok().and_then(|y| {
        NaiveDate::from_ymd_opt(y, u32::try_from(month).ok()?, u32::try_from(day).ok()?)
    });
    match date {
        Some(date) => Ok(date),
        None => bail!(
            "Row {}: invalid date {}-{}-{}",
            row + 1,
            year,
            month,
            day
        ),
    }
}

fn parse_coordinate(record: &StringRecord, index: usize, name: &str, row: usize) -> Result<f64> {
    let raw = cell(record, index);
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => bail!("Row {}: cannot parse {} value {:?}", row + 1, name, raw),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use collocation::NoDataReason;

    const INPUT: &str = "\
Station,Year,Month,Day,LATITUDE,LONGITUDE,CHL
A,2020,3,15,41.05,-8.7,9.9
B,2020.0,03,16,41.0,351.3,
";

    fn table() -> SampleTable {
        SampleTable::from_reader(INPUT.as_bytes(), &ColumnNames::default()).unwrap()
    }

    #[test]
    fn test_read_samples() {
        let table = table();
        assert_eq!(table.len(), 2);
        assert_eq!(table.headers()[0], "Station");

        let b = &table.samples()[1];
        assert_eq!(b.row, 1);
        assert_eq!(b.date, NaiveDate::from_ymd_opt(2020, 3, 16).unwrap());
        assert_eq!(b.lon, 351.3);
    }

    #[test]
    fn test_missing_columns_are_reported() {
        let columns = ColumnNames {
            lat: "lat".to_string(),
            lon: "lon".to_string(),
            ..Default::default()
        };
        let err = SampleTable::from_reader(INPUT.as_bytes(), &columns).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("lat") && message.contains("lon"), "{}", message);
    }

    #[test]
    fn test_bad_cells_are_fatal() {
        let bad_day = "Year,Month,Day,LATITUDE,LONGITUDE\n2020,2,30,0,0\n";
        assert!(SampleTable::from_reader(bad_day.as_bytes(), &ColumnNames::default()).is_err());

        let bad_lat = "Year,Month,Day,LATITUDE,LONGITUDE\n2020,2,3,north,0\n";
        assert!(SampleTable::from_reader(bad_lat.as_bytes(), &ColumnNames::default()).is_err());

        let fractional = "Year,Month,Day,LATITUDE,LONGITUDE\n2020,2.5,3,0,0\n";
        assert!(SampleTable::from_reader(fractional.as_bytes(), &ColumnNames::default()).is_err());
    }

    #[test]
    fn test_write_appends_and_overwrites() {
        let mut table = table();
        let samples = table.samples_mut();
        samples[0].outputs.insert("CHL".into(), Extracted::Value(0.42));
        samples[0]
            .outputs
            .insert("BBP".into(), Extracted::NoData(NoDataReason::OutOfTolerance));
        samples[1]
            .outputs
            .insert("CHL".into(), Extracted::NoData(NoDataReason::ProductUnavailable));
        samples[1].outputs.insert("BBP".into(), Extracted::Value(0.003));

        let mut out = Vec::new();
        table
            .write_to(&mut out, &["CHL".to_string(), "BBP".to_string()], "NaN")
            .unwrap();

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Station,Year,Month,Day,LATITUDE,LONGITUDE,CHL,BBP");
        assert_eq!(lines[1], "A,2020,3,15,41.05,-8.7,0.42,NaN");
        assert_eq!(lines[2], "B,2020.0,03,16,41.0,351.3,NaN,0.003");
    }

    #[test]
    fn test_unprocessed_rows_keep_input_values() {
        let table = table();
        let mut out = Vec::new();
        table
            .write_to(&mut out, &["CHL".to_string(), "NANO".to_string()], "")
            .unwrap();

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[1], "A,2020,3,15,41.05,-8.7,9.9,");
    }

    #[test]
    fn test_write_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("out.csv");
        table().write(&path, &[], "NaN").unwrap();
        assert!(path.exists());
    }
}
