//! Sample logs in, trajectory tables out.
//!
//! Input is a CSV log with `Timestamp, accX, accY, GyrZ` columns, optionally
//! gzip-compressed, or a spreadsheet whose first sheet carries the same header
//! row. Output tables keep the column layout downstream plotting
//! scripts expect.

use std::fs::{self, File};
use std::io::{BufReader, Read, Seek, Write};
use std::path::Path;

use anyhow::{bail, Context, Result};
use calamine::{open_workbook_auto, Data, Range, RangeDeserializerBuilder, Reader, Xlsx};
use flate2::read::GzDecoder;
use log::{debug, info};
use serde::Serialize;

use crate::pipeline::{PipelineOutput, RunSummary};
use crate::types::InertialSample;

const REQUIRED_COLUMNS: [&str; 4] = ["Timestamp", "accX", "accY", "GyrZ"];

const SPREADSHEET_EXTENSIONS: [&str; 5] = ["xlsx", "xlsm", "xlsb", "xls", "ods"];

#[derive(Serialize)]
struct TrajectoryRow {
    #[serde(rename = "Time")]
    time: f64,
    #[serde(rename = "Position_X")]
    position_x: f64,
    #[serde(rename = "Position_Y")]
    position_y: f64,
    #[serde(rename = "Velocity_X")]
    velocity_x: f64,
    #[serde(rename = "Velocity_Y")]
    velocity_y: f64,
    #[serde(rename = "Orientation_Theta")]
    orientation_theta: f64,
}

#[derive(Serialize)]
struct SmoothedRow {
    #[serde(rename = "Time")]
    time: f64,
    #[serde(rename = "Position_X")]
    position_x: f64,
    #[serde(rename = "Position_Y")]
    position_y: f64,
    #[serde(rename = "Velocity_X")]
    velocity_x: f64,
    #[serde(rename = "Velocity_Y")]
    velocity_y: f64,
}

/// Load a sample log, gunzipping `*.gz` files and reading the first sheet of
/// spreadsheets (`*.xlsx`, `*.ods`, ...).
pub fn read_samples(path: &Path) -> Result<Vec<InertialSample>> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    let parsed = if SPREADSHEET_EXTENSIONS.contains(&extension.as_str()) {
        let mut workbook = open_workbook_auto(path)
            .with_context(|| format!("failed to open workbook {}", path.display()))?;
        let range = workbook
            .worksheet_range_at(0)
            .context("workbook has no worksheets")??;
        samples_from_range(&range)
    } else {
        let file =
            File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
        if extension == "gz" {
            read_samples_from(BufReader::new(GzDecoder::new(file)))
        } else {
            read_samples_from(BufReader::new(file))
        }
    };
    let samples =
        parsed.with_context(|| format!("failed to read samples from {}", path.display()))?;

    info!("Loaded {} samples from {}", samples.len(), path.display());
    Ok(samples)
}

pub fn read_samples_from<R: Read>(reader: R) -> Result<Vec<InertialSample>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = reader.headers()?.clone();
    check_columns(&headers.iter().collect::<Vec<_>>())?;

    let mut samples = Vec::new();
    for (row, record) in reader.deserialize::<InertialSample>().enumerate() {
        let sample = record.with_context(|| format!("malformed sample in data row {}", row + 1))?;
        samples.push(sample);
    }
    debug!("Parsed {} rows", samples.len());
    Ok(samples)
}

/// Read samples from the first sheet of an `.xlsx` workbook.
pub fn read_xlsx_samples_from<RS: Read + Seek>(reader: RS) -> Result<Vec<InertialSample>> {
    let mut workbook: Xlsx<RS> = Xlsx::new(reader)?;
    let range = workbook
        .worksheet_range_at(0)
        .context("workbook has no worksheets")??;
    samples_from_range(&range)
}

fn samples_from_range(range: &Range<Data>) -> Result<Vec<InertialSample>> {
    let headers: Vec<String> = range
        .rows()
        .next()
        .map(|row| row.iter().map(|cell| cell.to_string().trim().to_string()).collect())
        .unwrap_or_default();
    check_columns(&headers.iter().map(String::as_str).collect::<Vec<_>>())?;

    let rows = RangeDeserializerBuilder::with_headers(&REQUIRED_COLUMNS)
        .from_range::<_, InertialSample>(range)?;
    let mut samples = Vec::new();
    for (row, record) in rows.enumerate() {
        let sample =
            record.with_context(|| format!("malformed sample in data row {}", row + 1))?;
        samples.push(sample);
    }
    debug!("Parsed {} sheet rows", samples.len());
    Ok(samples)
}

fn check_columns(headers: &[&str]) -> Result<()> {
    let missing: Vec<&str> = REQUIRED_COLUMNS
        .iter()
        .copied()
        .filter(|column| !headers.contains(column))
        .collect();
    if !missing.is_empty() {
        bail!("missing required column(s): {}", missing.join(", "));
    }
    Ok(())
}

/// Write the dead-reckoned table (`Time, Position_X, Position_Y, Velocity_X,
/// Velocity_Y, Orientation_Theta`).
pub fn write_trajectory_csv(path: &Path, output: &PipelineOutput) -> Result<()> {
    let file = create(path)?;
    write_trajectory(file, output)
        .with_context(|| format!("failed to write trajectory to {}", path.display()))?;
    info!("Wrote {} trajectory rows to {}", output.len(), path.display());
    Ok(())
}

pub fn write_trajectory<W: Write>(writer: W, output: &PipelineOutput) -> Result<()> {
    let mut writer = csv::Writer::from_writer(writer);
    for (&time, point) in output.timestamps.iter().zip(output.trajectory.iter()) {
        writer.serialize(TrajectoryRow {
            time,
            position_x: point.position_x,
            position_y: point.position_y,
            velocity_x: point.velocity_x,
            velocity_y: point.velocity_y,
            orientation_theta: point.heading,
        })?;
    }
    writer.flush()?;
    Ok(())
}

/// Write the smoothed table (`Time, Position_X, Position_Y, Velocity_X, Velocity_Y`).
pub fn write_smoothed_csv(path: &Path, output: &PipelineOutput) -> Result<()> {
    let file = create(path)?;
    write_smoothed(file, output)
        .with_context(|| format!("failed to write smoothed track to {}", path.display()))?;
    info!("Wrote {} smoothed rows to {}", output.smoothed.len(), path.display());
    Ok(())
}

pub fn write_smoothed<W: Write>(writer: W, output: &PipelineOutput) -> Result<()> {
    let mut writer = csv::Writer::from_writer(writer);
    for (&time, state) in output.timestamps.iter().zip(output.smoothed.iter()) {
        writer.serialize(SmoothedRow {
            time,
            position_x: state.position_x,
            position_y: state.position_y,
            velocity_x: state.velocity_x,
            velocity_y: state.velocity_y,
        })?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_summary_json(path: &Path, summary: &RunSummary) -> Result<()> {
    ensure_parent(path)?;
    let data = serde_json::to_string_pretty(summary)?;
    fs::write(path, data).with_context(|| format!("failed to write {}", path.display()))?;
    info!("Wrote run summary to {}", path.display());
    Ok(())
}

fn create(path: &Path) -> Result<File> {
    ensure_parent(path)?;
    File::create(path).with_context(|| format!("failed to create {}", path.display()))
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}
