//! CSV parsing for the bulk vehicle importer.
//!
//! Garage exports are inconsistent about header names and column order, so
//! columns are located by case-insensitive alias rather than position. Rows
//! may be short; missing cells read as blank. Values are trimmed and blanks
//! become `None`. Registrations are passed through untouched: validation
//! belongs to the importer so rejected rows are counted rather than lost.

use std::io::Read;

use chrono::NaiveDate;
use csv::{ReaderBuilder, StringRecord};
use thiserror::Error;

use crate::domain::{VehicleDetails, VehicleImportRow};

const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%d/%m/%Y"];

/// Errors that stop a CSV parse outright.
#[derive(Debug, Error)]
pub enum CsvImportError {
    /// No header matched any registration alias.
    #[error("no registration column found (expected one of: registration, reg, vrm)")]
    MissingRegistrationColumn,
    /// The reader failed or a record was malformed.
    #[error("failed to read CSV: {0}")]
    Csv(#[from] csv::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Column {
    Registration,
    Make,
    Model,
    Colour,
    FuelType,
    YearOfManufacture,
    EngineCapacityCc,
    MotExpiryDate,
    TaxStatus,
    TaxDueDate,
}

impl Column {
    fn from_header(header: &str) -> Option<Self> {
        let normalised = header.trim().to_ascii_lowercase().replace([' ', '-'], "_");
        let column = match normalised.as_str() {
            "registration" | "reg" | "vrm" => Self::Registration,
            "make" => Self::Make,
            "model" => Self::Model,
            "colour" | "color" => Self::Colour,
            "fuel_type" | "fuel" => Self::FuelType,
            "year_of_manufacture" | "year" => Self::YearOfManufacture,
            "engine_capacity_cc" | "engine_capacity" | "engine_size" => Self::EngineCapacityCc,
            "mot_expiry_date" | "mot_expiry" => Self::MotExpiryDate,
            "tax_status" => Self::TaxStatus,
            "tax_due_date" | "tax_due" => Self::TaxDueDate,
            _ => return None,
        };
        Some(column)
    }
}

/// Header positions resolved once per file. The first matching header wins.
#[derive(Debug, Default)]
struct ColumnMap {
    positions: Vec<(Column, usize)>,
}

impl ColumnMap {
    fn from_headers(headers: &StringRecord) -> Self {
        let mut map = Self::default();
        for (index, header) in headers.iter().enumerate() {
            if let Some(column) = Column::from_header(header)
                && map.position(column).is_none()
            {
                map.positions.push((column, index));
            }
        }
        map
    }

    fn position(&self, column: Column) -> Option<usize> {
        self.positions
            .iter()
            .find_map(|(candidate, index)| (*candidate == column).then_some(*index))
    }

    fn text(&self, record: &StringRecord, column: Column) -> Option<String> {
        let value = record.get(self.position(column)?)?.trim();
        (!value.is_empty()).then(|| value.to_owned())
    }

    fn integer(&self, record: &StringRecord, column: Column) -> Option<i32> {
        self.text(record, column)?.parse().ok()
    }

    fn date(&self, record: &StringRecord, column: Column) -> Option<NaiveDate> {
        let raw = self.text(record, column)?;
        DATE_FORMATS
            .iter()
            .find_map(|format| NaiveDate::parse_from_str(&raw, format).ok())
    }
}

/// Parse a garage vehicle CSV into importer rows.
///
/// # Examples
/// ```
/// use garage_backend::inbound::csv_import::parse_vehicle_csv;
///
/// let csv = "VRM,Make,Colour\nab12 cde,Ford,Blue\n";
/// let rows = parse_vehicle_csv(csv.as_bytes()).expect("csv should parse");
/// assert_eq!(rows[0].registration, "ab12 cde");
/// assert_eq!(rows[0].details.colour.as_deref(), Some("Blue"));
/// ```
pub fn parse_vehicle_csv<R: Read>(reader: R) -> Result<Vec<VehicleImportRow>, CsvImportError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let columns = ColumnMap::from_headers(reader.headers()?);
    let registration_index = columns
        .position(Column::Registration)
        .ok_or(CsvImportError::MissingRegistrationColumn)?;

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        if record.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }
        let line = record.position().map_or(0, csv::Position::line);
        rows.push(VehicleImportRow {
            line,
            registration: record.get(registration_index).unwrap_or_default().to_owned(),
            details: VehicleDetails {
                make: columns.text(&record, Column::Make),
                model: columns.text(&record, Column::Model),
                colour: columns.text(&record, Column::Colour),
                fuel_type: columns.text(&record, Column::FuelType),
                year_of_manufacture: columns.integer(&record, Column::YearOfManufacture),
                engine_capacity_cc: columns.integer(&record, Column::EngineCapacityCc),
                mot_expiry_date: columns.date(&record, Column::MotExpiryDate),
                tax_status: columns.text(&record, Column::TaxStatus),
                tax_due_date: columns.date(&record, Column::TaxDueDate),
            },
        });
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use cap_std::{ambient_authority, fs::Dir};

    use crate::test_support::cap_fs::write_file;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
    }

    #[rstest]
    #[case("Registration")]
    #[case("REG")]
    #[case("vrm")]
    fn registration_aliases_are_case_insensitive(#[case] header: &str) {
        let csv = format!("{header},make\nAB12CDE,Ford\n");
        let rows = parse_vehicle_csv(csv.as_bytes()).expect("csv should parse");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].registration, "AB12CDE");
    }

    #[rstest]
    fn missing_registration_column_is_rejected() {
        let error = parse_vehicle_csv("make,model\nFord,Focus\n".as_bytes())
            .expect_err("parse should fail");
        assert!(matches!(error, CsvImportError::MissingRegistrationColumn));
    }

    #[rstest]
    fn aliases_map_onto_details() {
        let csv = "reg,Color,Fuel,MOT Expiry,year,engine_size\n\
                   AB12CDE,Silver,PETROL,2025-03-01,2015,1596\n";
        let rows = parse_vehicle_csv(csv.as_bytes()).expect("csv should parse");
        let details = &rows[0].details;
        assert_eq!(details.colour.as_deref(), Some("Silver"));
        assert_eq!(details.fuel_type.as_deref(), Some("PETROL"));
        assert_eq!(details.mot_expiry_date, Some(date(2025, 3, 1)));
        assert_eq!(details.year_of_manufacture, Some(2015));
        assert_eq!(details.engine_capacity_cc, Some(1596));
    }

    #[rstest]
    #[case("2025-03-01", Some(date(2025, 3, 1)))]
    #[case("01/03/2025", Some(date(2025, 3, 1)))]
    #[case("March 2025", None)]
    #[case("", None)]
    fn dates_accept_iso_and_uk_formats(#[case] raw: &str, #[case] expected: Option<NaiveDate>) {
        let csv = format!("registration,mot_expiry_date\nAB12CDE,{raw}\n");
        let rows = parse_vehicle_csv(csv.as_bytes()).expect("csv should parse");
        assert_eq!(rows[0].details.mot_expiry_date, expected);
    }

    #[rstest]
    fn short_rows_and_blank_cells_read_as_none() {
        let csv = "registration,make,model,colour\nAB12CDE,  ,Focus\nXY34FGH\n";
        let rows = parse_vehicle_csv(csv.as_bytes()).expect("csv should parse");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].details.make, None);
        assert_eq!(rows[0].details.model.as_deref(), Some("Focus"));
        assert_eq!(rows[0].details.colour, None);
        assert_eq!(rows[1].details, VehicleDetails::default());
    }

    #[rstest]
    fn blank_lines_are_skipped_and_line_numbers_kept() {
        let csv = "registration,make\nAB12CDE,Ford\n,\nXY34FGH,Audi\n";
        let rows = parse_vehicle_csv(csv.as_bytes()).expect("csv should parse");
        let lines: Vec<u64> = rows.iter().map(|row| row.line).collect();
        assert_eq!(lines, vec![2, 4]);
    }

    #[rstest]
    fn parses_a_file_from_disk() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("vehicles.csv");
        write_file(&path, b"registration,make\nAB12CDE,Ford\n").expect("write fixture");

        let directory =
            Dir::open_ambient_dir(dir.path(), ambient_authority()).expect("open tempdir");
        let file = directory.open("vehicles.csv").expect("open fixture");
        let rows = parse_vehicle_csv(file.into_std()).expect("csv should parse");
        assert_eq!(rows[0].details.make.as_deref(), Some("Ford"));
    }
}
