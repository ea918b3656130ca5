use clap::ValueEnum;
use rust_xlsxwriter::{Format, Workbook, XlsxError};

use crate::error::DashError;
use crate::flatten::FlattenedRecord;

pub const SHEET_NAME: &str = "samples";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExportFormat {
    Csv,
    Xlsx,
    Images,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Xlsx => "xlsx",
            ExportFormat::Images => "txt",
        }
    }

    pub fn file_stem(self) -> &'static str {
        match self {
            ExportFormat::Csv | ExportFormat::Xlsx => "samples",
            ExportFormat::Images => "images",
        }
    }
}

/// Encodes `records` in `format`.
pub fn encode(records: &[FlattenedRecord], format: ExportFormat) -> Result<Vec<u8>, DashError> {
    match format {
        ExportFormat::Csv => encode_csv(records),
        ExportFormat::Xlsx => encode_xlsx(records),
        ExportFormat::Images => Ok(image_manifest(records).into_bytes()),
    }
}

pub fn encode_csv(records: &[FlattenedRecord]) -> Result<Vec<u8>, DashError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    if records.is_empty() {
        writer
            .write_record(FlattenedRecord::COLUMNS)
            .map_err(|err| DashError::Export(err.to_string()))?;
    }
    for record in records {
        writer
            .serialize(record)
            .map_err(|err| DashError::Export(err.to_string()))?;
    }
    writer
        .into_inner()
        .map_err(|err| DashError::Export(err.to_string()))
}

/// One URL per line, across all records in display order.
pub fn image_manifest(records: &[FlattenedRecord]) -> String {
    let mut out = String::new();
    for url in records.iter().flat_map(|record| record.image_urls()) {
        out.push_str(&url);
        out.push('\n');
    }
    out
}

/// Single-sheet workbook mirroring the CSV layout. Ids and ages are numeric cells.
pub fn encode_xlsx(records: &[FlattenedRecord]) -> Result<Vec<u8>, DashError> {
    let mut workbook = Workbook::new();
    let header = Format::new().set_bold();
    let sheet = workbook.add_worksheet();
    sheet.set_name(SHEET_NAME).map_err(xlsx_error)?;

    for (col, name) in FlattenedRecord::COLUMNS.iter().enumerate() {
        sheet
            .write_string_with_format(0, col as u16, *name, &header)
            .map_err(xlsx_error)?;
    }
    for (idx, record) in records.iter().enumerate() {
        let row = idx as u32 + 1;
        let text = [
            (0, &record.staining),
            (1, &record.intensity),
            (2, &record.quantity),
            (3, &record.location),
            (6, &record.patient_sex),
            (7, &record.gene_name),
            (8, &record.tissue_description),
            (9, &record.images),
        ];
        for (col, value) in text {
            sheet.write_string(row, col, value).map_err(xlsx_error)?;
        }
        sheet
            .write_number(row, 4, record.patient_id as f64)
            .map_err(xlsx_error)?;
        if let Some(age) = record.patient_age {
            sheet.write_number(row, 5, f64::from(age)).map_err(xlsx_error)?;
        }
    }

    workbook.save_to_buffer().map_err(xlsx_error)
}

fn xlsx_error(err: XlsxError) -> DashError {
    DashError::Export(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_csv_still_has_header() {
        let bytes = encode_csv(&[]).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert_eq!(
            text.trim_end(),
            "staining,intensity,quantity,location,patientId,patientAge,patientSex,geneName,tissueDescription,images"
        );
    }
}
