//! CSV row parsing
//!
//! The header must name every column in [`COLUMNS`]; order is free and extra
//! columns are ignored. Every record is validated before anything is written,
//! so a bad row rejects the whole file.

use std::io::Read;
use csv::{ReaderBuilder, StringRecord, Trim};
use crate::business::{Business, Symptom, parse_flag};
use crate::{Error, Result};

pub const BUSINESS_ID: &str = "Business ID";
pub const BUSINESS_NAME: &str = "Business Name";
pub const SYMPTOM_CODE: &str = "Symptom Code";
pub const SYMPTOM_NAME: &str = "Symptom Name";
pub const SYMPTOM_DIAGNOSTIC: &str = "Symptom Diagnostic";

/// Required header columns
pub const COLUMNS: [&str; 5] = [BUSINESS_ID, BUSINESS_NAME, SYMPTOM_CODE, SYMPTOM_NAME, SYMPTOM_DIAGNOSTIC];

/// One validated CSV data row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportRow {
    /// 1-based data row number (the header is not counted)
    pub row: u64,
    pub business: Business,
    pub symptom: Symptom,
    pub diagnostic: bool,
}

/// Header positions of the required columns
#[derive(Debug, Clone, Copy)]
struct ColumnMap {
    business_id: usize,
    business_name: usize,
    symptom_code: usize,
    symptom_name: usize,
    diagnostic: usize,
}

impl ColumnMap {
    fn from_headers(headers: &StringRecord) -> Result<Self> {
        let position = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim_start_matches('\u{feff}').trim() == name)
                .ok_or_else(|| Error::MissingColumn(name.to_string()))
        };

        Ok(Self {
            business_id: position(BUSINESS_ID)?,
            business_name: position(BUSINESS_NAME)?,
            symptom_code: position(SYMPTOM_CODE)?,
            symptom_name: position(SYMPTOM_NAME)?,
            diagnostic: position(SYMPTOM_DIAGNOSTIC)?,
        })
    }

    fn parse(&self, row: u64, record: &StringRecord) -> Result<ImportRow> {
        let field = |index: usize, name: &str| required_field(record, row, index, name);

        let raw_id = field(self.business_id, BUSINESS_ID)?;
        let business_id: i64 = raw_id.parse().map_err(|_| Error::InvalidRow {
            row,
            message: format!("'{}' value '{}' is not an integer", BUSINESS_ID, raw_id),
        })?;

        let raw_flag = field(self.diagnostic, SYMPTOM_DIAGNOSTIC)?;
        let diagnostic = parse_flag(raw_flag).ok_or_else(|| Error::InvalidRow {
            row,
            message: format!("'{}' value '{}' is not a boolean", SYMPTOM_DIAGNOSTIC, raw_flag),
        })?;

        Ok(ImportRow {
            row,
            business: Business::new(business_id, field(self.business_name, BUSINESS_NAME)?),
            symptom: Symptom::new(
                field(self.symptom_code, SYMPTOM_CODE)?,
                field(self.symptom_name, SYMPTOM_NAME)?,
            ),
            diagnostic,
        })
    }
}

fn required_field<'r>(record: &'r StringRecord, row: u64, index: usize, name: &str) -> Result<&'r str> {
    let value = record.get(index).unwrap_or("").trim();
    if value.is_empty() {
        return Err(Error::InvalidRow {
            row,
            message: format!("'{}' is empty", name),
        });
    }
    Ok(value)
}

/// Parse and validate every row of a CSV stream
pub fn parse_rows<R: Read>(reader: R) -> Result<Vec<ImportRow>> {
    let mut rdr = ReaderBuilder::new().trim(Trim::All).from_reader(reader);

    let headers = rdr
        .headers()
        .map_err(|source| Error::Csv { row: 0, source })?
        .clone();
    let columns = ColumnMap::from_headers(&headers)?;

    let mut rows = Vec::new();
    for (index, record) in rdr.records().enumerate() {
        let row = index as u64 + 1;
        let record = record.map_err(|source| Error::Csv { row, source })?;
        rows.push(columns.parse(row, &record)?);
    }

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "Business ID,Business Name,Symptom Code,Symptom Name,Symptom Diagnostic\n";

    #[test]
    fn test_parse_valid_rows() {
        let csv = format!("{}1001, Clinic A ,SYMPT0001,Fever,True\n1002,Clinic B,SYMPT0002,Cough,no\n", HEADER);
        let rows = parse_rows(csv.as_bytes()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].row, 1);
        assert_eq!(rows[0].business, Business::new(1001, "Clinic A"));
        assert_eq!(rows[0].symptom, Symptom::new("SYMPT0001", "Fever"));
        assert!(rows[0].diagnostic);
        assert!(!rows[1].diagnostic);
    }

    #[test]
    fn test_column_order_and_extras_are_free() {
        let csv = "Notes,Symptom Diagnostic,Symptom Name,Symptom Code,Business Name,Business ID\n\
                   x,false,Fever,SYMPT0001,Clinic A,5\n";
        let rows = parse_rows(csv.as_bytes()).unwrap();
        assert_eq!(rows[0].business.id, 5);
        assert_eq!(rows[0].symptom.code, "SYMPT0001");
    }

    #[test]
    fn test_bom_header_accepted() {
        let csv = format!("\u{feff}{}1,A,S1,Fever,1\n", HEADER);
        assert_eq!(parse_rows(csv.as_bytes()).unwrap().len(), 1);
    }

    #[test]
    fn test_header_only_is_empty_import() {
        assert!(parse_rows(HEADER.as_bytes()).unwrap().is_empty());
    }

    #[test]
    fn test_missing_column() {
        let csv = "Business ID,Business Name,Symptom Code,Symptom Name\n1,A,S1,Fever\n";
        match parse_rows(csv.as_bytes()) {
            Err(Error::MissingColumn(col)) => assert_eq!(col, SYMPTOM_DIAGNOSTIC),
            other => panic!("expected missing column, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_input_reports_missing_column() {
        assert!(matches!(parse_rows("".as_bytes()), Err(Error::MissingColumn(_))));
    }

    #[test]
    fn test_invalid_diagnostic_reports_row() {
        let csv = format!("{}1,A,S1,Fever,true\n2,B,S2,Cough,sometimes\n", HEADER);
        match parse_rows(csv.as_bytes()) {
            Err(Error::InvalidRow { row, message }) => {
                assert_eq!(row, 2);
                assert!(message.contains("sometimes"));
            }
            other => panic!("expected invalid row, got {:?}", other),
        }
    }

    #[test]
    fn test_non_integer_business_id() {
        let csv = format!("{}abc,A,S1,Fever,true\n", HEADER);
        assert!(matches!(parse_rows(csv.as_bytes()), Err(Error::InvalidRow { row: 1, .. })));
    }

    #[test]
    fn test_empty_symptom_code() {
        let csv = format!("{}1,A,,Fever,true\n", HEADER);
        assert!(matches!(parse_rows(csv.as_bytes()), Err(Error::InvalidRow { row: 1, .. })));
    }

    #[test]
    fn test_ragged_record_is_csv_error() {
        let csv = format!("{}1,A,S1,Fever,true\n2,B,S2\n", HEADER);
        assert!(matches!(parse_rows(csv.as_bytes()), Err(Error::Csv { row: 2, .. })));
    }
}
