//! Read sheets from Excel / OpenDocument files
//!
//! Any format calamine understands (`.xlsx`, `.xlsm`, `.xlsb`, `.xls`, `.ods`)
//! is accepted. The first row of every sheet is the header.

use anyhow::{Context, Result};
use calamine::{Data, Reader, Sheets, open_workbook_auto};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use super::{CellValue, Row, SheetDescriptor};

/// An opened workbook; sheets are read one at a time on demand
pub struct Workbook {
    path: PathBuf,
    sheets: Sheets<BufReader<File>>,
}

impl Workbook {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let sheets = open_workbook_auto(path)
            .with_context(|| format!("Failed to open workbook: {}", path.display()))?;

        Ok(Self {
            path: path.to_path_buf(),
            sheets,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sheet names in workbook order
    pub fn sheet_names(&self) -> Vec<String> {
        self.sheets.sheet_names()
    }

    pub fn read_sheet(&mut self, sheet_name: &str) -> Result<SheetDescriptor> {
        let range = self
            .sheets
            .worksheet_range(sheet_name)
            .with_context(|| {
                format!(
                    "Failed to read sheet '{}' from {}",
                    sheet_name,
                    self.path.display()
                )
            })?;

        let rows: Vec<Vec<Data>> = range.rows().map(|r| r.to_vec()).collect();
        Ok(sheet_from_rows(sheet_name, &rows))
    }
}

/// Build a sheet from raw calamine rows; row 0 is the header
fn sheet_from_rows(name: &str, rows: &[Vec<Data>]) -> SheetDescriptor {
    let Some((header, body)) = rows.split_first() else {
        return SheetDescriptor::new(name, Vec::new(), Vec::new());
    };

    let columns: Vec<String> = header
        .iter()
        .enumerate()
        .map(|(idx, cell)| header_name(idx, cell))
        .collect();

    let data: Vec<Row> = body
        .iter()
        .map(|row| row.iter().map(cell_to_value).collect())
        .collect();

    SheetDescriptor::new(name, columns, data)
}

/// Header text for a column; blank headers get a positional placeholder
fn header_name(idx: usize, cell: &Data) -> String {
    match cell_to_value(cell) {
        CellValue::Text(s) => s,
        CellValue::Integer(i) => i.to_string(),
        CellValue::Null => format!("Unnamed: {}", idx),
    }
}

/// Convert an Excel cell to a scalar cell value
fn cell_to_value(cell: &Data) -> CellValue {
    match cell {
        Data::Empty => CellValue::Null,
        Data::String(s) if s.trim().is_empty() => CellValue::Null,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Int(i) => CellValue::Integer(*i),
        Data::Float(f) => {
            // Whole numbers come back from Excel as floats
            if f.fract() == 0.0 && *f >= i64::MIN as f64 && *f <= i64::MAX as f64 {
                CellValue::Integer(*f as i64)
            } else {
                CellValue::Text(f.to_string())
            }
        }
        Data::Bool(b) => CellValue::Text(b.to_string()),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(naive) if !dt.is_duration() => {
                CellValue::Text(naive.format("%Y-%m-%d %H:%M:%S").to_string())
            }
            _ => CellValue::Text(format!("{}", dt)),
        },
        Data::DateTimeIso(s) => CellValue::Text(s.clone()),
        Data::DurationIso(s) => CellValue::Text(s.clone()),
        Data::Error(_) => CellValue::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_xlsxwriter::{ExcelDateTime, Format, Workbook as XlsxWorkbook};

    fn read_workbook(path: &Path) -> Result<Vec<SheetDescriptor>> {
        let mut workbook = Workbook::open(path)?;
        let mut sheets = Vec::new();
        for name in workbook.sheet_names() {
            sheets.push(workbook.read_sheet(&name)?);
        }
        Ok(sheets)
    }

    fn temp_xlsx() -> PathBuf {
        std::env::temp_dir().join(format!("sheetload-{}.xlsx", uuid::Uuid::new_v4()))
    }

    #[test]
    fn test_cell_to_value() {
        assert_eq!(cell_to_value(&Data::Empty), CellValue::Null);
        assert_eq!(cell_to_value(&Data::String("  ".into())), CellValue::Null);
        assert_eq!(cell_to_value(&Data::String("abc".into())), CellValue::Text("abc".into()));
        assert_eq!(cell_to_value(&Data::Int(7)), CellValue::Integer(7));
        assert_eq!(cell_to_value(&Data::Float(3.0)), CellValue::Integer(3));
        assert_eq!(cell_to_value(&Data::Float(2.5)), CellValue::Text("2.5".into()));
        assert_eq!(cell_to_value(&Data::Bool(true)), CellValue::Text("true".into()));
    }

    #[test]
    fn test_sheet_from_rows_header_and_padding() {
        let rows = vec![
            vec![Data::String("Device ID".into()), Data::Empty, Data::Float(2024.0)],
            vec![Data::Float(1.0)],
            vec![Data::Empty, Data::Empty, Data::Empty],
        ];

        let sheet = sheet_from_rows("Sensors", &rows);

        assert_eq!(sheet.columns, vec!["Device ID", "Unnamed: 1", "2024"]);
        assert_eq!(sheet.rows.len(), 2);
        assert_eq!(
            sheet.rows[0],
            vec![CellValue::Integer(1), CellValue::Null, CellValue::Null]
        );
        assert!(sheet.rows[1].iter().all(CellValue::is_null));
    }

    #[test]
    fn test_sheet_from_rows_empty() {
        let sheet = sheet_from_rows("Empty", &[]);
        assert!(sheet.columns.is_empty());
        assert!(sheet.rows.is_empty());
    }

    #[test]
    fn test_read_workbook_from_xlsx() {
        let path = temp_xlsx();

        let mut workbook = XlsxWorkbook::new();
        let logs = workbook.add_worksheet();
        logs.set_name("Logs").unwrap();
        logs.write_string(0, 0, "Area").unwrap();
        logs.write_string(0, 1, "Date Time In").unwrap();
        logs.write_number(1, 0, 5.0).unwrap();
        let when = ExcelDateTime::parse_from_str("2024-03-01 12:00:00").unwrap();
        let date_format = Format::new().set_num_format("yyyy-mm-dd hh:mm:ss");
        logs.write_datetime_with_format(1, 1, &when, &date_format).unwrap();
        logs.write_number(2, 0, 6.0).unwrap();

        let codes = workbook.add_worksheet();
        codes.set_name("ErrCodes").unwrap();
        codes.write_string(0, 0, "id").unwrap();
        codes.write_string(0, 1, "text").unwrap();
        codes.write_number(1, 0, 1.0).unwrap();
        codes.write_string(1, 1, "overflow").unwrap();
        workbook.save(&path).unwrap();

        let sheets = read_workbook(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(sheets.len(), 2);
        assert_eq!(sheets[0].name, "Logs");
        assert_eq!(sheets[0].columns, vec!["Area", "Date Time In"]);
        assert_eq!(sheets[0].rows[0][0], CellValue::Integer(5));
        assert_eq!(
            sheets[0].rows[0][1],
            CellValue::Text("2024-03-01 12:00:00".into())
        );
        assert_eq!(sheets[0].rows[1], vec![CellValue::Integer(6), CellValue::Null]);

        assert_eq!(sheets[1].name, "ErrCodes");
        assert_eq!(
            sheets[1].rows,
            vec![vec![CellValue::Integer(1), CellValue::Text("overflow".into())]]
        );
    }

    #[test]
    fn test_open_missing_file() {
        let err = Workbook::open("/nonexistent/sheetload/missing.xlsx")
            .err()
            .expect("opening a missing file fails");
        let message = format!("{:#}", err);
        assert!(message.contains("Failed to open workbook"));
        assert!(message.contains("/nonexistent/sheetload/missing.xlsx"));
    }
}
