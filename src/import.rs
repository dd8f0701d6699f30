use std::fmt;
use std::io::Cursor;

use calamine::{Data, Reader, Xlsx};
use serde::Serialize;

use crate::catalog::{CatalogError, CatalogStore};
use crate::export::HEADERS;
use crate::model::NewClinic;

const FIELD_COUNT: usize = HEADERS.len();

/// Fatal import outcomes; nothing is persisted when one of these is returned.
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("invalid file format: {0}")]
    Format(String),
    #[error("import failed, nothing was saved: {0}")]
    Storage(#[from] CatalogError),
}

/// A rejected data row, numbered as the spreadsheet shows it (header is row 1).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowError {
    pub row: u32,
    pub message: String,
}

impl fmt::Display for RowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "row {}: {}", self.row, self.message)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportOutcome {
    pub imported: usize,
    pub errors: Vec<RowError>,
}

/// The leading cells of one worksheet row.
#[derive(Debug, Clone)]
pub struct SheetRow {
    pub number: u32,
    pub cells: [String; FIELD_COUNT],
}

#[derive(Debug)]
enum RowOutcome {
    Blank,
    Accepted(NewClinic),
    Rejected(RowError),
}

#[derive(Debug, Default)]
struct Staged {
    clinics: Vec<NewClinic>,
    errors: Vec<RowError>,
}

/// Reads the first worksheet by absolute position, so rows and columns keep
/// their spreadsheet coordinates even when leading cells are empty.
pub fn read_rows(bytes: &[u8]) -> Result<Vec<SheetRow>, ImportError> {
    let mut workbook: Xlsx<_> = Xlsx::new(Cursor::new(bytes))
        .map_err(|e| ImportError::Format(format!("not a readable .xlsx workbook: {e}")))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| ImportError::Format("workbook has no worksheets".into()))?
        .map_err(|e| ImportError::Format(format!("cannot read first worksheet: {e}")))?;

    let Some((last_row, _)) = range.end() else {
        return Ok(Vec::new());
    };
    let mut rows = Vec::with_capacity(last_row as usize + 1);
    for r in 0..=last_row {
        let cells = std::array::from_fn(|c| {
            range
                .get_value((r, c as u32))
                .map(cell_text)
                .unwrap_or_default()
        });
        rows.push(SheetRow {
            number: r + 1,
            cells,
        });
    }
    Ok(rows)
}

fn cell_text(d: &Data) -> String {
    match d {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        // Integral numbers (phone numbers typed as numbers) lose the ".0".
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => (*f as i64).to_string(),
        other => other.to_string(),
    }
}

fn check_header(header: Option<&SheetRow>) -> Result<(), ImportError> {
    let matches = header.is_some_and(|h| h.cells.iter().zip(HEADERS).all(|(a, b)| a == b));
    if matches {
        Ok(())
    } else {
        Err(ImportError::Format(format!(
            "header row must be: {}",
            HEADERS.join(", ")
        )))
    }
}

fn optional(cell: &str) -> Option<String> {
    (!cell.is_empty()).then(|| cell.to_string())
}

fn classify_row(row: &SheetRow) -> RowOutcome {
    if row.cells.iter().all(String::is_empty) {
        return RowOutcome::Blank;
    }
    let [region, district, name, specialties, address, phone, contact_person] = &row.cells;
    if name.trim().is_empty() {
        return RowOutcome::Rejected(RowError {
            row: row.number,
            message: "clinic name is required".into(),
        });
    }
    RowOutcome::Accepted(NewClinic {
        region: optional(region),
        district: optional(district),
        name: name.clone(),
        specialties: optional(specialties),
        address: optional(address),
        phone: optional(phone),
        contact_person: optional(contact_person),
        // Imports never carry media items.
        media_items: Some(String::new()),
        ..Default::default()
    })
}

fn stage_rows(rows: &[SheetRow]) -> Result<Staged, ImportError> {
    check_header(rows.first())?;
    let mut staged = Staged::default();
    for row in rows.iter().skip(1) {
        match classify_row(row) {
            RowOutcome::Blank => {}
            RowOutcome::Accepted(c) => staged.clinics.push(c),
            RowOutcome::Rejected(e) => staged.errors.push(e),
        }
    }
    Ok(staged)
}

/// Validates a workbook and inserts every valid row in one batch.
///
/// A header mismatch or a failed commit is fatal and leaves the store
/// untouched. Rows without a clinic name are reported in
/// [`ImportOutcome::errors`] and do not block the other rows.
pub fn import_workbook<S: CatalogStore>(
    store: &mut S,
    bytes: &[u8],
) -> Result<ImportOutcome, ImportError> {
    let rows = read_rows(bytes)?;
    let staged = stage_rows(&rows)?;

    let imported = if staged.clinics.is_empty() {
        0
    } else {
        store.insert_batch(&staged.clinics)?
    };
    tracing::info!(
        "import committed: accepted={} rejected={}",
        imported,
        staged.errors.len()
    );
    Ok(ImportOutcome {
        imported,
        errors: staged.errors,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CatalogResult, SqliteCatalog};
    use crate::export::encode_clinics;
    use crate::model::Clinic;
    use rust_xlsxwriter::Workbook;

    fn workbook(rows: &[&[&str]]) -> Vec<u8> {
        let mut wb = Workbook::new();
        let sheet = wb.add_worksheet();
        for (r, row) in rows.iter().enumerate() {
            for (c, value) in row.iter().enumerate() {
                if !value.is_empty() {
                    sheet.write_string(r as u32, c as u16, *value).unwrap();
                }
            }
        }
        wb.save_to_buffer().unwrap()
    }

    const ROW: [&str; 7] = [
        "台北市",
        "大安區",
        "安心小兒科診所",
        "小兒科",
        "台北市大安區信義路三段123號",
        "02-2345-6789",
        "王醫師",
    ];

    #[test]
    fn single_row_is_accepted_without_media_items() {
        let mut cat = SqliteCatalog::open_in_memory().unwrap();
        let bytes = workbook(&[&HEADERS, &ROW]);
        let out = import_workbook(&mut cat, &bytes).unwrap();
        assert_eq!(out.imported, 1);
        assert!(out.errors.is_empty());

        let stored = &cat.list_all().unwrap()[0];
        assert_eq!(stored.specialties.as_deref(), Some("小兒科"));
        assert_eq!(stored.media_items.as_deref(), Some(""));
        assert_eq!(stored.contact_person.as_deref(), Some("王醫師"));
    }

    #[test]
    fn missing_name_is_reported_and_other_rows_commit() {
        let mut cat = SqliteCatalog::open_in_memory().unwrap();
        let mut nameless = ROW;
        nameless[2] = "";
        let bytes = workbook(&[&HEADERS, &ROW, &nameless, &ROW]);

        let out = import_workbook(&mut cat, &bytes).unwrap();
        assert_eq!(out.imported, 2);
        assert_eq!(
            out.errors,
            vec![RowError {
                row: 3,
                message: "clinic name is required".into()
            }]
        );
        assert_eq!(cat.count().unwrap(), 2);
    }

    #[test]
    fn whitespace_only_name_counts_as_missing() {
        let mut cat = SqliteCatalog::open_in_memory().unwrap();
        let mut spaced = ROW;
        spaced[2] = "  \t ";
        let bytes = workbook(&[&HEADERS, &spaced]);

        let out = import_workbook(&mut cat, &bytes).unwrap();
        assert_eq!(out.imported, 0);
        assert_eq!(out.errors.len(), 1);
        assert_eq!(out.errors[0].row, 2);
        assert_eq!(cat.count().unwrap(), 0);
    }

    #[test]
    fn blank_rows_are_skipped_silently() {
        let mut cat = SqliteCatalog::open_in_memory().unwrap();
        let blank = [""; 7];
        let bytes = workbook(&[&HEADERS, &blank, &ROW, &blank, &ROW]);
        let out = import_workbook(&mut cat, &bytes).unwrap();
        assert_eq!(out.imported, 2);
        assert!(out.errors.is_empty());
    }

    #[test]
    fn cells_beyond_the_seventh_column_are_ignored() {
        let mut cat = SqliteCatalog::open_in_memory().unwrap();
        let mut header: Vec<&str> = HEADERS.to_vec();
        header.push("Media Items");
        let mut row: Vec<&str> = ROW.to_vec();
        row.push("藥袋");
        let mut only_extra = vec![""; 7];
        only_extra.push("海報");
        let bytes = workbook(&[&header[..], &row[..], &only_extra[..]]);

        let out = import_workbook(&mut cat, &bytes).unwrap();
        assert_eq!(out.imported, 1);
        assert!(out.errors.is_empty());
        assert_eq!(cat.list_all().unwrap()[0].media_items.as_deref(), Some(""));
    }

    #[test]
    fn header_mismatches_are_fatal_and_stage_nothing() {
        let mut reordered = HEADERS;
        reordered.swap(0, 1);
        let mut renamed = HEADERS;
        renamed[2] = "Clinic";
        let missing = &HEADERS[..6];

        for header in [&reordered[..], &renamed[..], missing] {
            let mut cat = SqliteCatalog::open_in_memory().unwrap();
            let bytes = workbook(&[header, &ROW]);
            let err = import_workbook(&mut cat, &bytes).unwrap_err();
            assert!(matches!(err, ImportError::Format(_)), "{header:?}");
            assert_eq!(cat.count().unwrap(), 0);
        }
    }

    #[test]
    fn empty_sheet_and_garbage_bytes_are_format_errors() {
        let mut cat = SqliteCatalog::open_in_memory().unwrap();
        let empty = workbook(&[]);
        assert!(matches!(
            import_workbook(&mut cat, &empty),
            Err(ImportError::Format(_))
        ));
        assert!(matches!(
            import_workbook(&mut cat, b"not a zip"),
            Err(ImportError::Format(_))
        ));
    }

    #[test]
    fn numeric_cells_read_as_plain_text() {
        let mut wb = Workbook::new();
        let sheet = wb.add_worksheet();
        for (c, label) in HEADERS.iter().enumerate() {
            sheet.write_string(0, c as u16, *label).unwrap();
        }
        sheet.write_string(1, 2, "數字診所").unwrap();
        sheet.write_number(1, 5, 223456789.0).unwrap();
        let bytes = wb.save_to_buffer().unwrap();

        let rows = read_rows(&bytes).unwrap();
        assert_eq!(rows[1].cells[5], "223456789");
        assert_eq!(rows[1].cells[0], "");
    }

    struct FailingStore(SqliteCatalog);

    impl CatalogStore for FailingStore {
        fn create(&mut self, clinic: &NewClinic) -> CatalogResult<i64> {
            self.0.create(clinic)
        }
        fn get(&self, id: i64) -> CatalogResult<Clinic> {
            self.0.get(id)
        }
        fn update(&mut self, id: i64, clinic: &NewClinic) -> CatalogResult<()> {
            self.0.update(id, clinic)
        }
        fn delete(&mut self, id: i64) -> CatalogResult<()> {
            self.0.delete(id)
        }
        fn list_all(&self) -> CatalogResult<Vec<Clinic>> {
            self.0.list_all()
        }
        fn count(&self) -> CatalogResult<u64> {
            self.0.count()
        }
        fn insert_batch(&mut self, _: &[NewClinic]) -> CatalogResult<usize> {
            Err(CatalogError::Storage(rusqlite::Error::InvalidQuery))
        }
    }

    #[test]
    fn commit_failure_is_fatal() {
        let mut store = FailingStore(SqliteCatalog::open_in_memory().unwrap());
        let bytes = workbook(&[&HEADERS, &ROW, &ROW]);
        let err = import_workbook(&mut store, &bytes).unwrap_err();
        assert!(matches!(err, ImportError::Storage(_)));
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn exported_catalog_imports_back_without_media_items() {
        let mut source = SqliteCatalog::open_in_memory().unwrap();
        for (name, media) in [("甲診所", "藥袋,海報"), ("乙診所", "全部")] {
            source
                .create(&NewClinic {
                    region: Some("台中市".into()),
                    district: Some("西屯區".into()),
                    name: name.into(),
                    specialties: Some("小兒科,皮膚科".into()),
                    address: Some("台中市西屯區台灣大道二段789號".into()),
                    phone: Some("04-2358-7890".into()),
                    contact_person: Some("張醫師".into()),
                    media_items: Some(media.into()),
                    ..Default::default()
                })
                .unwrap();
        }
        let originals = source.list_all().unwrap();
        let bytes = encode_clinics(&originals).unwrap();

        let mut target = SqliteCatalog::open_in_memory().unwrap();
        let out = import_workbook(&mut target, &bytes).unwrap();
        assert_eq!(out.imported, originals.len());

        let imported = target.list_all().unwrap();
        for (a, b) in originals.iter().zip(&imported) {
            assert_eq!(
                crate::export::row_values(a),
                crate::export::row_values(b)
            );
            assert_eq!(b.media_items.as_deref(), Some(""));
        }
    }
}
