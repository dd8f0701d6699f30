use chrono::NaiveDateTime;
use rust_xlsxwriter::{Color, Format, FormatAlign, FormatBorder, Workbook, XlsxError};

use crate::model::Clinic;

/// Header labels of the exchange spreadsheet, in column order.
pub const HEADERS: [&str; 7] = [
    "County",
    "District",
    "Clinic Name",
    "Specialty",
    "Address",
    "Phone",
    "Contact Person",
];

pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

const SHEET_NAME: &str = "Clinics";
const COLUMN_WIDTHS: [f64; 7] = [12.0, 12.0, 25.0, 20.0, 35.0, 15.0, 12.0];
const HEADER_ROW_HEIGHT: f64 = 25.0;
const HEADER_FILL: u32 = 0x667EEA;

/// The exported cells of one record, aligned with [`HEADERS`].
pub fn row_values(c: &Clinic) -> [&str; 7] {
    [
        c.region.as_deref().unwrap_or_default(),
        c.district.as_deref().unwrap_or_default(),
        c.name.as_str(),
        c.specialties.as_deref().unwrap_or_default(),
        c.address.as_deref().unwrap_or_default(),
        c.phone.as_deref().unwrap_or_default(),
        c.contact_person.as_deref().unwrap_or_default(),
    ]
}

/// Renders records, in the given order, as an .xlsx workbook.
pub fn encode_clinics(clinics: &[Clinic]) -> Result<Vec<u8>, XlsxError> {
    let header_format = Format::new()
        .set_bold()
        .set_font_size(12)
        .set_font_color(Color::White)
        .set_background_color(Color::RGB(HEADER_FILL))
        .set_align(FormatAlign::Center)
        .set_align(FormatAlign::VerticalCenter)
        .set_border(FormatBorder::Thin);
    let cell_format = Format::new()
        .set_align(FormatAlign::Left)
        .set_align(FormatAlign::VerticalCenter)
        .set_text_wrap()
        .set_border(FormatBorder::Thin);

    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name(SHEET_NAME)?;

    for (col, label) in HEADERS.iter().enumerate() {
        let col = col as u16;
        sheet.write_string_with_format(0, col, *label, &header_format)?;
        sheet.set_column_width(col, COLUMN_WIDTHS[col as usize])?;
    }
    sheet.set_row_height(0, HEADER_ROW_HEIGHT)?;

    for (i, clinic) in clinics.iter().enumerate() {
        let row = (i + 1) as u32;
        for (col, value) in row_values(clinic).iter().enumerate() {
            sheet.write_string_with_format(row, col as u16, *value, &cell_format)?;
        }
    }

    workbook.save_to_buffer()
}

pub fn export_file_name(at: NaiveDateTime) -> String {
    format!("clinics_{}.xlsx", at.format("%Y%m%d_%H%M%S"))
}
