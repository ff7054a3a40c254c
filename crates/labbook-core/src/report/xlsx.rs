//! Workbook encoding with `rust_xlsxwriter`.

use rust_xlsxwriter::Workbook;

use super::ReportWorkbook;
use crate::error::{LabbookError, Result};
use crate::tabular::Cell;

/// Excel's per-cell text limit.
const MAX_CELL_CHARS: usize = 32_767;

fn xlsx_error(err: rust_xlsxwriter::XlsxError) -> LabbookError {
    LabbookError::Render(format!("XLSX encoding failed: {}", err))
}

pub fn encode(model: &ReportWorkbook) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();

    for sheet in &model.sheets {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(&sheet.name).map_err(xlsx_error)?;

        for (r, row) in sheet.rows.iter().enumerate() {
            let r = u32::try_from(r)
                .map_err(|_| LabbookError::Render("Too many rows for a worksheet".to_string()))?;
            for (c, cell) in row.iter().enumerate() {
                let c = u16::try_from(c).map_err(|_| {
                    LabbookError::Render("Too many columns for a worksheet".to_string())
                })?;
                match cell {
                    Cell::Empty => {}
                    Cell::Int(v) => {
                        worksheet.write_number(r, c, *v as f64).map_err(xlsx_error)?;
                    }
                    Cell::Float(v) if v.is_finite() => {
                        worksheet.write_number(r, c, *v).map_err(xlsx_error)?;
                    }
                    Cell::Float(v) => {
                        worksheet
                            .write_string(r, c, v.to_string())
                            .map_err(xlsx_error)?;
                    }
                    Cell::Bool(v) => {
                        worksheet.write_boolean(r, c, *v).map_err(xlsx_error)?;
                    }
                    Cell::Text(s) => {
                        let text: String = s.chars().take(MAX_CELL_CHARS).collect();
                        worksheet.write_string(r, c, text).map_err(xlsx_error)?;
                    }
                }
            }
        }
    }

    workbook.save_to_buffer().map_err(xlsx_error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::Sheet;

    #[test]
    fn test_encode_produces_zip_container() {
        let model = ReportWorkbook {
            sheets: vec![
                Sheet {
                    name: "Summary".into(),
                    rows: vec![vec![Cell::Text("Field".into()), Cell::Text("Value".into())]],
                },
                Sheet {
                    name: "1_growth".into(),
                    rows: vec![
                        vec![Cell::Text("t".into()), Cell::Text("od".into())],
                        vec![Cell::Int(0), Cell::Float(0.1)],
                        vec![Cell::Empty, Cell::Bool(true)],
                    ],
                },
            ],
        };
        let bytes = encode(&model).unwrap();
        assert!(bytes.starts_with(b"PK"));
    }
}
