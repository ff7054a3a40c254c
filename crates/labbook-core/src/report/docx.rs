//! Document encoding with `docx-rs`.

use std::io::Cursor;

use docx_rs::{
    AbstractNumbering, AlignmentType, BreakType, Docx, IndentLevel, Level, LevelJc, LevelText,
    NumberFormat, Numbering, NumberingId, Paragraph, Pic, Run, Start, Style, StyleType,
    Table as DocxTable, TableCell, TableRow,
};

use super::{Block, ImageData, ReportDocument};
use crate::error::{LabbookError, Result};

const EMU_PER_INCH: f64 = 914_400.0;
const BULLET_NUMBERING: usize = 1;

fn text_run(text: &str) -> Run {
    Run::new().add_text(text)
}

fn styles(docx: Docx) -> Docx {
    docx.add_style(
        Style::new("Title", StyleType::Paragraph)
            .name("Title")
            .size(48)
            .bold(),
    )
    .add_style(
        Style::new("Heading1", StyleType::Paragraph)
            .name("Heading 1")
            .size(32)
            .bold(),
    )
    .add_style(
        Style::new("Heading2", StyleType::Paragraph)
            .name("Heading 2")
            .size(26)
            .bold(),
    )
    .add_abstract_numbering(AbstractNumbering::new(BULLET_NUMBERING).add_level(Level::new(
        0,
        Start::new(1),
        NumberFormat::new("bullet"),
        LevelText::new("•"),
        LevelJc::new("left"),
    )))
    .add_numbering(Numbering::new(BULLET_NUMBERING, BULLET_NUMBERING))
}

fn picture(data: &ImageData, width_inches: f64) -> Run {
    let width_emu = width_inches * EMU_PER_INCH;
    let ratio = if data.width_px == 0 {
        1.0
    } else {
        data.height_px as f64 / data.width_px as f64
    };
    let height_emu = width_emu * ratio;
    let pic = Pic::new(&data.png).size(width_emu.round() as u32, height_emu.round() as u32);
    Run::new().add_image(pic)
}

fn key_value_table(rows: &[(String, String)]) -> DocxTable {
    DocxTable::new(
        rows.iter()
            .map(|(key, value)| {
                TableRow::new(vec![
                    TableCell::new().add_paragraph(Paragraph::new().add_run(text_run(key).bold())),
                    TableCell::new().add_paragraph(Paragraph::new().add_run(text_run(value))),
                ])
            })
            .collect(),
    )
}

pub fn encode(model: &ReportDocument) -> Result<Vec<u8>> {
    let mut docx = styles(Docx::new());

    for block in &model.blocks {
        docx = match block {
            Block::Title(text) => docx.add_paragraph(
                Paragraph::new()
                    .add_run(text_run(text))
                    .style("Title")
                    .align(AlignmentType::Center),
            ),
            Block::Heading { level, text } => {
                let style = if *level <= 1 { "Heading1" } else { "Heading2" };
                docx.add_paragraph(Paragraph::new().add_run(text_run(text)).style(style))
            }
            Block::Paragraph(text) => docx.add_paragraph(Paragraph::new().add_run(text_run(text))),
            Block::Centered(text) => docx.add_paragraph(
                Paragraph::new()
                    .add_run(text_run(text))
                    .align(AlignmentType::Center),
            ),
            Block::Bullet(text) => docx.add_paragraph(
                Paragraph::new()
                    .add_run(text_run(text))
                    .numbering(NumberingId::new(BULLET_NUMBERING), IndentLevel::new(0)),
            ),
            Block::KeyValueTable(rows) => docx.add_table(key_value_table(rows)),
            Block::Image { data, width_inches } => {
                docx.add_paragraph(Paragraph::new().add_run(picture(data, *width_inches)))
            }
            Block::PageBreak => {
                docx.add_paragraph(Paragraph::new().add_run(Run::new().add_break(BreakType::Page)))
            }
        };
    }

    let mut out = Cursor::new(Vec::new());
    docx.build()
        .pack(&mut out)
        .map_err(|e| LabbookError::Render(format!("DOCX encoding failed: {}", e)))?;
    Ok(out.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_produces_zip_container() {
        let model = ReportDocument {
            blocks: vec![
                Block::Title("Buffer prep".into()),
                Block::KeyValueTable(vec![("Project".into(), "N/A".into())]),
                Block::Bullet("weigh".into()),
                Block::PageBreak,
                Block::Paragraph("[Image could not be embedded: file not found]".into()),
            ],
        };
        let bytes = encode(&model).unwrap();
        assert!(bytes.starts_with(b"PK"));
    }
}
