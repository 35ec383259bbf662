use crate::sheet::{CellValue, TermSheet};
use anyhow::{anyhow, Context};
use calamine::{Data, Reader, Xlsx};
use std::io::{Cursor, Read, Seek};
use std::path::Path;
use zip::ZipArchive;

const WORKBOOK_ENTRY: &str = "xl/workbook.xml";

/// Rejects anything that is not an xlsx (zip) container with a workbook part.
pub fn check_workbook_container(bytes: &[u8]) -> anyhow::Result<()> {
    if bytes.len() < 4 || bytes[..4] != [0x50, 0x4B, 0x03, 0x04] {
        return Err(anyhow!("file is not an .xlsx workbook"));
    }
    let mut archive =
        ZipArchive::new(Cursor::new(bytes)).context("file is not a readable .xlsx container")?;
    archive
        .by_name(WORKBOOK_ENTRY)
        .with_context(|| format!("workbook is missing {}", WORKBOOK_ENTRY))?;
    Ok(())
}

pub fn read_term_sheet(path: &Path) -> anyhow::Result<TermSheet> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("failed to read {}", path.to_string_lossy()))?;
    read_term_sheet_bytes(&bytes)
        .with_context(|| format!("failed to parse {}", path.to_string_lossy()))
}

pub fn read_term_sheet_bytes(bytes: &[u8]) -> anyhow::Result<TermSheet> {
    let workbook: Xlsx<_> = Xlsx::new(Cursor::new(bytes)).context("invalid xlsx workbook")?;
    first_sheet(workbook)
}

fn first_sheet<RS: Read + Seek>(mut workbook: Xlsx<RS>) -> anyhow::Result<TermSheet> {
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| anyhow!("workbook has no worksheets"))?
        .context("failed to read first worksheet")?;

    let mut rows = range.rows();
    let Some(header) = rows.next() else {
        return Ok(TermSheet::default());
    };
    let columns: Vec<String> = header
        .iter()
        .enumerate()
        .map(|(idx, cell)| {
            let name = cell_value(cell).as_text().trim().to_string();
            if name.is_empty() {
                format!("Unnamed: {}", idx)
            } else {
                name
            }
        })
        .collect();

    let mut data: Vec<Vec<CellValue>> = rows
        .map(|r| r.iter().map(cell_value).collect::<Vec<_>>())
        .collect();
    while data
        .last()
        .map(|r| r.iter().all(|c| c.is_empty()))
        .unwrap_or(false)
    {
        data.pop();
    }

    Ok(TermSheet::new(columns, data))
}

fn cell_value(cell: &Data) -> CellValue {
    match cell {
        Data::Int(v) => CellValue::Number(*v as f64),
        Data::Float(v) => CellValue::Number(*v),
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::Text(s.clone()),
        _ => CellValue::Empty,
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::term_workbook;
    use super::*;

    #[test]
    fn reads_header_and_rows_from_first_sheet() {
        let bytes = term_workbook(
            &["Math", "English"],
            &[(101, "Asha", "V", &[18.0, 15.0]), (102, "Ravi", "V", &[12.0, 19.5])],
        );
        check_workbook_container(&bytes).expect("container");
        let sheet = read_term_sheet_bytes(&bytes).expect("read sheet");
        assert_eq!(
            sheet.columns,
            vec!["Roll #", "Student Name", "Class", "Sec", "Math", "English"]
        );
        assert_eq!(sheet.student_count(), 2);
        let row = sheet.find_roll("102").expect("roll").expect("row");
        assert_eq!(row.get("English"), Some(&CellValue::Number(19.5)));
    }

    #[test]
    fn rejects_non_workbook_bytes() {
        assert!(check_workbook_container(b"Roll #,Name\n1,A\n").is_err());
        assert!(check_workbook_container(b"").is_err());
    }
}
