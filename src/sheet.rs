use serde::Serialize;

pub const ROLL_COLUMN: &str = "Roll #";
pub const NAME_COLUMN: &str = "Student Name";
pub const CLASS_COLUMN: &str = "Class";
pub const SECTION_COLUMN: &str = "Sec";

/// Columns that describe the student rather than a subject.
pub const METADATA_COLUMNS: [&str; 4] = [ROLL_COLUMN, NAME_COLUMN, CLASS_COLUMN, SECTION_COLUMN];

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CellValue {
    Empty,
    Number(f64),
    Text(String),
    Bool(bool),
}

impl CellValue {
    /// Text form used for roll-number matching and display.
    /// Integral numbers print without a decimal point.
    pub fn as_text(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Number(v) => format_number(*v),
            CellValue::Text(s) => s.clone(),
            CellValue::Bool(true) => "True".to_string(),
            CellValue::Bool(false) => "False".to_string(),
        }
    }

    /// Numeric mark; anything that is not a finite number counts as zero.
    pub fn as_mark(&self) -> f64 {
        let v = match self {
            CellValue::Empty => 0.0,
            CellValue::Number(v) => *v,
            CellValue::Text(s) => s.trim().parse::<f64>().unwrap_or(0.0),
            CellValue::Bool(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
        };
        if v.is_finite() {
            v
        } else {
            0.0
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }
}

pub fn format_number(v: f64) -> String {
    if v.is_finite() && v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        format!("{}", v)
    }
}

/// One uploaded term spreadsheet: header row plus data rows.
#[derive(Debug, Clone, Default)]
pub struct TermSheet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

#[derive(Debug, Clone, Copy)]
pub struct StudentRow<'a> {
    sheet: &'a TermSheet,
    cells: &'a [CellValue],
}

impl<'a> StudentRow<'a> {
    pub fn get(&self, column: &str) -> Option<&'a CellValue> {
        self.sheet
            .column_index(column)
            .and_then(|idx| self.cells.get(idx))
    }

    pub fn text(&self, column: &str) -> String {
        self.get(column).map(|c| c.as_text()).unwrap_or_default()
    }
}

impl TermSheet {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<CellValue>>) -> Self {
        Self { columns, rows }
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn student_count(&self) -> usize {
        self.rows.len()
    }

    /// First row whose roll-number cell, coerced to text, equals `roll`.
    /// Fails when the sheet has no roll-number column at all.
    pub fn find_roll(&self, roll: &str) -> anyhow::Result<Option<StudentRow<'_>>> {
        let Some(idx) = self.column_index(ROLL_COLUMN) else {
            anyhow::bail!("sheet has no '{}' column", ROLL_COLUMN);
        };
        Ok(self
            .rows
            .iter()
            .find(|r| r.get(idx).map(|c| c.as_text()).as_deref() == Some(roll))
            .map(|cells| StudentRow { sheet: self, cells }))
    }

    /// Non-metadata columns, in sheet order.
    pub fn subject_columns(&self) -> Vec<String> {
        self.columns
            .iter()
            .filter(|c| !METADATA_COLUMNS.contains(&c.as_str()))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
pub(crate) fn sample_sheet(rows: &[(&str, &str, &str, &[(&str, f64)])]) -> TermSheet {
    let mut columns: Vec<String> = METADATA_COLUMNS.iter().map(|c| c.to_string()).collect();
    for (_, _, _, marks) in rows {
        for (subject, _) in marks.iter() {
            if !columns.iter().any(|c| c == subject) {
                columns.push(subject.to_string());
            }
        }
    }
    let data = rows
        .iter()
        .map(|(roll, name, class, marks)| {
            columns
                .iter()
                .map(|col| match col.as_str() {
                    ROLL_COLUMN => CellValue::Text(roll.to_string()),
                    NAME_COLUMN => CellValue::Text(name.to_string()),
                    CLASS_COLUMN => CellValue::Text(class.to_string()),
                    SECTION_COLUMN => CellValue::Text("A".to_string()),
                    subject => marks
                        .iter()
                        .find(|(s, _)| *s == subject)
                        .map(|(_, v)| CellValue::Number(*v))
                        .unwrap_or(CellValue::Empty),
                })
                .collect()
        })
        .collect();
    TermSheet::new(columns, data)
}
