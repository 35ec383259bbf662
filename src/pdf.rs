use crate::report::ReportCard;
use crate::sheet::format_number;
use anyhow::anyhow;
use printpdf::{
    BuiltinFont, IndirectFontRef, Line, Mm, PdfDocument, PdfLayerReference, Point,
};

const PAGE_W: f32 = 210.0;
const PAGE_H: f32 = 297.0;
const MARGIN: f32 = 10.0;
const ROW_H: f32 = 10.0;
// Subject, 1st Term, 2nd Term, Total
const COLS: [f32; 4] = [80.0, 35.0, 35.0, 35.0];

struct Pen<'a> {
    layer: &'a PdfLayerReference,
    regular: &'a IndirectFontRef,
    bold: &'a IndirectFontRef,
    y: f32,
}

impl Pen<'_> {
    fn text(&mut self, s: &str, size: f32, bold: bool, height: f32) {
        let font = if bold { self.bold } else { self.regular };
        self.layer
            .use_text(s, size, Mm(MARGIN), Mm(self.y - height + 3.0), font);
        self.y -= height;
    }

    fn centered(&mut self, s: &str, size: f32, height: f32) {
        // Helvetica averages roughly half an em per glyph.
        let width = s.chars().count() as f32 * size * 0.5 * 0.3528;
        let x = ((PAGE_W - width) / 2.0).max(MARGIN);
        self.layer
            .use_text(s, size, Mm(x), Mm(self.y - height + 3.0), self.bold);
        self.y -= height;
    }

    fn gap(&mut self, h: f32) {
        self.y -= h;
    }

    fn table_row(&mut self, cells: [&str; 4], bold: bool) {
        let font = if bold { self.bold } else { self.regular };
        let top = self.y;
        let bottom = self.y - ROW_H;
        let mut x = MARGIN;
        for (idx, (cell, w)) in cells.iter().zip(COLS).enumerate() {
            self.layer.add_line(Line {
                points: vec![
                    (Point::new(Mm(x), Mm(top)), false),
                    (Point::new(Mm(x + w), Mm(top)), false),
                    (Point::new(Mm(x + w), Mm(bottom)), false),
                    (Point::new(Mm(x), Mm(bottom)), false),
                ],
                is_closed: true,
            });
            let text_x = if idx == 0 {
                x + 2.0
            } else {
                let width = cell.chars().count() as f32 * 12.0 * 0.5 * 0.3528;
                x + ((w - width) / 2.0).max(1.0)
            };
            self.layer
                .use_text(*cell, 12.0, Mm(text_x), Mm(bottom + 3.5), font);
            x += w;
        }
        self.y = bottom;
    }
}

/// Renders a one-page A4 report card.
pub fn render_report_card(card: &ReportCard, generated_at: &str) -> anyhow::Result<Vec<u8>> {
    let title = format!("Report Card {} {}", card.school_id, card.roll);
    let (doc, page, layer) = PdfDocument::new(title.as_str(), Mm(PAGE_W), Mm(PAGE_H), "Layer 1");
    let regular = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| anyhow!("failed to load Helvetica: {:?}", e))?;
    let bold = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(|e| anyhow!("failed to load Helvetica-Bold: {:?}", e))?;
    let layer = doc.get_page(page).get_layer(layer);
    layer.set_outline_thickness(0.5);

    let mut c = Pen {
        layer: &layer,
        regular: &regular,
        bold: &bold,
        y: PAGE_H - MARGIN,
    };

    c.centered("SCHOOL REPORT CARD", 16.0, 10.0);
    c.centered(&card.school_name, 14.0, 10.0);
    c.centered(&format!("Academic Year: {}", card.academic_year), 14.0, 10.0);
    c.gap(5.0);

    c.text("Student Information:", 12.0, true, 8.0);
    c.text(&format!("Name: {}", card.name), 12.0, false, 8.0);
    c.text(&format!("Roll No: {}", card.roll), 12.0, false, 8.0);
    c.text(&format!("Class: {}", card.class), 12.0, false, 8.0);
    c.gap(5.0);

    c.table_row(["Subject", "1st Term", "2nd Term", "Total"], true);
    let result = &card.result;
    for s in &result.subjects {
        c.table_row(
            [
                &s.subject,
                &format_number(s.term1),
                &format_number(s.term2),
                &format_number(s.total),
            ],
            false,
        );
    }
    c.table_row(
        [
            "TOTAL",
            &format_number(result.total1),
            &format_number(result.total2),
            &format_number(result.grand_total()),
        ],
        true,
    );
    c.gap(5.0);

    c.text("Performance Summary:", 12.0, true, 10.0);
    c.text(
        &format!("1st Term Percentage: {}%", result.percent1),
        12.0,
        false,
        8.0,
    );
    c.text(
        &format!("2nd Term Percentage: {}%", result.percent2),
        12.0,
        false,
        8.0,
    );
    c.text(
        &format!("Combined Percentage: {}%", result.combined_percent),
        12.0,
        false,
        8.0,
    );

    c.gap(15.0);
    c.text("Principal Signature: ___________________", 12.0, false, 8.0);
    c.text(&format!("Generated on: {}", generated_at), 12.0, false, 8.0);

    doc.save_to_bytes()
        .map_err(|e| anyhow!("failed to serialize PDF: {:?}", e))
}
