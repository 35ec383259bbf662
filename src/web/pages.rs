//! Server-rendered HTML pages.

use crate::config::PortalConfig;
use crate::portal::DashboardStats;
use crate::report::ReportCard;
use crate::sheet::format_number;
use crate::store::{School, Term};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use std::fmt::Write;

/// Unreserved URL characters stay literal; everything else in a path
/// segment is percent-encoded.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

const STYLE: &str = r#"
* { margin: 0; padding: 0; box-sizing: border-box; }
body { font-family: 'Segoe UI', Tahoma, Geneva, Verdana, sans-serif;
  background: linear-gradient(135deg, #667eea 0%, #764ba2 100%); min-height: 100vh; padding: 20px; }
.container { max-width: 900px; margin: 0 auto; background: white; padding: 40px;
  border-radius: 20px; box-shadow: 0 20px 40px rgba(0,0,0,0.1); }
h1 { text-align: center; margin-bottom: 10px; color: #5a4fcf; }
.subtitle { text-align: center; color: #666; margin-bottom: 30px; }
.card { background: #f8f9fa; padding: 25px; border-radius: 15px; margin: 20px 0; border-left: 5px solid #667eea; }
.btn { display: inline-block; padding: 12px 25px; background: linear-gradient(45deg, #27ae60, #2ecc71);
  color: white; border: none; border-radius: 8px; cursor: pointer; font-size: 16px;
  font-weight: 600; margin: 10px 5px; text-decoration: none; }
.btn-blue { background: linear-gradient(45deg, #3498db, #2980b9); }
.btn-red { background: linear-gradient(45deg, #e74c3c, #e67e22); }
.btn-grey { background: linear-gradient(45deg, #95a5a6, #7f8c8d); }
.form-group { margin: 15px 0; }
label { display: block; margin-bottom: 6px; font-weight: 600; color: #555; }
input, select { width: 100%; padding: 10px; border: 2px solid #ddd; border-radius: 8px; font-size: 16px; }
.success { background: #d4edda; color: #155724; padding: 15px; border-radius: 8px; margin: 15px 0; }
.error { background: #f8d7da; color: #721c24; padding: 15px; border-radius: 8px; margin: 15px 0; }
.item { padding: 12px; margin: 8px 0; background: white; border-radius: 10px; border-left: 4px solid #3498db; }
.tabs { display: flex; margin: 20px 0 0 0; }
.tab { padding: 12px 18px; background: #f8f9fa; margin-right: 5px; cursor: pointer; border-radius: 8px 8px 0 0; }
.tab.active { background: #3498db; color: white; }
.tab-content { display: none; padding: 20px; background: #f8f9fa; border-radius: 0 8px 8px 8px; }
.tab-content.active { display: block; }
table { width: 100%; border-collapse: collapse; margin: 15px 0; }
th, td { border: 1px solid #e0e0e0; padding: 10px 12px; text-align: left; }
th { background: #34495e; color: white; }
.stats { display: grid; grid-template-columns: repeat(3, 1fr); gap: 20px; margin: 25px 0; }
.stat { background: linear-gradient(45deg, #667eea, #764ba2); color: white; padding: 20px;
  border-radius: 15px; text-align: center; }
.stat-number { font-size: 34px; font-weight: bold; }
"#;

const TAB_SCRIPT: &str = r#"
<script>
function showTab(name, el) {
  document.querySelectorAll('.tab').forEach(t => t.classList.remove('active'));
  document.querySelectorAll('.tab-content').forEach(c => c.classList.remove('active'));
  el.classList.add('active');
  document.getElementById(name).classList.add('active');
}
</script>
"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlashKind {
    Success,
    Error,
}

#[derive(Debug, Clone)]
pub struct Flash {
    pub kind: FlashKind,
    pub text: String,
}

impl Flash {
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Success,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Error,
            text: text.into(),
        }
    }

    fn render(&self) -> String {
        let class = match self.kind {
            FlashKind::Success => "success",
            FlashKind::Error => "error",
        };
        format!(r#"<div class="{}">{}</div>"#, class, escape(&self.text))
    }
}

pub fn delete_href(school_id: &str) -> String {
    format!(
        "/delete_school/{}",
        utf8_percent_encode(school_id, PATH_SEGMENT)
    )
}

pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(ch),
        }
    }
    out
}

fn layout(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n<style>{}</style>\n</head>\n<body>\n<div class=\"container\">\n{}\n</div>\n</body>\n</html>\n",
        escape(title),
        STYLE,
        body
    )
}

fn back_home() -> &'static str {
    r#"<a href="/" class="btn btn-grey">&larr; Back to Home</a>"#
}

fn school_options(schools: &[School], with_id: bool) -> String {
    let mut out = String::from(r#"<option value="">-- Select School --</option>"#);
    for s in schools {
        let label = if with_id {
            format!("{} ({})", s.name, s.id)
        } else {
            s.name.clone()
        };
        let _ = write!(
            out,
            r#"<option value="{}">{}</option>"#,
            escape(&s.id),
            escape(&label)
        );
    }
    out
}

fn year_options(years: &[String]) -> String {
    years
        .iter()
        .map(|y| format!(r#"<option value="{0}">{0}</option>"#, escape(y)))
        .collect()
}

pub fn index(cfg: &PortalConfig, schools: &[School]) -> String {
    let mut body = format!(
        r#"<h1>{}</h1>
<div class="subtitle">Multi-School Platform - Student Results &amp; Management</div>
<div class="card"><h2>For Schools</h2><p>Register your school and upload student results</p>
<a href="/school_admin" class="btn">School Administration</a>
<a href="/admin_dashboard" class="btn btn-blue">Admin Dashboard</a></div>
<div class="card"><h2>For Students</h2><p>Check your result by selecting school and academic year</p>
<a href="/student_login" class="btn btn-red">Check My Result</a></div>"#,
        escape(&cfg.title)
    );
    if !schools.is_empty() {
        body.push_str(r#"<div class="card"><h3>Registered Schools</h3>"#);
        for s in schools {
            let _ = write!(
                body,
                r#"<div class="item"><strong>{}</strong><br><small>ID: {} | Students: {}</small></div>"#,
                escape(&s.name),
                escape(&s.id),
                s.student_count
            );
        }
        body.push_str("</div>");
    }
    layout(&cfg.title, &body)
}

pub fn school_admin(cfg: &PortalConfig, schools: &[School], flash: Option<&Flash>) -> String {
    let mut manage = String::new();
    if schools.is_empty() {
        manage.push_str("<p>No schools registered yet.</p>");
    }
    for s in schools {
        let _ = write!(
            manage,
            r#"<div class="item"><strong>{}</strong> ({})<br><small>Registered: {}</small><br><a href="{}" style="color: red;">Delete</a></div>"#,
            escape(&s.name),
            escape(&s.id),
            escape(&s.registered_date),
            escape(&delete_href(&s.id))
        );
    }
    let terms: String = Term::ALL
        .iter()
        .map(|t| format!(r#"<option value="{}">{}</option>"#, t.as_str(), t.label()))
        .collect();

    let body = format!(
        r#"<h1>School Administration Panel</h1>
{back}
<div class="tabs">
<div class="tab active" onclick="showTab('register', this)">Register School</div>
<div class="tab" onclick="showTab('upload', this)">Upload Results</div>
<div class="tab" onclick="showTab('manage', this)">Manage Schools</div>
</div>
<div id="register" class="tab-content active">
<h3>Register New School</h3>
<form method="POST" action="/register_school">
<div class="form-group"><label>School Name:</label><input type="text" name="school_name" required placeholder="Enter school name"></div>
<div class="form-group"><label>School ID (Unique):</label><input type="text" name="school_id" required placeholder="e.g., S001, DPS001"></div>
<div class="form-group"><label>Contact Email:</label><input type="email" name="contact_email" placeholder="school@email.com"></div>
<button type="submit" class="btn">Register School</button>
</form>
</div>
<div id="upload" class="tab-content">
<h3>Upload Student Results</h3>
<form method="POST" action="/upload_results" enctype="multipart/form-data">
<div class="form-group"><label>Select School:</label><select name="school_id" required>{schools}</select></div>
<div class="form-group"><label>Academic Year:</label><select name="academic_year" required>{years}</select></div>
<div class="form-group"><label>Term:</label><select name="term" required>{terms}</select></div>
<div class="form-group"><label>Upload Excel File:</label><input type="file" name="excel_file" accept=".xlsx" required></div>
<button type="submit" class="btn btn-blue">Upload Results</button>
</form>
</div>
<div id="manage" class="tab-content">
<h3>Manage Schools</h3>
{manage}
</div>
{flash}
{script}"#,
        back = back_home(),
        schools = school_options(schools, true),
        years = year_options(&cfg.academic_years),
        terms = terms,
        manage = manage,
        flash = flash.map(|f| f.render()).unwrap_or_default(),
        script = TAB_SCRIPT,
    );
    layout("School Administration", &body)
}

pub fn student_login(cfg: &PortalConfig, schools: &[School], error: Option<&str>) -> String {
    let body = format!(
        r#"<h1>Student Result Portal</h1>
<div class="subtitle">Check your academic performance</div>
{back}
<form method="POST" action="/student_result">
<div class="form-group"><label>Select Your School:</label><select name="school_id" required>{schools}</select></div>
<div class="form-group"><label>Academic Year:</label><select name="academic_year" required>{years}</select></div>
<div class="form-group"><label>Enter Your Roll Number:</label><input type="text" name="roll_number" required placeholder="e.g., 101, 205, 301"></div>
<button type="submit" class="btn btn-red">Get My Result</button>
</form>
{error}"#,
        back = back_home(),
        schools = school_options(schools, false),
        years = year_options(&cfg.academic_years),
        error = error
            .map(|e| Flash::error(e).render())
            .unwrap_or_default(),
    );
    layout("Student Result Portal", &body)
}

pub fn student_result(card: &ReportCard) -> String {
    let r = &card.result;
    let mut rows = String::new();
    for s in &r.subjects {
        let _ = write!(
            rows,
            "<tr><td>{}</td><td>{}</td><td>{}</td><td><strong>{}</strong></td></tr>",
            escape(&s.subject),
            format_number(s.term1),
            format_number(s.term2),
            format_number(s.total)
        );
    }

    let body = format!(
        r#"<h1>Academic Report Card</h1>
<div class="subtitle">{school} - {year}</div>
<div class="card">
<p><strong>Student Name:</strong> {name}</p>
<p><strong>Roll Number:</strong> {roll}</p>
<p><strong>Class:</strong> {class}</p>
<p><strong>Academic Year:</strong> {year}</p>
</div>
<h3>Academic Performance</h3>
<table>
<tr><th>Subject</th><th>1st Term</th><th>2nd Term</th><th>Total</th></tr>
{rows}
<tr style="font-weight: bold;"><td>Grand Total</td><td>{t1}</td><td>{t2}</td><td>{gt}</td></tr>
</table>
<div class="card">
<h3>Performance Summary</h3>
<table>
<tr><td>1st Term Percentage</td><td><strong>{p1}%</strong></td></tr>
<tr><td>2nd Term Percentage</td><td><strong>{p2}%</strong></td></tr>
<tr><td>Combined Annual Percentage</td><td><strong>{pc}%</strong></td></tr>
</table>
</div>
<div style="text-align: center;">
<form method="POST" action="/download_result_pdf" style="display: inline;">
<input type="hidden" name="school_id" value="{school_id}">
<input type="hidden" name="academic_year" value="{year}">
<input type="hidden" name="roll_number" value="{roll}">
<button type="submit" class="btn">Download PDF Report</button>
</form>
<a href="/student_login" class="btn btn-blue">Check Another Result</a>
<a href="/" class="btn btn-grey">Home</a>
</div>"#,
        school = escape(&card.school_name),
        school_id = escape(&card.school_id),
        year = escape(&card.academic_year),
        name = escape(&card.name),
        roll = escape(&card.roll),
        class = escape(&card.class),
        rows = rows,
        t1 = format_number(r.total1),
        t2 = format_number(r.total2),
        gt = format_number(r.grand_total()),
        p1 = r.percent1,
        p2 = r.percent2,
        pc = r.combined_percent,
    );
    layout("Student Result", &body)
}

pub fn admin_dashboard(cfg: &PortalConfig, stats: &DashboardStats) -> String {
    let mut recent = String::new();
    for s in &stats.recent_schools {
        let _ = write!(
            recent,
            r#"<div class="item"><strong>{}</strong><br><small>ID: {} | Students: {}</small></div>"#,
            escape(&s.name),
            escape(&s.id),
            s.student_count
        );
    }
    let body = format!(
        r#"<h1>School Admin Dashboard</h1>
<div class="subtitle">{title}</div>
<a href="/" class="btn btn-red">Home</a>
<div class="stats">
<div class="stat"><div class="stat-number">{schools}</div><div>Total Schools</div></div>
<div class="stat"><div class="stat-number">{students}</div><div>Total Students</div></div>
<div class="stat"><div class="stat-number">{years}</div><div>Active Years</div></div>
</div>
<div class="card"><h3>Quick Actions</h3>
<a href="/school_admin" class="btn">Manage Schools</a>
<a href="/student_login" class="btn btn-red">Student Portal</a></div>
<div class="card"><h3>Recent Schools</h3>{recent}</div>"#,
        title = escape(&cfg.title),
        schools = stats.total_schools,
        students = stats.total_students,
        years = stats.active_years,
        recent = recent,
    );
    layout("Admin Dashboard", &body)
}
