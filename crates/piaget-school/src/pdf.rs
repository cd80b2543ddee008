//! Attendance declaration PDF rendering
//!
//! One A4 page drawn with the standard Helvetica fonts. Text is written in
//! WinAnsi (Latin-1 range); characters outside it print as `?`.

use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, Stream, StringFormat, dictionary};
use serde::{Deserialize, Serialize};

use piaget_common::{
    DEFAULT_INSTITUTION_CITY, DEFAULT_INSTITUTION_NAME, PiagetError, ReferenceMonth, utils,
};
use piaget_persistence::{DeclarationInfo, StudentInfo};

use crate::attendance::display_percentage;

pub const DEFAULT_DOCUMENT_TITLE: &str = "DECLARAÇÃO DE FREQUÊNCIA";

const PAGE_WIDTH: i64 = 595;
const PAGE_HEIGHT: i64 = 842;
const MARGIN: i64 = 72;
const BODY_FONT_SIZE: i64 = 12;
const LINE_HEIGHT: i64 = 18;
const BODY_WRAP_CHARS: usize = 80;

/// Institution printed in the document header
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstitutionInfo {
    pub name: String,
    pub city: String,
    pub document_title: String,
}

impl Default for InstitutionInfo {
    fn default() -> Self {
        Self {
            name: DEFAULT_INSTITUTION_NAME.to_string(),
            city: DEFAULT_INSTITUTION_CITY.to_string(),
            document_title: DEFAULT_DOCUMENT_TITLE.to_string(),
        }
    }
}

/// Attendance figures printed on a declaration
#[derive(Debug, Clone, PartialEq)]
pub struct AttendanceSummary {
    pub reference_month: ReferenceMonth,
    pub reference_year: i32,
    pub school_days: u32,
    pub presence: u32,
    pub issued_at: i64,
}

impl AttendanceSummary {
    /// Percentage recomputed from the printed counts
    pub fn percentage(&self) -> f64 {
        if self.school_days == 0 {
            return 0.0;
        }
        self.presence as f64 / self.school_days as f64 * 100.0
    }
}

impl From<&DeclarationInfo> for AttendanceSummary {
    fn from(d: &DeclarationInfo) -> Self {
        Self {
            reference_month: d.reference_month,
            reference_year: d.reference_year,
            school_days: d.school_days,
            presence: d.presence,
            issued_at: d.issued_at,
        }
    }
}

fn render_error(e: impl std::fmt::Display) -> anyhow::Error {
    PiagetError::RenderError(e.to_string()).into()
}

/// WinAnsi bytes for `text`
fn encode_text(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| if (c as u32) <= 0xFF { c as u32 as u8 } else { b'?' })
        .collect()
}

fn wrap_text(text: &str, max_chars: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let needed = if current.is_empty() {
            word.chars().count()
        } else {
            current.chars().count() + 1 + word.chars().count()
        };
        if needed > max_chars && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

fn issue_date(issued_at: i64) -> chrono::NaiveDate {
    chrono::DateTime::from_timestamp_millis(issued_at)
        .filter(|_| issued_at > 0)
        .map(|dt| dt.date_naive())
        .unwrap_or_else(|| chrono::Utc::now().date_naive())
}

fn long_date(date: chrono::NaiveDate) -> String {
    use chrono::Datelike;

    let month = ReferenceMonth::from_number(date.month())
        .map(|m| m.label().to_lowercase())
        .unwrap_or_default();
    format!("{} de {} de {}", date.day(), month, date.year())
}

fn body_text(institution: &InstitutionInfo, student: &StudentInfo, summary: &AttendanceSummary) -> String {
    let mut text = format!(
        "Declaramos, para os devidos fins, que {}",
        student.name.to_uppercase()
    );
    if !student.birth_date.is_empty() {
        text.push_str(&format!(
            ", nascido(a) em {}",
            utils::format_date_br(&student.birth_date)
        ));
    }
    text.push_str(&format!(", é aluno(a) regularmente matriculado(a) no {}", institution.name));

    let placement: Vec<String> = [
        ("fase", &student.phase),
        ("turma", &student.class_label),
        ("turno", &student.shift),
    ]
    .iter()
    .filter(|(_, v)| !v.is_empty())
    .map(|(k, v)| format!("{} {}", k, v))
    .collect();
    if !placement.is_empty() {
        text.push_str(&format!(", {}", placement.join(", ")));
    }

    text.push_str(&format!(
        ", e que no mês de {} de {} compareceu a {} de {} dias letivos, \
         correspondendo a {}% de frequência.",
        summary.reference_month.label().to_lowercase(),
        summary.reference_year,
        summary.presence,
        summary.school_days,
        display_percentage(summary.percentage()),
    ));
    text
}

struct PageWriter {
    operations: Vec<Operation>,
    y: i64,
}

impl PageWriter {
    fn new() -> Self {
        Self {
            operations: Vec::new(),
            y: PAGE_HEIGHT - MARGIN,
        }
    }

    fn line(&mut self, font: &str, size: i64, x: i64, text: &str) {
        self.operations.push(Operation::new("BT", vec![]));
        self.operations
            .push(Operation::new("Tf", vec![font.into(), Object::Integer(size)]));
        self.operations.push(Operation::new(
            "Td",
            vec![Object::Integer(x), Object::Integer(self.y)],
        ));
        self.operations.push(Operation::new(
            "Tj",
            vec![Object::String(encode_text(text), StringFormat::Literal)],
        ));
        self.operations.push(Operation::new("ET", vec![]));
        self.y -= LINE_HEIGHT;
    }

    fn skip(&mut self, lines: i64) {
        self.y -= LINE_HEIGHT * lines;
    }

    fn rule(&mut self, x1: i64, x2: i64) {
        self.operations.push(Operation::new(
            "m",
            vec![Object::Integer(x1), Object::Integer(self.y)],
        ));
        self.operations.push(Operation::new(
            "l",
            vec![Object::Integer(x2), Object::Integer(self.y)],
        ));
        self.operations.push(Operation::new("S", vec![]));
        self.y -= LINE_HEIGHT;
    }
}

/// Render the declaration for one student and month
pub fn render_declaration(
    institution: &InstitutionInfo,
    student: &StudentInfo,
    summary: &AttendanceSummary,
) -> anyhow::Result<Vec<u8>> {
    let mut page = PageWriter::new();

    page.line("F2", 16, MARGIN, &institution.name.to_uppercase());
    page.line("F1", 10, MARGIN, &format!("{} - AM", institution.city));
    page.skip(2);
    page.line("F2", 14, MARGIN, &institution.document_title);
    page.skip(1);

    for line in wrap_text(&body_text(institution, student, summary), BODY_WRAP_CHARS) {
        page.line("F1", BODY_FONT_SIZE, MARGIN, &line);
    }
    page.skip(1);

    page.line("F1", BODY_FONT_SIZE, MARGIN, &format!("Aluno(a): {}", student.name.to_uppercase()));
    if !student.enrollment_code.is_empty() {
        page.line(
            "F1",
            BODY_FONT_SIZE,
            MARGIN,
            &format!("Matrícula: {}", student.enrollment_code),
        );
    }
    page.line(
        "F1",
        BODY_FONT_SIZE,
        MARGIN,
        &format!(
            "Mês de referência: {}/{}",
            summary.reference_month.label(),
            summary.reference_year
        ),
    );
    page.line("F1", BODY_FONT_SIZE, MARGIN, &format!("Dias letivos: {}", summary.school_days));
    page.line("F1", BODY_FONT_SIZE, MARGIN, &format!("Presenças: {}", summary.presence));
    page.line(
        "F1",
        BODY_FONT_SIZE,
        MARGIN,
        &format!("Frequência: {}%", display_percentage(summary.percentage())),
    );
    page.skip(2);

    page.line(
        "F1",
        BODY_FONT_SIZE,
        MARGIN,
        &format!("{}, {}.", institution.city, long_date(issue_date(summary.issued_at))),
    );
    page.skip(3);
    page.rule(MARGIN, PAGE_WIDTH - MARGIN * 3);
    page.line("F1", 10, MARGIN, "Secretaria Escolar");

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let regular_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let bold_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica-Bold",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => regular_id,
            "F2" => bold_id,
        },
    });

    let content = Content {
        operations: page.operations,
    };
    let content_id = doc.add_object(Stream::new(
        dictionary! {},
        content.encode().map_err(render_error)?,
    ));

    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
    });

    let pages = dictionary! {
        "Type" => "Pages",
        "Kids" => vec![page_id.into()],
        "Count" => 1,
        "Resources" => resources_id,
        "MediaBox" => vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Integer(PAGE_WIDTH),
            Object::Integer(PAGE_HEIGHT),
        ],
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages));

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).map_err(render_error)?;

    tracing::debug!(student_id = %student.id, bytes = buffer.len(), "Declaration rendered");
    Ok(buffer)
}

fn fold_char(c: char) -> char {
    match c {
        'á' | 'à' | 'â' | 'ã' | 'ä' => 'a',
        'é' | 'è' | 'ê' | 'ë' => 'e',
        'í' | 'ì' | 'î' | 'ï' => 'i',
        'ó' | 'ò' | 'ô' | 'õ' | 'ö' => 'o',
        'ú' | 'ù' | 'û' | 'ü' => 'u',
        'ç' => 'c',
        _ => c,
    }
}

/// ASCII file name, e.g. `declaracao_ana_clara_marco_2025.pdf`
pub fn declaration_file_name(student: &StudentInfo, month: ReferenceMonth, year: i32) -> String {
    let slug = |s: &str| -> String {
        s.to_lowercase()
            .chars()
            .map(fold_char)
            .map(|c| if c.is_ascii_alphanumeric() { c } else { ' ' })
            .collect::<String>()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join("_")
    };

    let name = match slug(&student.name) {
        s if s.is_empty() => "aluno".to_string(),
        s => s,
    };
    format!("declaracao_{}_{}_{}.pdf", name, slug(month.label()), year)
}
