//! Roster import from CSV spreadsheets
//!
//! Column headers are resolved through an [`ImportMapping`] table. Rows without
//! a name or national ID are skipped; every other row becomes one registry
//! create call with the name uppercased.

use std::collections::HashMap;
use std::str::FromStr;

use serde::Serialize;

use piaget_common::{PiagetError, StudentStatus, utils};
use piaget_persistence::NewStudent;

use crate::registry::StudentRegistry;

/// Student field a spreadsheet column can fill
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StudentField {
    Name,
    NationalId,
    BirthDate,
    EnrollmentCode,
    ClassLabel,
    Phase,
    Shift,
}

impl StudentField {
    pub fn as_str(&self) -> &'static str {
        match self {
            StudentField::Name => "name",
            StudentField::NationalId => "national_id",
            StudentField::BirthDate => "birth_date",
            StudentField::EnrollmentCode => "enrollment_code",
            StudentField::ClassLabel => "class_label",
            StudentField::Phase => "phase",
            StudentField::Shift => "shift",
        }
    }
}

impl FromStr for StudentField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "name" => Ok(StudentField::Name),
            "national_id" => Ok(StudentField::NationalId),
            "birth_date" => Ok(StudentField::BirthDate),
            "enrollment_code" => Ok(StudentField::EnrollmentCode),
            "class_label" => Ok(StudentField::ClassLabel),
            "phase" => Ok(StudentField::Phase),
            "shift" => Ok(StudentField::Shift),
            _ => Err(format!("Invalid student field: {}", s)),
        }
    }
}

const DEFAULT_MAPPING: &[(&str, StudentField)] = &[
    ("nome", StudentField::Name),
    ("nome do aluno", StudentField::Name),
    ("nome completo", StudentField::Name),
    ("aluno", StudentField::Name),
    ("name", StudentField::Name),
    ("cpf", StudentField::NationalId),
    ("cpf do aluno", StudentField::NationalId),
    ("national_id", StudentField::NationalId),
    ("data de nascimento", StudentField::BirthDate),
    ("nascimento", StudentField::BirthDate),
    ("data nascimento", StudentField::BirthDate),
    ("birth_date", StudentField::BirthDate),
    ("matricula", StudentField::EnrollmentCode),
    ("matrícula", StudentField::EnrollmentCode),
    ("código", StudentField::EnrollmentCode),
    ("codigo", StudentField::EnrollmentCode),
    ("código do aluno", StudentField::EnrollmentCode),
    ("enrollment_code", StudentField::EnrollmentCode),
    ("turma", StudentField::ClassLabel),
    ("class", StudentField::ClassLabel),
    ("fase", StudentField::Phase),
    ("phase", StudentField::Phase),
    ("turno", StudentField::Shift),
    ("shift", StudentField::Shift),
];

/// Accepted spreadsheet header -> student field
#[derive(Debug, Clone)]
pub struct ImportMapping {
    headers: HashMap<String, StudentField>,
}

impl Default for ImportMapping {
    fn default() -> Self {
        let mut mapping = Self::empty();
        for (header, field) in DEFAULT_MAPPING {
            mapping.insert(header, *field);
        }
        mapping
    }
}

impl ImportMapping {
    pub fn empty() -> Self {
        Self {
            headers: HashMap::new(),
        }
    }

    pub fn insert(&mut self, header: &str, field: StudentField) {
        self.headers.insert(utils::normalize_key(header), field);
    }

    /// Add `header -> field name` entries, e.g. from configuration
    pub fn extend_from_entries<I>(&mut self, entries: I) -> anyhow::Result<()>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (header, field) in entries {
            let field = field
                .parse::<StudentField>()
                .map_err(PiagetError::IllegalArgument)?;
            self.insert(&header, field);
        }
        Ok(())
    }

    pub fn field_for(&self, header: &str) -> Option<StudentField> {
        self.headers.get(&utils::normalize_key(header)).copied()
    }

    pub fn len(&self) -> usize {
        self.headers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }
}

/// Row left out of the import
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedRow {
    pub line: usize,
    pub reason: String,
}

/// Row whose create call failed
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedRow {
    pub name: String,
    pub reason: String,
}

/// Create calls derived from a spreadsheet, before any is made
#[derive(Debug, Clone, Default)]
pub struct ImportPlan {
    pub rows: Vec<NewStudent>,
    pub skipped: Vec<SkippedRow>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    pub created: usize,
    pub skipped: Vec<SkippedRow>,
    pub failed: Vec<FailedRow>,
}

/// Decode uploaded bytes: UTF-8 (BOM stripped), falling back to Latin-1
pub fn decode_text(bytes: &[u8]) -> String {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}

fn detect_delimiter(header_line: &str) -> char {
    let mut in_quotes = false;
    let (mut commas, mut semicolons) = (0usize, 0usize);
    for ch in header_line.chars() {
        match ch {
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => commas += 1,
            ';' if !in_quotes => semicolons += 1,
            _ => {}
        }
    }
    if semicolons > commas { ';' } else { ',' }
}

fn parse_record(line: &str, delimiter: char) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    let mut buf = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '"' {
            if in_quotes && chars.peek() == Some(&'"') {
                buf.push('"');
                chars.next();
            } else {
                in_quotes = !in_quotes;
            }
            continue;
        }
        if ch == delimiter && !in_quotes {
            out.push(std::mem::take(&mut buf));
            continue;
        }
        buf.push(ch);
    }
    out.push(buf);
    out
}

/// Build the create calls for a spreadsheet without touching the registry
pub fn plan_import(content: &str, mapping: &ImportMapping) -> anyhow::Result<ImportPlan> {
    let mut lines = content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty());

    let Some((_, header_line)) = lines.next() else {
        return Err(PiagetError::ImportError("spreadsheet is empty".to_string()).into());
    };

    let delimiter = detect_delimiter(header_line);
    let columns: Vec<Option<StudentField>> = parse_record(header_line, delimiter)
        .iter()
        .map(|h| mapping.field_for(h))
        .collect();

    let column_of = |field: StudentField| columns.iter().position(|c| *c == Some(field));

    if column_of(StudentField::Name).is_none() || column_of(StudentField::NationalId).is_none() {
        return Err(PiagetError::ImportError(
            "spreadsheet needs a name column and a national id column".to_string(),
        )
        .into());
    }

    let mut plan = ImportPlan::default();

    for (index, line) in lines {
        let line_number = index + 1;
        let record = parse_record(line, delimiter);

        let value = |field: StudentField| -> Option<String> {
            column_of(field)
                .and_then(|i| record.get(i))
                .and_then(|v| utils::non_empty_trimmed(v))
        };

        let (name, national_id) = match (value(StudentField::Name), value(StudentField::NationalId)) {
            (Some(name), Some(national_id)) => (name, national_id),
            (None, _) => {
                plan.skipped.push(SkippedRow {
                    line: line_number,
                    reason: "missing name".to_string(),
                });
                continue;
            }
            (Some(_), None) => {
                plan.skipped.push(SkippedRow {
                    line: line_number,
                    reason: "missing national id".to_string(),
                });
                continue;
            }
        };

        let birth_date = match value(StudentField::BirthDate) {
            Some(raw) => utils::normalize_birth_date(&raw).unwrap_or_else(|| {
                tracing::warn!(line = line_number, value = %raw, "Unreadable birth date left blank");
                String::new()
            }),
            None => String::new(),
        };

        plan.rows.push(NewStudent {
            name: name.to_uppercase(),
            national_id,
            birth_date,
            enrollment_code: value(StudentField::EnrollmentCode).unwrap_or_default(),
            class_label: value(StudentField::ClassLabel).unwrap_or_default(),
            phase: value(StudentField::Phase).unwrap_or_default(),
            shift: value(StudentField::Shift).unwrap_or_default(),
            status: StudentStatus::Active,
        });
    }

    Ok(plan)
}

/// Import an uploaded spreadsheet, one create call per accepted row
pub async fn import_students(
    registry: &StudentRegistry,
    bytes: &[u8],
    mapping: &ImportMapping,
) -> anyhow::Result<ImportReport> {
    let content = decode_text(bytes);
    let plan = plan_import(&content, mapping)?;

    let mut report = ImportReport {
        skipped: plan.skipped,
        ..Default::default()
    };

    for row in plan.rows {
        match registry.create(&row).await {
            Ok(_) => report.created += 1,
            Err(e) => {
                tracing::warn!(name = %row.name, error = %e, "Import row rejected");
                report.failed.push(FailedRow {
                    name: row.name,
                    reason: e.to_string(),
                });
            }
        }
    }

    tracing::info!(
        created = report.created,
        skipped = report.skipped.len(),
        failed = report.failed.len(),
        "Roster import finished"
    );

    Ok(report)
}
