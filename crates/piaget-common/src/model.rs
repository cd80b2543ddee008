//! Shared domain vocabulary
//!
//! Reference months, student lifecycle status, and the label lists the
//! secretary picks from when registering a student.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Age-group phases offered by the institution.
pub const PHASES: [&str; 5] = [
    "Maternal I",
    "Maternal II",
    "Maternal III",
    "1º Período",
    "2º Período",
];

/// School shifts.
pub const SHIFTS: [&str; 3] = ["Matutino", "Vespertino", "Integral"];

/// Class filter value meaning "every class".
pub const ALL_CLASSES: &str = "Todas";

/// School days pre-filled in the attendance form.
pub const DEFAULT_SCHOOL_DAYS: u32 = 20;

/// Month an attendance declaration refers to.
///
/// Serialized with the Portuguese month name used on the printed declaration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ReferenceMonth {
    January,
    February,
    March,
    April,
    May,
    June,
    July,
    August,
    September,
    October,
    November,
    December,
}

impl ReferenceMonth {
    pub const ALL: [ReferenceMonth; 12] = [
        ReferenceMonth::January,
        ReferenceMonth::February,
        ReferenceMonth::March,
        ReferenceMonth::April,
        ReferenceMonth::May,
        ReferenceMonth::June,
        ReferenceMonth::July,
        ReferenceMonth::August,
        ReferenceMonth::September,
        ReferenceMonth::October,
        ReferenceMonth::November,
        ReferenceMonth::December,
    ];

    /// Calendar number, 1 for January.
    pub fn number(&self) -> u32 {
        *self as u32 + 1
    }

    pub fn from_number(number: u32) -> Option<Self> {
        if (1..=12).contains(&number) {
            Some(Self::ALL[(number - 1) as usize])
        } else {
            None
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ReferenceMonth::January => "Janeiro",
            ReferenceMonth::February => "Fevereiro",
            ReferenceMonth::March => "Março",
            ReferenceMonth::April => "Abril",
            ReferenceMonth::May => "Maio",
            ReferenceMonth::June => "Junho",
            ReferenceMonth::July => "Julho",
            ReferenceMonth::August => "Agosto",
            ReferenceMonth::September => "Setembro",
            ReferenceMonth::October => "Outubro",
            ReferenceMonth::November => "Novembro",
            ReferenceMonth::December => "Dezembro",
        }
    }
}

impl Display for ReferenceMonth {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl FromStr for ReferenceMonth {
    type Err = String;

    /// Accepts the Portuguese month name (any case, with or without the
    /// cedilla in "Março") or the month number.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Ok(number) = trimmed.parse::<u32>() {
            return Self::from_number(number).ok_or_else(|| format!("Invalid month: {}", s));
        }

        let lower = trimmed.to_lowercase();
        Self::ALL
            .iter()
            .find(|m| m.label().to_lowercase() == lower)
            .copied()
            .or_else(|| (lower == "marco").then_some(ReferenceMonth::March))
            .ok_or_else(|| format!("Invalid month: {}", s))
    }
}

impl TryFrom<String> for ReferenceMonth {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ReferenceMonth> for String {
    fn from(value: ReferenceMonth) -> Self {
        value.label().to_string()
    }
}

/// Lifecycle status of a student record
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StudentStatus {
    #[default]
    #[serde(alias = "ativo")]
    Active,
    #[serde(alias = "egresso")]
    Departed,
}

impl StudentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StudentStatus::Active => "active",
            StudentStatus::Departed => "departed",
        }
    }
}

impl Display for StudentStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for StudentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "active" | "ativo" => Ok(StudentStatus::Active),
            "departed" | "egresso" => Ok(StudentStatus::Departed),
            _ => Err(format!("Invalid student status: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_month_number_round_trip() {
        for (i, month) in ReferenceMonth::ALL.iter().enumerate() {
            assert_eq!(month.number(), i as u32 + 1);
            assert_eq!(ReferenceMonth::from_number(i as u32 + 1), Some(*month));
        }
        assert_eq!(ReferenceMonth::from_number(0), None);
        assert_eq!(ReferenceMonth::from_number(13), None);
    }

    #[test]
    fn test_month_from_str() {
        assert_eq!(
            "Janeiro".parse::<ReferenceMonth>().unwrap(),
            ReferenceMonth::January
        );
        assert_eq!(
            "dezembro".parse::<ReferenceMonth>().unwrap(),
            ReferenceMonth::December
        );
        assert_eq!(
            "Marco".parse::<ReferenceMonth>().unwrap(),
            ReferenceMonth::March
        );
        assert_eq!(
            "03".parse::<ReferenceMonth>().unwrap(),
            ReferenceMonth::March
        );
        assert!("Smarch".parse::<ReferenceMonth>().is_err());
        assert!("13".parse::<ReferenceMonth>().is_err());
    }

    #[test]
    fn test_month_ordering_follows_calendar() {
        assert!(ReferenceMonth::February > ReferenceMonth::January);
        assert!(ReferenceMonth::December > ReferenceMonth::September);
    }

    #[test]
    fn test_month_serde_uses_label() {
        let json = serde_json::to_string(&ReferenceMonth::March).unwrap();
        assert_eq!(json, "\"Março\"");
        let month: ReferenceMonth = serde_json::from_str("\"Outubro\"").unwrap();
        assert_eq!(month, ReferenceMonth::October);
    }

    #[test]
    fn test_student_status_serde() {
        assert_eq!(
            serde_json::to_string(&StudentStatus::Departed).unwrap(),
            "\"departed\""
        );
        let status: StudentStatus = serde_json::from_str("\"ativo\"").unwrap();
        assert_eq!(status, StudentStatus::Active);
        assert_eq!(
            "egresso".parse::<StudentStatus>().unwrap(),
            StudentStatus::Departed
        );
    }
}
