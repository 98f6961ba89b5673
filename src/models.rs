//! Core data types shared across the import and dispatch pipelines.

use serde::{Deserialize, Serialize};

/// One reminder-eligible record: a name, a normalized 10-digit local phone
/// number, and the days elapsed since the last visit.
///
/// Materialization guarantees `name` is non-empty and `phone` is exactly
/// [`crate::extract::PHONE_LEN`] digits; rows failing either are never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    pub name: String,
    pub phone: String,
    pub days: ElapsedDays,
}

/// Days elapsed since the last visit, as read from the mapped spreadsheet
/// column.
///
/// Non-numeric cells are kept as [`ElapsedDays::Unknown`] rather than coerced
/// to zero, so they never accidentally match a numeric filter. `Unknown`
/// round-trips through the contact cache as JSON `null`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Option<i64>", into = "Option<i64>")]
pub enum ElapsedDays {
    Known(i64),
    Unknown,
}

impl ElapsedDays {
    /// Lenient parse of a spreadsheet cell. Integers pass through; floats
    /// with no fractional part are accepted (Excel stores numbers as floats);
    /// anything else is `Unknown`.
    pub fn parse(cell: &str) -> Self {
        let trimmed = cell.trim();
        if let Ok(n) = trimmed.parse::<i64>() {
            return ElapsedDays::Known(n);
        }
        if let Ok(f) = trimmed.parse::<f64>() {
            if f.is_finite() && f.fract() == 0.0 {
                return ElapsedDays::Known(f as i64);
            }
        }
        ElapsedDays::Unknown
    }

    /// Equality against a numeric filter value. `Unknown` matches nothing.
    pub fn matches(&self, filter: i64) -> bool {
        matches!(self, ElapsedDays::Known(n) if *n == filter)
    }
}

impl From<Option<i64>> for ElapsedDays {
    fn from(v: Option<i64>) -> Self {
        match v {
            Some(n) => ElapsedDays::Known(n),
            None => ElapsedDays::Unknown,
        }
    }
}

impl From<ElapsedDays> for Option<i64> {
    fn from(v: ElapsedDays) -> Self {
        match v {
            ElapsedDays::Known(n) => Some(n),
            ElapsedDays::Unknown => None,
        }
    }
}

impl std::fmt::Display for ElapsedDays {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ElapsedDays::Known(n) => write!(f, "{}", n),
            ElapsedDays::Unknown => write!(f, "?"),
        }
    }
}

/// User-chosen column mapping for one import invocation. Built from CLI
/// flags, consumed immediately, never persisted.
#[derive(Debug, Clone)]
pub struct ColumnMapping {
    /// Header text of the name column.
    pub name_col: String,
    /// Header texts of the phone columns, in the order given (size >= 1).
    pub phone_cols: Vec<String>,
    /// Header text of the elapsed-days column.
    pub days_col: String,
}
