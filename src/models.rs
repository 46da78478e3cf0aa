use serde::{Deserialize, Serialize};

use crate::error::{EntryError, Result};

pub const NAME_MIN_LEN: usize = 2;
pub const NAME_MAX_LEN: usize = 50;

#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct Entry {
    pub id: i64,
    pub name: String,
    pub amount: f64,
    pub category: Option<String>,
}

/// Unvalidated entry fields, as received from a form, the command line or a
/// JSON body.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct EntryPayload {
    pub name: String,
    pub amount: f64,
    #[serde(default)]
    pub category: Option<String>,
}

/// Entry fields that passed [`EntryPayload::validate`]. Only the validator
/// builds one, so the store can trust its content.
#[derive(Debug, Clone, PartialEq)]
pub struct NewEntry {
    name: String,
    amount: f64,
    category: Option<String>,
}

impl EntryPayload {
    pub fn new(name: impl Into<String>, amount: f64, category: Option<&str>) -> Self {
        Self {
            name: name.into(),
            amount,
            category: category.map(str::to_string),
        }
    }

    pub fn validate(self) -> Result<NewEntry> {
        let name = self.name.trim();
        let len = name.chars().count();
        if len == 0 {
            return Err(EntryError::invalid("name", "must not be empty"));
        }
        if !(NAME_MIN_LEN..=NAME_MAX_LEN).contains(&len) {
            return Err(EntryError::invalid(
                "name",
                format!("must be between {NAME_MIN_LEN} and {NAME_MAX_LEN} characters, got {len}"),
            ));
        }

        if !self.amount.is_finite() {
            return Err(EntryError::invalid("amount", "must be a finite number"));
        }
        if self.amount <= 0.0 {
            return Err(EntryError::invalid(
                "amount",
                format!("must be greater than zero, got {}", self.amount),
            ));
        }

        Ok(NewEntry {
            name: name.to_string(),
            amount: self.amount,
            category: normalize_category(self.category),
        })
    }
}

impl NewEntry {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn amount(&self) -> f64 {
        self.amount
    }

    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }
}

/// Blank categories coming from forms and files mean "no category".
pub fn normalize_category(category: Option<String>) -> Option<String> {
    category
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
}

/// Parses a user supplied amount. Accepts a decimal comma the way bank
/// exports write it (`3,5`), but only as the single separator followed by one
/// or two digits; `1,234` is rejected as ambiguous.
pub fn parse_amount(raw: &str) -> Result<f64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(EntryError::invalid("amount", "is missing"));
    }
    let not_a_number = || EntryError::invalid("amount", format!("'{raw}' is not a number"));

    let mut digits = raw.replace(' ', "");
    if let Some((_, decimals)) = digits.split_once(',') {
        let decimal_comma = !digits.contains('.')
            && (1..=2).contains(&decimals.len())
            && decimals.chars().all(|c| c.is_ascii_digit());
        if !decimal_comma {
            return Err(not_a_number());
        }
        digits = digits.replacen(',', ".", 1);
    }
    digits.parse::<f64>().map_err(|_| not_a_number())
}

/// Parses an entry id typed into a form field.
pub fn parse_id(raw: &str) -> Result<i64> {
    let raw = raw.trim();
    raw.parse::<i64>()
        .map_err(|_| EntryError::invalid("id", format!("'{raw}' is not a valid id")))
}
