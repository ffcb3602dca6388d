//! Property field rules applied before anything reaches the store.

use serde::Deserialize;

use super::error::DomainError;

pub const MAX_TITLE_CHARS: usize = 200;
pub const MAX_LOCATION_CHARS: usize = 100;
const PRICE_MAX_INTEGER_DIGITS: usize = 8;

/// Unvalidated input for creating or replacing a property.
#[derive(Debug, Clone, Deserialize)]
pub struct PropertyDraft {
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Accepted as a JSON string (`"1200.50"`) or number (`1200.5`).
    #[serde(deserialize_with = "price_text")]
    pub price: String,
    pub location: String,
}

fn price_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum PriceInput {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match PriceInput::deserialize(deserializer)? {
        PriceInput::Text(text) => text,
        PriceInput::Number(number) => number.to_string(),
    })
}

/// A draft that passed validation, with the price normalised to two decimals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyFields {
    pub title: String,
    pub description: String,
    pub price: String,
    pub location: String,
}

impl PropertyDraft {
    pub fn validate(self) -> Result<PropertyFields, DomainError> {
        let title = required_text("title", &self.title, MAX_TITLE_CHARS)?;
        let location = required_text("location", &self.location, MAX_LOCATION_CHARS)?;
        let price = normalize_price(&self.price)?;

        Ok(PropertyFields {
            title,
            description: self.description.trim().to_string(),
            price,
            location,
        })
    }
}

fn required_text(
    field: &'static str,
    value: &str,
    max_chars: usize,
) -> Result<String, DomainError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(DomainError::validation(field, "must not be empty"));
    }
    if trimmed.chars().count() > max_chars {
        return Err(DomainError::validation(
            field,
            format!("must be at most {max_chars} characters"),
        ));
    }
    Ok(trimmed.to_string())
}

/// Parse a non-negative decimal with at most two fractional digits and render it
/// as `<integer>.<two digits>`, matching a `NUMERIC(10, 2)` column.
pub fn normalize_price(raw: &str) -> Result<String, DomainError> {
    let trimmed = raw.trim();
    let (integer, fraction) = match trimmed.split_once('.') {
        Some((integer, fraction)) => (integer, fraction),
        None => (trimmed, ""),
    };

    if integer.is_empty() || !integer.bytes().all(|b| b.is_ascii_digit()) {
        return Err(DomainError::validation(
            "price",
            format!("`{trimmed}` is not a non-negative decimal"),
        ));
    }
    if !fraction.bytes().all(|b| b.is_ascii_digit()) || fraction.len() > 2 {
        return Err(DomainError::validation(
            "price",
            "at most two fractional digits are allowed",
        ));
    }

    let integer = integer.trim_start_matches('0');
    let integer = if integer.is_empty() { "0" } else { integer };
    if integer.len() > PRICE_MAX_INTEGER_DIGITS {
        return Err(DomainError::validation("price", "value is out of range"));
    }

    Ok(format!("{integer}.{fraction:0<2}"))
}
