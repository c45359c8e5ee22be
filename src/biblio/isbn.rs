use super::HarvestError;

/// Normalizes an ISBN to its bare digits.
///
/// Input is trimmed and may contain only ASCII digits and hyphens; the
/// digit count must be 10 or 13.
pub fn normalize_isbn(raw: &str) -> Result<String, HarvestError> {
    let s = raw.trim();
    let invalid = |reason: &str| HarvestError::InvalidIsbn {
        isbn: s.to_string(),
        reason: reason.to_string(),
    };
    if s.chars().any(|c| !(c.is_ascii_digit() || c == '-')) {
        return Err(invalid("only digits and '-' are allowed"));
    }
    let digits: String = s.chars().filter(char::is_ascii_digit).collect();
    if digits.len() != 10 && digits.len() != 13 {
        return Err(invalid("length must be 10 or 13 digits"));
    }
    Ok(digits)
}
