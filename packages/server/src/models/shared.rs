use chrono::NaiveDate;

use crate::error::AppError;

/// Validate a trimmed name field (1-`max` Unicode characters).
pub fn validate_name(value: &str, field: &str, max: usize) -> Result<(), AppError> {
    let value = value.trim();
    if value.is_empty() || value.chars().count() > max {
        return Err(AppError::Validation(format!(
            "{field} must be 1-{max} characters"
        )));
    }
    Ok(())
}

/// Validate a 1-based period number.
pub fn validate_period(period: i32) -> Result<(), AppError> {
    if period < 1 {
        return Err(AppError::Validation("period must be >= 1".into()));
    }
    Ok(())
}

/// Validate an optional inclusive date range.
pub fn validate_date_range(from: Option<NaiveDate>, to: Option<NaiveDate>) -> Result<(), AppError> {
    if let (Some(from), Some(to)) = (from, to)
        && from > to
    {
        return Err(AppError::Validation("from must not be after to".into()));
    }
    Ok(())
}

/// Validate a list of ids (no blanks, no duplicates).
pub fn validate_id_list(ids: &[String], name: &str) -> Result<(), AppError> {
    let mut seen = std::collections::HashSet::new();
    for id in ids {
        if id.trim().is_empty() {
            return Err(AppError::Validation(format!("{name} must not be blank")));
        }
        if !seen.insert(id.as_str()) {
            return Err(AppError::Validation(format!("Duplicate {name}: {id}")));
        }
    }
    Ok(())
}
