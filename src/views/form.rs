//! Form input validation

use super::error::{ViewError, ViewResult};

/// Trim a required text field, rejecting it if nothing is left
pub fn required(field: &'static str, value: &str, message: &str) -> ViewResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ViewError::validation(field, message));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_trims() {
        assert_eq!(required("text", "  Buy milk \n", "empty").unwrap(), "Buy milk");
    }

    #[test]
    fn test_required_rejects_blank() {
        for value in ["", "   ", "\t\n"] {
            let err = required("text", value, "Task can't be empty.").unwrap_err();
            assert!(matches!(err, ViewError::Validation { field: "text", .. }));
        }
    }
}
