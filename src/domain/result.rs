//! Result type alias for Tierflow

use super::errors::TierflowError;

/// Result type alias for Tierflow operations
///
/// # Examples
///
/// ```
/// use tierflow::domain::result::Result;
/// use tierflow::domain::errors::TierflowError;
///
/// fn failing_function() -> Result<()> {
///     Err(TierflowError::Validation("Invalid input".to_string()))
/// }
/// ```
pub type Result<T> = std::result::Result<T, TierflowError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::errors::TierflowError;

    #[test]
    fn test_result_err() {
        let result: Result<i32> = Err(TierflowError::Validation("test error".to_string()));
        assert!(result.is_err());
    }

    #[test]
    fn test_result_with_question_mark() -> Result<()> {
        fn inner() -> Result<i32> {
            Ok(42)
        }

        let value = inner()?;
        assert_eq!(value, 42);
        Ok(())
    }
}
