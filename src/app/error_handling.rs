//! Fatal error reporting

use crate::error::ComposerError;
use tracing::error;

/// Exit status for an error that reached the top of a command
pub fn exit_code_for(error: &anyhow::Error) -> i32 {
    match error.downcast_ref::<ComposerError>() {
        Some(err) => err.exit_code(),
        None => 1,
    }
}

/// Print `error` and exit with its status code
///
/// A [`ComposerError`] prints its user message, which for validation
/// failures lists every violated field. With `verbose >= 1` the full
/// cause chain follows.
pub fn handle_fatal_error(error: anyhow::Error, verbose: u8) -> ! {
    error!("Fatal error: {}", error);

    if let Some(composer_err) = error.downcast_ref::<ComposerError>() {
        eprintln!("{}", composer_err.user_message());
        if verbose >= 1 {
            eprintln!("\nContext Chain:\n{}", composer_err.developer_message());
        }
    } else {
        eprintln!("Error: {error}");
        if verbose >= 1 {
            eprintln!("\nError chain:");
            for (i, cause) in error.chain().enumerate() {
                eprintln!("  {}: {}", i, cause);
            }
        }
    }

    std::process::exit(exit_code_for(&error))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ValidationError, ValidationErrors};

    #[test]
    fn test_exit_code_for_composer_errors() {
        let errors = ValidationErrors::from(ValidationError::dependency(
            "schedule_expression",
            "enable_scheduling",
        ));
        let err = anyhow::Error::new(ComposerError::validation(errors));
        assert_eq!(exit_code_for(&err), 8);

        let plain = anyhow::anyhow!("something else");
        assert_eq!(exit_code_for(&plain), 1);
    }
}
