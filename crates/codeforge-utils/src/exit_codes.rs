//! Process exit statuses of the `codeforge` binary.
//!
//! | Status | Name | Meaning |
//! |--------|------|---------|
//! | 0 | `SUCCESS` | Every step of the pipeline finished |
//! | 1 | `INTERNAL` | Filesystem, process or other unexpected failure |
//! | 2 | `CLI_ARGS` | Bad flags or a bad configuration file |
//! | 3 | `PIPELINE_NOT_FOUND` | No pipeline with the requested name |
//! | 4 | `ARTIFACT_MISSING` | A step needed an artifact that was never written |
//! | 70 | `LLM_FAILURE` | The model backend failed |

/// A process exit status.
///
/// # Example
///
/// ```rust
/// use codeforge_utils::exit_codes::ExitCode;
///
/// assert_eq!(ExitCode::SUCCESS.as_i32(), 0);
/// assert_eq!(ExitCode::from_i32(70), ExitCode::LLM_FAILURE);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCode(i32);

impl ExitCode {
    pub const SUCCESS: ExitCode = ExitCode(0);

    /// Anything not covered by a more specific status
    pub const INTERNAL: ExitCode = ExitCode(1);

    /// Rejected flags or configuration
    pub const CLI_ARGS: ExitCode = ExitCode(2);

    /// The requested pipeline is not registered
    pub const PIPELINE_NOT_FOUND: ExitCode = ExitCode(3);

    /// A step read a namespace key that does not exist
    pub const ARTIFACT_MISSING: ExitCode = ExitCode(4);

    /// The model backend failed or rejected the request
    pub const LLM_FAILURE: ExitCode = ExitCode(70);

    #[must_use]
    pub const fn as_i32(self) -> i32 {
        self.0
    }

    #[must_use]
    pub const fn from_i32(raw: i32) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn is_success(self) -> bool {
        self.0 == 0
    }
}

impl From<ExitCode> for i32 {
    fn from(status: ExitCode) -> Self {
        status.as_i32()
    }
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(status: ExitCode) -> Self {
        // Statuses outside 0..=255 are truncated by the OS anyway.
        Self::from(u8::try_from(status.as_i32()).unwrap_or(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_code_values_are_stable() {
        assert_eq!(ExitCode::SUCCESS.as_i32(), 0);
        assert_eq!(ExitCode::INTERNAL.as_i32(), 1);
        assert_eq!(ExitCode::CLI_ARGS.as_i32(), 2);
        assert_eq!(ExitCode::PIPELINE_NOT_FOUND.as_i32(), 3);
        assert_eq!(ExitCode::ARTIFACT_MISSING.as_i32(), 4);
        assert_eq!(ExitCode::LLM_FAILURE.as_i32(), 70);
    }

    #[test]
    fn test_conversions() {
        let raw: i32 = ExitCode::PIPELINE_NOT_FOUND.into();
        assert_eq!(raw, 3);
        assert!(ExitCode::SUCCESS.is_success());
        assert!(!ExitCode::from_i32(raw).is_success());
    }
}
