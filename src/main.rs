//! codeforge CLI binary
//!
//! All logic lives in the library; `cli::run()` prints every message,
//! including errors, and main only turns the result into an exit status.

fn main() -> std::process::ExitCode {
    match codeforge::cli::run() {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(code) => code.into(),
    }
}
