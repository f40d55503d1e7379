use serde::Serialize;
use std::io::{IsTerminal, Write};

/// Abstraction over user-facing output.
///
/// Command modules use this trait instead of `println!`/`eprintln!` so that
/// text and `--json` rendering stay in one place.
pub trait UserOutput: Send + Sync {
    /// Informational status message (e.g., "Services:")
    fn status(&self, message: &str);

    /// Success message (e.g., "Service 'web' started")
    fn success(&self, message: &str);

    /// Warning message (e.g., "2 services need attention")
    fn warning(&self, message: &str);

    /// Error message (e.g., "Repair of 'web' failed")
    fn error(&self, message: &str);

    /// Inline progress (no trailing newline). Call `finish_progress` after.
    fn progress(&self, message: &str);

    /// Finish an inline progress line with a result.
    fn finish_progress(&self, result: &str);

    /// A blank line separator.
    fn blank(&self);

    /// Raw document written to stdout as-is (JSON, logs, definition text).
    fn raw(&self, text: &str);
}

/// Wrap `message` in an ANSI colour only when writing to a terminal.
fn paint(color: &str, message: &str, terminal: bool) -> String {
    if terminal {
        format!("\x1b[{}m{}\x1b[0m", color, message)
    } else {
        message.to_string()
    }
}

/// Standard CLI output. Colours are used only when the stream is a terminal.
pub struct CliOutput;

impl UserOutput for CliOutput {
    fn status(&self, message: &str) {
        println!("{}", message);
    }

    fn success(&self, message: &str) {
        println!("{}", paint("32", message, std::io::stdout().is_terminal()));
    }

    fn warning(&self, message: &str) {
        eprintln!("{}", paint("33", message, std::io::stderr().is_terminal()));
    }

    fn error(&self, message: &str) {
        eprintln!("{}", paint("31", message, std::io::stderr().is_terminal()));
    }

    fn progress(&self, message: &str) {
        print!("{}", message);
        std::io::stdout().flush().ok();
    }

    fn finish_progress(&self, result: &str) {
        println!("{}", result);
    }

    fn blank(&self) {
        println!();
    }

    fn raw(&self, text: &str) {
        print!("{}", text);
        if !text.ends_with('\n') {
            println!();
        }
    }
}

/// Pretty-print `value` as JSON.
pub fn print_json<T: Serialize + ?Sized>(out: &dyn UserOutput, value: &T) -> anyhow::Result<()> {
    out.raw(&serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_when_not_a_terminal() {
        assert_eq!(paint("32", "Service 'web' started", false), "Service 'web' started");
        assert!(!paint("33", "2 services need attention", false).contains('\x1b'));
    }

    #[test]
    fn colored_on_a_terminal() {
        assert_eq!(paint("31", "failed", true), "\x1b[31mfailed\x1b[0m");
    }
}
