use crate::error::DflockError;
use std::io::{BufRead, Write};
use std::process::Command;

/// Check if debug logging is enabled via environment variable
///
/// This is checked once to avoid repeated environment variable lookups.
static DEBUG_ENABLED: std::sync::OnceLock<bool> = std::sync::OnceLock::new();

fn is_debug_enabled() -> bool {
    *DEBUG_ENABLED.get_or_init(|| {
        (cfg!(debug_assertions) || std::env::var("DFLOCK_DEBUG").unwrap_or_default() == "1")
            && std::env::var("DFLOCK_DEBUG").unwrap_or_default() != "0"
    })
}

/// Debug logging utility function
///
/// Prints debug messages with a colored prefix when debug assertions are enabled or when
/// the `DFLOCK_DEBUG` environment variable is set to "1". `DFLOCK_DEBUG=0` silences it
/// even in debug builds.
pub fn debug_log(msg: &str) {
    if is_debug_enabled() {
        eprintln!("\x1b[1;33m[dflock]\x1b[0m {}", msg);
    }
}

/// Print a non-fatal warning for the user.
pub fn warn(msg: &str) {
    eprintln!("warning: {}", msg);
}

/// Open `editor` on a temporary file holding `contents` and return what the user saved.
///
/// The editor setting may carry arguments (`code --wait`); it is split on whitespace.
pub fn edit_interactively(contents: &str, editor: &str) -> Result<String, DflockError> {
    let mut parts = editor.split_whitespace();
    let program = parts
        .next()
        .ok_or_else(|| DflockError::Config("editor must not be empty".to_string()))?;

    let mut file = tempfile::Builder::new()
        .prefix("dflock-plan-")
        .suffix(".txt")
        .tempfile()?;
    file.write_all(contents.as_bytes())?;
    file.flush()?;

    debug_log(&format!(
        "Opening editor {} on {}",
        editor,
        file.path().display()
    ));
    let status = Command::new(program).args(parts).arg(file.path()).status()?;
    if !status.success() {
        return Err(DflockError::Generic(format!(
            "Editor {} exited with {}",
            editor, status
        )));
    }

    Ok(std::fs::read_to_string(file.path())?)
}

/// Ask a yes/no question on stdout and read the answer from stdin.
pub fn confirm(prompt: &str, default: bool) -> Result<bool, DflockError> {
    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout();
    confirm_with(&mut stdin.lock(), &mut stdout, prompt, default)
}

pub fn confirm_with<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    prompt: &str,
    default: bool,
) -> Result<bool, DflockError> {
    let choices = if default { "[Y/n]" } else { "[y/N]" };
    loop {
        write!(output, "{} {}: ", prompt, choices)?;
        output.flush()?;

        let mut answer = String::new();
        if input.read_line(&mut answer)? == 0 {
            // EOF: fall back to the default
            writeln!(output)?;
            return Ok(default);
        }
        match answer.trim().to_lowercase().as_str() {
            "" => return Ok(default),
            "y" | "yes" => return Ok(true),
            "n" | "no" => return Ok(false),
            _ => writeln!(output, "Error: invalid input")?,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_confirm_uses_default_on_empty_answer() {
        let mut out = Vec::new();
        assert!(confirm_with(&mut Cursor::new("\n"), &mut out, "Continue?", true).unwrap());
        assert!(!confirm_with(&mut Cursor::new("\n"), &mut out, "Continue?", false).unwrap());
    }

    #[test]
    fn test_confirm_reprompts_on_garbage() {
        let mut out = Vec::new();
        let answer = confirm_with(&mut Cursor::new("maybe\nn\n"), &mut out, "Push?", true).unwrap();
        assert!(!answer);
        let printed = String::from_utf8(out).unwrap();
        assert_eq!(printed.matches("Push? [Y/n]: ").count(), 2);
        assert!(printed.contains("invalid input"));
    }

    #[test]
    fn test_confirm_eof_is_default() {
        let mut out = Vec::new();
        assert!(!confirm_with(&mut Cursor::new(""), &mut out, "Continue?", false).unwrap());
    }

    #[cfg(unix)]
    #[test]
    fn test_edit_interactively_returns_saved_contents() {
        // `true` leaves the file untouched, so the original contents come back
        let edited = edit_interactively("b0 abc123 message\n", "true").unwrap();
        assert_eq!(edited, "b0 abc123 message\n");
    }

    #[test]
    fn test_edit_interactively_rejects_empty_editor() {
        assert!(matches!(
            edit_interactively("", "   "),
            Err(DflockError::Config(_))
        ));
    }
}
