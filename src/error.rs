use std::fmt;

#[derive(Debug)]
pub enum DflockError {
    IoError(std::io::Error),
    /// Errors from invoking the git CLI that exited with a non-zero status
    GitCliError {
        code: Option<i32>,
        stdout: String,
        stderr: String,
        args: Vec<String>,
    },
    /// Errors from gix-config while reading `.dflock` files
    GixError(String),
    JsonError(serde_json::Error),
    Utf8Error(std::str::Utf8Error),
    FromUtf8Error(std::string::FromUtf8Error),
    Config(String),
    /// Malformed plan text
    Parsing(String),
    /// Well-formed plan text that describes an impossible branch layout
    Plan {
        message: String,
        hints: Vec<String>,
    },
    CherryPickFailed {
        branch: String,
        hints: Vec<String>,
    },
    /// A repository state that must be fixed before anything is touched
    Precondition {
        message: String,
        hints: Vec<String>,
    },
    Generic(String),
}

impl DflockError {
    pub fn plan(message: impl Into<String>) -> Self {
        DflockError::Plan {
            message: message.into(),
            hints: Vec::new(),
        }
    }

    pub fn precondition(message: impl Into<String>) -> Self {
        DflockError::Precondition {
            message: message.into(),
            hints: Vec::new(),
        }
    }

    /// Attach a hint line. Only plan, cherry-pick and precondition errors carry hints.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        match &mut self {
            DflockError::Plan { hints, .. }
            | DflockError::CherryPickFailed { hints, .. }
            | DflockError::Precondition { hints, .. } => hints.push(hint.into()),
            _ => {}
        }
        self
    }

    pub fn hints(&self) -> &[String] {
        match self {
            DflockError::Plan { hints, .. }
            | DflockError::CherryPickFailed { hints, .. }
            | DflockError::Precondition { hints, .. } => hints,
            _ => &[],
        }
    }

    /// Exit code of a failed git invocation, if this error is one.
    pub fn git_exit_code(&self) -> Option<i32> {
        match self {
            DflockError::GitCliError { code, .. } => *code,
            _ => None,
        }
    }
}

impl fmt::Display for DflockError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DflockError::IoError(e) => write!(f, "IO error: {}", e),
            DflockError::GitCliError {
                code,
                stdout,
                stderr,
                args,
            } => {
                match code {
                    Some(c) => write!(
                        f,
                        "Git CLI ({}) failed with exit code {}",
                        args.join(" "),
                        c
                    )?,
                    None => write!(f, "Git CLI ({}) failed", args.join(" "))?,
                }
                let captured = format!("{}{}", stdout, stderr);
                if !captured.trim().is_empty() {
                    write!(f, ":\n{}", captured.trim_end())?;
                }
                Ok(())
            }
            DflockError::GixError(e) => write!(f, "Config file error: {}", e),
            DflockError::JsonError(e) => write!(f, "JSON error: {}", e),
            DflockError::Utf8Error(e) => write!(f, "UTF-8 error: {}", e),
            DflockError::FromUtf8Error(e) => write!(f, "From UTF-8 error: {}", e),
            DflockError::Config(e) => write!(f, "Invalid configuration: {}", e),
            DflockError::Parsing(e) => write!(f, "{}", e),
            DflockError::Plan { message, .. } => write!(f, "{}", message),
            DflockError::CherryPickFailed { branch, .. } => {
                write!(f, "Cherry-pick failed at branch {}.", branch)
            }
            DflockError::Precondition { message, .. } => write!(f, "{}", message),
            DflockError::Generic(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for DflockError {}

impl From<std::io::Error> for DflockError {
    fn from(err: std::io::Error) -> Self {
        DflockError::IoError(err)
    }
}

impl From<serde_json::Error> for DflockError {
    fn from(err: serde_json::Error) -> Self {
        DflockError::JsonError(err)
    }
}

impl From<std::str::Utf8Error> for DflockError {
    fn from(err: std::str::Utf8Error) -> Self {
        DflockError::Utf8Error(err)
    }
}

impl From<std::string::FromUtf8Error> for DflockError {
    fn from(err: std::string::FromUtf8Error) -> Self {
        DflockError::FromUtf8Error(err)
    }
}
