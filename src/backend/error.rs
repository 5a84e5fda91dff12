use std::fmt;

#[derive(Debug)]
pub enum BackendError {
    /// The emitter's own Koopa text was rejected by the `koopa` crate's
    /// parser — an internal-compiler-error class, not a user error.
    Parse(String),
    /// A raw IR tag this backend does not implement; a defensive
    /// assertion rather than a silent miscompile.
    Unsupported(String),
    Format(std::fmt::Error),
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendError::Parse(msg) => write!(f, "internal error: emitted IR failed to parse: {msg}"),
            BackendError::Unsupported(msg) => write!(f, "{msg}"),
            BackendError::Format(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for BackendError {}

impl From<std::fmt::Error> for BackendError {
    fn from(e: std::fmt::Error) -> Self {
        BackendError::Format(e)
    }
}
