use std::fmt;

use crate::const_eval::ConstEvalError;

#[derive(Debug)]
pub enum CodegenError {
    Logic(String),
    Format(std::fmt::Error),
}

impl fmt::Display for CodegenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodegenError::Logic(msg) => write!(f, "{msg}"),
            CodegenError::Format(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for CodegenError {}

impl From<String> for CodegenError {
    fn from(msg: String) -> Self {
        CodegenError::Logic(msg)
    }
}

impl From<std::fmt::Error> for CodegenError {
    fn from(e: std::fmt::Error) -> Self {
        CodegenError::Format(e)
    }
}

impl From<ConstEvalError> for CodegenError {
    fn from(e: ConstEvalError) -> Self {
        CodegenError::Logic(e.to_string())
    }
}
