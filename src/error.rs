use thiserror::Error;

/// Shared error type for every stage of the compiler.
///
/// All variants are fatal: the first error aborts the run and no artifact is
/// written. `Io` and `Scan` together cover failures while reading the script,
/// `Parse` covers keyword and literal syntax, `Semantic` covers per-site rule
/// violations, and `Consistency` covers the whole-configuration checks that
/// run after both phases and therefore carry no single source line.
#[derive(Error, Debug)]
pub enum CompileError {
    #[error("could not read configuration file: {0}")]
    Io(#[from] std::io::Error),
    #[error("scan error on line {line}: {msg}")]
    Scan { line: usize, msg: String },
    #[error("error on line {line} in configuration file: {msg}")]
    Parse { line: usize, msg: String },
    #[error("error on line {line} in configuration file: {msg}")]
    Semantic { line: usize, msg: String },
    #[error("error in configuration file: {msg}")]
    Consistency { msg: String },
}

impl CompileError {
    pub fn scan(line: usize, msg: impl Into<String>) -> Self {
        CompileError::Scan {
            line,
            msg: msg.into(),
        }
    }

    pub fn parse(line: usize, msg: impl Into<String>) -> Self {
        CompileError::Parse {
            line,
            msg: msg.into(),
        }
    }

    pub fn semantic(line: usize, msg: impl Into<String>) -> Self {
        CompileError::Semantic {
            line,
            msg: msg.into(),
        }
    }

    pub fn consistency(msg: impl Into<String>) -> Self {
        CompileError::Consistency { msg: msg.into() }
    }
}
