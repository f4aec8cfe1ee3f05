use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProblemKind {
    Error,
    Warning,
    Info,
}

impl fmt::Display for ProblemKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ProblemKind::Error => write!(f, "Error"),
            ProblemKind::Warning => write!(f, "Warning"),
            ProblemKind::Info => write!(f, "Info"),
        }
    }
}

/// One diagnostic from the assembler, pinned to a source location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Problem {
    pub kind: ProblemKind,
    pub file: String,
    pub line: usize,
    pub message: String,
}

impl fmt::Display for Problem {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}: {} ({}, {})",
            self.kind, self.message, self.file, self.line
        )
    }
}

/// Append-only problem list. The log tracks the file and line being
/// parsed so call sites only supply a message; pass 2 rewinds the line
/// to the one recorded with each deferred operation. The error count
/// feeds the assembler's too-many-errors abort.
#[derive(Debug, Default)]
pub struct ProblemLog {
    file: String,
    line: usize,
    problems: Vec<Problem>,
    error_count: usize,
}

impl ProblemLog {
    pub fn new(file: &str) -> ProblemLog {
        ProblemLog {
            file: file.to_string(),
            line: 0,
            problems: Vec::new(),
            error_count: 0,
        }
    }

    pub fn set_line(&mut self, line: usize) {
        self.line = line;
    }

    pub fn line(&self) -> usize {
        self.line
    }

    pub fn error<S: Into<String>>(&mut self, msg: S) {
        self.push(ProblemKind::Error, msg.into());
        self.error_count += 1;
    }

    pub fn warning<S: Into<String>>(&mut self, msg: S) {
        self.push(ProblemKind::Warning, msg.into());
    }

    pub fn info<S: Into<String>>(&mut self, msg: S) {
        self.push(ProblemKind::Info, msg.into());
    }

    fn push(&mut self, kind: ProblemKind, message: String) {
        self.problems.push(Problem {
            kind,
            file: self.file.clone(),
            line: self.line,
            message,
        });
    }

    pub fn problems(&self) -> &[Problem] {
        &self.problems
    }

    pub fn error_count(&self) -> usize {
        self.error_count
    }
}
