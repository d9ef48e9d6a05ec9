use std::path::PathBuf;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to load the C# grammar: {0}")]
    Language(#[from] tree_sitter::LanguageError),

    #[error("tree-sitter produced no tree for {0}")]
    Parse(String),

    #[error("invalid configuration in {path}: {message}")]
    Config { path: PathBuf, message: String },
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}

/// Why a fix provider declined to produce an edit.
///
/// Never surfaced to users: a fix that cannot prove it is safe simply does not
/// appear. The reason only shows up in debug logs and tests.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NotApplicable {
    #[error("anchor does not point at a {0}")]
    UnexpectedAnchor(&'static str),

    #[error("parameter list is empty")]
    EmptyParameterList,

    #[error("no enclosing {0}")]
    MissingParent(&'static str),

    #[error("symbol could not be resolved")]
    UnresolvedSymbol,

    #[error("field is not assigned by any constructor")]
    NoConstructorAssignment,

    #[error("field `{0}` is still referenced outside the removed assignments")]
    FieldStillReferenced(String),

    #[error("edits overlap or fall outside the document")]
    ConflictingEdits,

    #[error("rule {0} has no fix")]
    UnsupportedRule(String),
}
