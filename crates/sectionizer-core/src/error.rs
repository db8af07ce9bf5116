use thiserror::Error;

#[derive(Debug, Error)]
pub enum SectionizerError {
    #[error("no field descriptors supplied")]
    NoFields,

    #[error("reference count table is empty")]
    EmptyReferenceTable,

    #[error("field {id} is explicitly detected and protected from reassignment")]
    ProtectedField { id: String },

    #[error("failed to parse rule table: {0}")]
    RuleLoad(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("report serialisation failed: {0}")]
    Report(String),
}
