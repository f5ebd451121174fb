use thiserror::Error;

/// Failures of the infrastructure underneath the pages
///
/// User-facing problems (unknown ids, invalid form input, the simulated
/// remote failure) never end up here; they degrade to no-ops, field errors
/// or toasts. This enum only covers things that are wrong with the
/// deployment itself.
#[derive(Debug, Error)]
pub enum AcademyError {
    /// The key-value file could not be read or written
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A record could not be encoded or decoded
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A built-in template failed to compile
    #[error("template error: {0}")]
    Template(#[from] handlebars::TemplateError),

    /// A compiled template failed to render
    #[error("render error: {0}")]
    Render(#[from] handlebars::RenderError),
}

pub type Result<T> = std::result::Result<T, AcademyError>;
