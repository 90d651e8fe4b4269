pub mod aliases;
pub mod archive;
pub mod default_template;
pub mod render;
pub mod scanner;
pub mod xml;

pub use aliases::*;
pub use archive::*;
pub use default_template::*;
pub use render::*;
pub use scanner::*;

#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    #[error("Template is missing values for: {}", .0.join(", "))]
    MissingTokens(Vec<String>),

    #[error("Template part '{part}' is malformed: {message}")]
    MalformedPart {
        part: String,
        message: String,
        explanations: Vec<String>,
    },

    #[error("Template is not a readable DOCX archive: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("Template is not a DOCX document: {0}")]
    NotDocx(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
