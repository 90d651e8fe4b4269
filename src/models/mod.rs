pub mod enums;
pub mod fields;

pub use enums::*;
pub use fields::*;

use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum ModelError {
    #[error("Invalid value for {field}: {value}")]
    InvalidEnum { field: String, value: String },

    #[error("Unknown field: {0}")]
    UnknownField(String),
}
