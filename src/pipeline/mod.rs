pub mod extraction;
pub mod fields;
pub mod import;
pub mod template;
