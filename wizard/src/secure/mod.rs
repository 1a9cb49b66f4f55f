//! Secret handling for deployment submission

pub mod encrypt;
pub mod fields;
