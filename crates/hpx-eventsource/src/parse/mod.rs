//! Line-level SSE parsing.
//!
//! [`LineDecoder`] turns response body chunks into lines and
//! [`classify_line`] labels each line as blank, comment, or field.

pub(crate) mod constants;
mod decoder;
mod line;

pub use decoder::LineDecoder;
pub use line::{Field, FieldName, Line, classify_line};
