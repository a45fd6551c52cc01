pub mod document;
pub mod errors;
pub mod images;
pub mod links;
pub mod minify;
pub mod pipeline;
pub mod policy;
pub mod preprocess;
pub mod sanitizer;
pub mod scroll;
pub mod style;

#[cfg(test)]
mod tests;

pub use errors::ExtractError;
pub use pipeline::{ExtractedPage, ExtractionPipeline, SizeReport};
pub use policy::{PolicyKind, SanitizePolicy, SelectorPolicy};
