//! Word-level stages: counting, lexical filtering and singularization.

pub mod frequency;
pub mod lexical;
pub mod morph;

pub use frequency::{tabulate, ProvenanceMode};
pub use lexical::{remove_branded, STOPWORDS};
pub use morph::singularize;
