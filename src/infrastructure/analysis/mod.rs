//! Content analysis implementations

mod keyword;

pub use keyword::KeywordAnalyzer;
