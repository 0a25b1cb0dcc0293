//! Infrastructure layer - Parsers, caching, orchestration and adapters to external services

pub mod analysis;
pub mod cache;
pub mod logging;
pub mod observability;
pub mod ocr;
pub mod parsers;
pub mod services;
