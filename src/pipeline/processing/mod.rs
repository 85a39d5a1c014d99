// Pipeline processing: code dictionary loading, parsing, normalization and pre-flight checks

pub mod codes;
pub mod normalize;
pub mod parser;
pub mod quality_gate;
