// File: src/lib.rs
//
// Library interface for the Polyglot conversion engine.
// Exposes every pipeline stage for integration testing and embedding;
// most callers only need `converter::convert`.

pub mod codegen;
pub mod config;
pub mod converter;
pub mod cst;
pub mod detect;
pub mod errors;
pub mod interpreter;
pub mod ir;
pub mod language;
pub mod lexer;
pub mod lower;
pub mod parser;
pub mod validator;

pub use codegen::CodeSolution;
pub use config::EngineConfig;
pub use converter::convert;
pub use errors::ConversionError;
pub use language::Language;
