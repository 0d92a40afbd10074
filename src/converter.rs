// File: src/converter.rs
//
// Conversion orchestrator.
//
// Drives parse -> lower -> validate -> generate for one request. Every
// invocation owns its budget, tree and IR, so concurrent calls share nothing
// but the read-only frontend and backend registries. The first failing stage
// ends the run with its complete error list; nothing is partially converted.

use crate::codegen::{self, CodeSolution, GenerateOptions, Style};
use crate::config::{Budget, EngineConfig};
use crate::detect;
use crate::errors::{ConversionError, Diagnostic};
use crate::interpreter::{self, Execution};
use crate::language::Language;
use crate::lower;
use crate::parser::{self, ParseFailure};
use crate::validator::{self, Validated};
use serde::{Deserialize, Serialize};

/// Wire form of a conversion request. Language tags stay strings so an
/// unknown tag becomes a diagnostic instead of a deserialization failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionRequest {
    pub source_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_language: Option<String>,
    pub target_language: String,
}

/// Wire form of a conversion result
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ConversionResponse {
    Success {
        #[serde(rename = "sourceLanguage")]
        source_language: Language,
        solutions: Vec<CodeSolution>,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        warnings: Vec<String>,
    },
    Failure { diagnostics: Vec<Diagnostic> },
}

/// A successful conversion with the details the wire response carries
#[derive(Debug, Clone, PartialEq)]
pub struct Conversion {
    pub source_language: Language,
    pub solutions: Vec<CodeSolution>,
    pub warnings: Vec<String>,
}

/// A source program taken through validation, ready for any backend
#[derive(Debug, Clone, PartialEq)]
pub struct Compiled {
    pub language: Language,
    pub validated: Validated,
}

pub fn parse_target(tag: &str) -> Result<Language, ConversionError> {
    tag.parse().map_err(|_| ConversionError::UnsupportedTarget(tag.to_string()))
}

pub fn parse_source(tag: &str) -> Result<Language, ConversionError> {
    tag.parse().map_err(|_| ConversionError::UnsupportedSource(tag.to_string()))
}

/// Parse, lower and validate `source`, detecting its language when no hint
/// is given
pub fn compile(source: &str, hint: Option<Language>, config: &EngineConfig) -> Result<Compiled, ConversionError> {
    let mut budget = Budget::new(config);
    compile_with(source, hint, config, &mut budget)
}

fn compile_with(
    source: &str,
    hint: Option<Language>,
    config: &EngineConfig,
    budget: &mut Budget,
) -> Result<Compiled, ConversionError> {
    let language = match hint {
        Some(language) => language,
        None => detect::detect(source, config)?,
    };

    let cst = parser::parse(source, language, budget, config.max_syntax_errors).map_err(|failure| match failure {
        ParseFailure::Syntax(errors) => ConversionError::Syntax(errors),
        ParseFailure::Resource(err) => ConversionError::ResourceExceeded(err),
    })?;
    log::debug!("parsed {} source into {} nodes", language, budget.nodes_used());
    budget.check_time()?;

    let program = lower::lower(&cst).map_err(ConversionError::Lowering)?;
    drop(cst);
    log::debug!("lowered to {} function(s)", program.functions.len());
    budget.check_time()?;

    let validated = validator::validate(program).map_err(ConversionError::Semantic)?;
    budget.check_time()?;
    Ok(Compiled { language, validated })
}

/// Convert `source` into every solution for `target`
pub fn convert(
    source: &str,
    source_language: Option<Language>,
    target: Language,
    config: &EngineConfig,
) -> Result<Vec<CodeSolution>, ConversionError> {
    convert_detailed(source, source_language, target, config).map(|conversion| conversion.solutions)
}

pub fn convert_detailed(
    source: &str,
    source_language: Option<Language>,
    target: Language,
    config: &EngineConfig,
) -> Result<Conversion, ConversionError> {
    let mut budget = Budget::new(config);
    let compiled = compile_with(source, source_language, config, &mut budget)?;

    let options = GenerateOptions {
        style: Style { indent_width: config.indent_width },
        iterative_variants: config.iterative_variants,
    };
    let solutions = codegen::generate(&compiled.validated.program, target, &options);
    budget.check_time()?;
    log::debug!("generated {} {} solution(s)", solutions.len(), target);

    Ok(Conversion {
        source_language: compiled.language,
        solutions,
        warnings: compiled.validated.warnings.iter().map(|w| w.to_string()).collect(),
    })
}

/// Compile `source` and execute it with the reference interpreter
pub fn run_source(source: &str, hint: Option<Language>, config: &EngineConfig) -> Result<Execution, ConversionError> {
    let compiled = compile(source, hint, config)?;
    Ok(interpreter::run(&compiled.validated.program, config)?)
}

/// Serve one wire request
pub fn handle(request: &ConversionRequest, config: &EngineConfig) -> ConversionResponse {
    let result = parse_target(&request.target_language).and_then(|target| {
        let source = request.source_language.as_deref().map(parse_source).transpose()?;
        convert_detailed(&request.source_code, source, target, config)
    });
    match result {
        Ok(conversion) => ConversionResponse::Success {
            source_language: conversion.source_language,
            solutions: conversion.solutions,
            warnings: conversion.warnings,
        },
        Err(err) => {
            log::debug!("conversion failed at {}: {}", err.stage(), err);
            ConversionResponse::Failure { diagnostics: err.diagnostics() }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{ResourceError, Stage};

    const C_FACTORIAL: &str = "int factorial(int n){ if(n<=1) return 1; return n*factorial(n-1); }\n\
        int main(void) { printf(\"%d\\n\", factorial(5)); return 0; }\n";

    #[test]
    fn test_convert_orders_recursive_then_iterative() {
        let solutions = convert(C_FACTORIAL, Some(Language::C), Language::Java, &EngineConfig::default()).unwrap();
        let titles: Vec<&str> = solutions.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, ["Recursive Solution", "Iterative Solution"]);
        assert!(solutions[0].code.contains("public static int factorial(int n)"));
    }

    #[test]
    fn test_variants_can_be_disabled() {
        let config = EngineConfig { iterative_variants: false, ..EngineConfig::default() };
        let solutions = convert(C_FACTORIAL, Some(Language::C), Language::JavaScript, &config).unwrap();
        assert_eq!(solutions.len(), 1);
    }

    #[test]
    fn test_unknown_tags_are_request_errors() {
        let request = ConversionRequest {
            source_code: C_FACTORIAL.to_string(),
            source_language: Some("c".to_string()),
            target_language: "cobol".to_string(),
        };
        let response = handle(&request, &EngineConfig::default());
        match response {
            ConversionResponse::Failure { diagnostics } => {
                assert_eq!(diagnostics.len(), 1);
                assert_eq!(diagnostics[0].stage, Stage::Request);
                assert!(diagnostics[0].message.contains("cobol"));
            }
            other => panic!("expected failure, got {:?}", other),
        }

        assert_eq!(parse_source("pascal"), Err(ConversionError::UnsupportedSource("pascal".to_string())));
    }

    #[test]
    fn test_request_uses_camel_case_and_detects_source() {
        let request: ConversionRequest = serde_json::from_str(&format!(
            r#"{{"sourceCode": {}, "targetLanguage": "cpp"}}"#,
            serde_json::to_string(C_FACTORIAL).unwrap()
        ))
        .unwrap();
        assert_eq!(request.source_language, None);
        let response = handle(&request, &EngineConfig::default());
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["status"], "success");
        assert_eq!(json["sourceLanguage"], "c");
        assert_eq!(json["solutions"][0]["title"], "Recursive Solution");
    }

    #[test]
    fn test_node_budget_is_a_resource_error() {
        let config = EngineConfig { max_nodes: 5, ..EngineConfig::default() };
        let err = convert(C_FACTORIAL, Some(Language::C), Language::Java, &config).unwrap_err();
        assert_eq!(err, ConversionError::ResourceExceeded(ResourceError::Nodes { limit: 5 }));
    }

    #[test]
    fn test_run_source_executes_program() {
        let execution = run_source(C_FACTORIAL, Some(Language::C), &EngineConfig::default()).unwrap();
        assert_eq!(execution.stdout, "120\n");
        assert_eq!(execution.exit_code, 0);
    }
}
