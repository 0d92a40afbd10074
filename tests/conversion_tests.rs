// Integration tests for the Polyglot conversion pipeline
//
// These tests drive the public API end to end:
// - Round trips: convert a program, re-read the generated code with the
//   target's own front end and compare interpreter output
// - Error reporting for each stage
// - Determinism and idempotence of conversion
// - Source language detection

use polyglot::config::EngineConfig;
use polyglot::converter::{self, ConversionRequest, ConversionResponse};
use polyglot::errors::{ConversionError, LoweringError, Position, ResourceError, SemanticError, Stage};
use polyglot::interpreter::{self, Execution};
use polyglot::ir::{Block, Builtin, Expression, Function, Program, Statement, Type};
use polyglot::{convert, Language};

const C_FACTORIAL: &str = "#include <stdio.h>\n\
int factorial(int n){ if(n<=1) return 1; return n*factorial(n-1); }\n\
int main(void) {\n    printf(\"%d\\n\", factorial(5));\n    return 0;\n}\n";

const JS_FIBONACCI: &str = "function fib(n) {\n  if (n < 2) return n;\n  return fib(n - 1) + fib(n - 2);\n}\nconsole.log(fib(10));\n";

const JAVA_ARRAY_SUM: &str = "public class Main {
    static int sum(int[] values) {
        int total = 0;
        for (int i = 0; i < values.length; i++) {
            total += values[i];
        }
        return total;
    }

    public static void main(String[] args) {
        int[] data = {3, 1, 4, 1, 5};
        System.out.println(\"sum = \" + sum(data));
    }
}
";

const C_SHADOWING: &str = "#include <stdio.h>
int main(void) {
    int y = 1;
    {
        int y = 5;
        printf(\"%d\\n\", y);
    }
    {
        int y = 2;
        printf(\"%d\\n\", y);
    }
    printf(\"%d\\n\", y);
    return 0;
}
";

const JS_POWER_OF_TWO: &str = "let p = 1;\nfor (let i = 0; i < 40; i++) {\n  p = p * 2;\n}\nconsole.log(p);\n";

const C_WHILE_ONE: &str = "#include <stdio.h>
int first_above_three(int n) {
    while (1) {
        if (n > 3) return n;
        n++;
    }
}
int main(void) {
    printf(\"%d\\n\", first_above_three(1));
    return 0;
}
";

const CPP_GREETING: &str = "#include <iostream>
#include <string>
using namespace std;

int main() {
    string name = \"world\";
    int n = 7;
    double half = n / 2.0;
    cout << \"hello \" << name << endl;
    cout << n << \" halves to \" << half << endl;
    return 0;
}
";

fn config() -> EngineConfig {
    EngineConfig::default()
}

fn compile(source: &str, language: Language) -> Program {
    match converter::compile(source, Some(language), &config()) {
        Ok(compiled) => compiled.validated.program,
        Err(err) => panic!("{} source failed to compile: {:?}\n{}", language, err.diagnostics(), source),
    }
}

fn run(program: &Program) -> Execution {
    interpreter::run(program, &config()).unwrap()
}

/// Convert to every other language and check each solution, read back by
/// that language's front end, prints the same output
fn assert_round_trips(source: &str, language: Language, expected: &str) {
    assert_eq!(run(&compile(source, language)).stdout, expected);

    for target in Language::ALL.into_iter().filter(|&t| t != language) {
        let solutions = convert(source, Some(language), target, &config()).unwrap();
        assert!(!solutions.is_empty());
        for solution in &solutions {
            let program = compile(&solution.code, target);
            assert_eq!(
                run(&program).stdout,
                expected,
                "{} -> {} ({}) changed behavior:\n{}",
                language,
                target,
                solution.title,
                solution.code
            );
        }
    }
}

#[test]
fn test_factorial_round_trips_from_c() {
    assert_round_trips(C_FACTORIAL, Language::C, "120\n");
}

#[test]
fn test_fibonacci_round_trips_from_javascript() {
    assert_round_trips(JS_FIBONACCI, Language::JavaScript, "55\n");
}

#[test]
fn test_array_sum_round_trips_from_java() {
    assert_round_trips(JAVA_ARRAY_SUM, Language::Java, "sum = 14\n");
}

#[test]
fn test_string_and_number_output_round_trips_from_cpp() {
    assert_round_trips(CPP_GREETING, Language::Cpp, "hello world\n7 halves to 3.5\n");
}

#[test]
fn test_bare_c_factorial_converts_to_java() {
    let source = "int factorial(int n){ if(n<=1) return 1; return n*factorial(n-1); }";
    let solutions = convert(source, Some(Language::C), Language::Java, &config()).unwrap();
    assert_eq!(solutions[0].title, "Recursive Solution");
    assert!(solutions[0].code.starts_with("public class Main {"));

    for solution in &solutions {
        let mut program = compile(&solution.code, Language::Java);
        program.functions.push(Function {
            name: "main".to_string(),
            params: Vec::new(),
            return_type: Type::Void,
            body: Block::new(vec![Statement::Expr(Expression::builtin(
                Builtin::Println,
                vec![Expression::call("factorial", vec![Expression::int(5)])],
            ))]),
        });
        assert_eq!(run(&program).stdout, "120\n", "{}", solution.code);
    }
}

#[test]
fn test_factorial_converts_idiomatically_to_c_and_javascript() {
    let c = convert(C_FACTORIAL, Some(Language::C), Language::C, &config()).unwrap();
    let js = convert(C_FACTORIAL, Some(Language::C), Language::JavaScript, &config()).unwrap();
    assert!(c[0].code.contains("int factorial(int n) {"));
    assert!(c[0].code.contains("printf(\"%d\\n\", factorial(5));"));
    assert!(js[0].code.contains("function factorial(n) {"));
    assert!(js[0].code.contains("console.log(factorial(5));"));
    assert!(js[0].code.ends_with("main();\n"));
    assert!(c[1].code.contains("return result;"), "{}", c[1].code);
    assert!(!c[1].code.contains("result * 1"));
    assert_eq!(run(&compile(&js[0].code, Language::JavaScript)).stdout, "120\n");
}

#[test]
fn test_undeclared_variable_is_a_lowering_error() {
    let source = "int f() {\n  int count = 1;\n  return cout + 1;\n}";
    let err = convert(source, Some(Language::C), Language::Java, &config()).unwrap_err();
    match &err {
        ConversionError::Lowering(errors) => {
            assert_eq!(errors.len(), 1);
            assert!(matches!(&errors[0], LoweringError::UndeclaredIdentifier { name, .. } if name == "cout"));
            assert_eq!(errors[0].position(), Position::new(3, 10, 36));
        }
        other => panic!("expected lowering errors, got {:?}", other),
    }
    let diagnostics = err.diagnostics();
    assert_eq!(diagnostics[0].stage, Stage::Lowering);
    assert_eq!((diagnostics[0].line, diagnostics[0].column), (Some(3), Some(10)));
    assert_eq!(diagnostics[0].help.as_deref(), Some("did you mean 'count'?"));
}

#[test]
fn test_goto_is_an_unsupported_construct() {
    let err = convert("int main() { goto done; done: return 0; }", Some(Language::C), Language::JavaScript, &config())
        .unwrap_err();
    assert_eq!(
        err,
        ConversionError::Lowering(vec![
            LoweringError::UnsupportedConstruct { kind: "goto".to_string(), position: Position::new(1, 14, 13) },
            LoweringError::UnsupportedConstruct { kind: "label".to_string(), position: Position::new(1, 25, 24) },
        ])
    );
}

#[test]
fn test_missing_return_is_a_semantic_error() {
    let err = convert("int f(int n) { if (n > 0) return 1; }", Some(Language::C), Language::Cpp, &config()).unwrap_err();
    assert_eq!(err, ConversionError::Semantic(vec![SemanticError::MissingReturn { function: "f".to_string() }]));
}

#[test]
fn test_syntax_errors_stop_the_pipeline() {
    let err = convert("int main() { int x = ; return 0; }", Some(Language::C), Language::Java, &config()).unwrap_err();
    assert_eq!(err.stage(), Stage::Syntax);
    assert!(err.diagnostics().iter().all(|d| d.stage == Stage::Syntax && d.line == Some(1)));
}

#[test]
fn test_conversion_is_deterministic() {
    for target in Language::ALL {
        let first = convert(JAVA_ARRAY_SUM, Some(Language::Java), target, &config()).unwrap();
        let second = convert(JAVA_ARRAY_SUM, Some(Language::Java), target, &config()).unwrap();
        assert_eq!(first, second);
    }
    assert_eq!(compile(JS_FIBONACCI, Language::JavaScript), compile(JS_FIBONACCI, Language::JavaScript));

    let broken = "int f() { return a + b; }";
    let first = convert(broken, Some(Language::C), Language::Java, &config()).unwrap_err();
    let second = convert(broken, Some(Language::C), Language::Java, &config()).unwrap_err();
    assert_eq!(first, second);
}

#[test]
fn test_equivalent_sources_generate_identical_code() {
    let java = "class M { static int factorial(int n) { if (n <= 1) { return 1; } return n * factorial(n - 1); } }";
    let c = "int factorial(int n){ if(n<=1) return 1; return n*factorial(n-1); }";
    for target in Language::ALL {
        assert_eq!(
            convert(java, Some(Language::Java), target, &config()).unwrap(),
            convert(c, Some(Language::C), target, &config()).unwrap()
        );
    }
}

#[test]
fn test_source_language_is_detected() {
    let response = converter::handle(
        &ConversionRequest {
            source_code: JS_FIBONACCI.to_string(),
            source_language: None,
            target_language: "c".to_string(),
        },
        &config(),
    );
    match response {
        ConversionResponse::Success { source_language, solutions, .. } => {
            assert_eq!(source_language, Language::JavaScript);
            assert!(solutions[0].code.contains("long long fib(long long n)"));
        }
        other => panic!("expected success, got {:?}", other),
    }

    let err = convert("x", None, Language::C, &config()).unwrap_err();
    assert!(matches!(err, ConversionError::AmbiguousSource { .. }));
    assert_eq!(err.stage(), Stage::Request);
}

#[test]
fn test_run_reports_exit_code() {
    let execution = converter::run_source("int main(void) { return 3; }", Some(Language::C), &config()).unwrap();
    assert_eq!(execution.exit_code, 3);
    assert_eq!(execution.stdout, "");
}

#[test]
fn test_failure_response_serializes_diagnostics() {
    let response = converter::handle(
        &ConversionRequest {
            source_code: "int main() { goto done; done: return 0; }".to_string(),
            source_language: Some("c".to_string()),
            target_language: "java".to_string(),
        },
        &config(),
    );
    let json = serde_json::to_value(&response).unwrap();
    assert_eq!(json["status"], "failure");
    assert_eq!(json["diagnostics"][0]["stage"], "lowering");
    assert_eq!(json["diagnostics"][0]["line"], 1);
    assert_eq!(json["diagnostics"][0]["column"], 14);
}

#[test]
fn test_nested_blocks_keep_their_own_bindings() {
    let execution = converter::run_source(C_SHADOWING, Some(Language::C), &config()).unwrap();
    assert_eq!(execution.stdout, "5\n2\n1\n");
    assert_round_trips(C_SHADOWING, Language::C, "5\n2\n1\n");
}

#[test]
fn test_script_integers_do_not_wrap_at_32_bits() {
    let execution = converter::run_source(JS_POWER_OF_TWO, Some(Language::JavaScript), &config()).unwrap();
    assert_eq!(execution.stdout, "1099511627776\n");
    assert_round_trips(JS_POWER_OF_TWO, Language::JavaScript, "1099511627776\n");

    let c = convert(JS_POWER_OF_TWO, Some(Language::JavaScript), Language::C, &config()).unwrap();
    assert!(c[0].code.contains("long long p = 1;"), "{}", c[0].code);
    assert!(c[0].code.contains("printf(\"%lld\\n\", p);"), "{}", c[0].code);
}

#[test]
fn test_infinite_loop_with_inner_return_converts() {
    let execution = converter::run_source(C_WHILE_ONE, Some(Language::C), &config()).unwrap();
    assert_eq!(execution.stdout, "4\n");
    assert_round_trips(C_WHILE_ONE, Language::C, "4\n");

    let java = convert(C_WHILE_ONE, Some(Language::C), Language::Java, &config()).unwrap();
    assert!(java[0].code.contains("while (true) {"), "{}", java[0].code);
}

#[test]
fn test_fixed_point_printf_is_rejected_rather_than_reformatted() {
    let source = "#include <stdio.h>\nint main(void) { double x = 2.5; printf(\"%f\\n\", x); return 0; }";
    let err = convert(source, Some(Language::C), Language::Java, &config()).unwrap_err();
    match err {
        ConversionError::Lowering(errors) => {
            assert_eq!(errors.len(), 1);
            assert!(matches!(&errors[0], LoweringError::UnsupportedConstruct { kind, .. } if kind == "format conversion '%f'"));
            assert_eq!(errors[0].position().line, 2);
        }
        other => panic!("expected lowering errors, got {:?}", other),
    }

    let source = "#include <stdio.h>\nint main(void) { printf(\"%c%d\\n\", 72, 'A'); return 0; }";
    let execution = converter::run_source(source, Some(Language::C), &config()).unwrap();
    assert_eq!(execution.stdout, "H65\n");
}

#[test]
fn test_modified_vector_parameter_by_value_is_rejected() {
    let by_value = "#include <iostream>
#include <vector>
void bump(std::vector<int> v) { v[0] = 99; }
int main() {
    std::vector<int> a(3, 0);
    bump(a);
    std::cout << a[0] << std::endl;
    return 0;
}
";
    let err = convert(by_value, Some(Language::Cpp), Language::Java, &config()).unwrap_err();
    match err {
        ConversionError::Lowering(errors) => {
            assert!(matches!(&errors[0], LoweringError::UnsupportedConstruct { kind, .. }
                if kind == "modified vector parameter passed by value"));
        }
        other => panic!("expected lowering errors, got {:?}", other),
    }

    let by_reference = by_value.replace("std::vector<int> v)", "std::vector<int>& v)");
    let execution = converter::run_source(&by_reference, Some(Language::Cpp), &config()).unwrap();
    assert_eq!(execution.stdout, "99\n");
    let java = convert(&by_reference, Some(Language::Cpp), Language::Java, &config()).unwrap();
    assert!(java[0].code.contains("v[0] = 99;"), "{}", java[0].code);
}

#[test]
fn test_deeply_nested_input_is_a_resource_error() {
    let source = format!("int f() {{ return {}1{}; }}", "(".repeat(500), ")".repeat(500));
    let err = convert(&source, Some(Language::C), Language::Java, &config()).unwrap_err();
    assert_eq!(err, ConversionError::ResourceExceeded(ResourceError::Depth { limit: 100 }));
    assert_eq!(err.stage(), Stage::Resource);
}
