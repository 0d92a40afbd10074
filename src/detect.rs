// File: src/detect.rs
//
// Best-effort source language detection.
//
// Each language has a table of weighted textual markers. The highest total
// wins; when the leaders tie, each tied candidate's front end gets a chance
// to parse the source and a single clean parse decides. Anything still
// undecided is reported as AmbiguousSource instead of guessed.

use crate::config::{Budget, EngineConfig};
use crate::errors::ConversionError;
use crate::language::Language;
use crate::parser;
use serde::Serialize;

/// Marker text and its weight
type Marker = (&'static str, u32);

const JAVA: &[Marker] = &[
    ("public class ", 4),
    ("System.out.", 5),
    ("public static void main", 5),
    ("String[] args", 4),
    ("static ", 1),
    ("boolean ", 2),
    (".equals(", 2),
    ("import java.", 5),
    ("new int[", 2),
];

const C: &[Marker] = &[
    ("#include <stdio.h>", 5),
    ("#include <stdlib.h>", 3),
    ("#include <string.h>", 3),
    ("#include <math.h>", 2),
    ("#include <stdbool.h>", 3),
    ("printf(", 3),
    ("puts(", 2),
    ("int main(void)", 3),
    ("char*", 1),
    ("char *", 1),
    ("#include", 1),
];

const CPP: &[Marker] = &[
    ("#include <iostream>", 5),
    ("#include <vector>", 4),
    ("#include <string>", 3),
    ("using namespace std", 5),
    ("std::", 3),
    ("cout", 3),
    ("endl", 2),
    ("vector<", 3),
    ("#include", 1),
];

const JAVASCRIPT: &[Marker] = &[
    ("function ", 3),
    ("console.log", 5),
    ("let ", 2),
    ("const ", 1),
    ("var ", 2),
    ("===", 3),
    ("!==", 3),
    ("=>", 2),
    ("process.stdout", 4),
    ("Math.floor", 1),
];

fn markers(language: Language) -> &'static [Marker] {
    match language {
        Language::Java => JAVA,
        Language::C => C,
        Language::Cpp => CPP,
        Language::JavaScript => JAVASCRIPT,
    }
}

/// Marker score of one language
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Score {
    pub language: Language,
    pub score: u32,
}

/// Scores for every language, highest first; ties keep registry order
pub fn scores(source: &str) -> Vec<Score> {
    let mut scores: Vec<Score> = Language::ALL
        .iter()
        .map(|&language| Score {
            language,
            score: markers(language).iter().map(|(text, weight)| source.matches(text).count() as u32 * weight).sum(),
        })
        .collect();
    scores.sort_by(|a, b| b.score.cmp(&a.score));
    scores
}

/// The source language, or AmbiguousSource listing the best candidates
pub fn detect(source: &str, config: &EngineConfig) -> Result<Language, ConversionError> {
    let ranked = scores(source);
    let best = ranked.first().map_or(0, |s| s.score);
    if best == 0 {
        log::debug!("no language markers found");
        return Err(ConversionError::AmbiguousSource { candidates: Vec::new() });
    }
    let tied: Vec<Language> = ranked.iter().take_while(|s| s.score == best).map(|s| s.language).collect();
    if let [language] = tied.as_slice() {
        log::debug!("detected {} with score {}", language, best);
        return Ok(*language);
    }

    let parsing: Vec<Language> = tied
        .iter()
        .copied()
        .filter(|&language| {
            let mut budget = Budget::new(config);
            parser::parse(source, language, &mut budget, config.max_syntax_errors).is_ok()
        })
        .collect();
    match parsing.as_slice() {
        [language] => {
            log::debug!("detected {} by parsing among {} tied candidates", language, tied.len());
            Ok(*language)
        }
        _ => Err(ConversionError::AmbiguousSource { candidates: tied }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detect_default(source: &str) -> Result<Language, ConversionError> {
        detect(source, &EngineConfig::default())
    }

    #[test]
    fn test_detects_each_language() {
        assert_eq!(
            detect_default("public class Main { public static void main(String[] args) { System.out.println(1); } }"),
            Ok(Language::Java)
        );
        assert_eq!(detect_default("#include <stdio.h>\nint main(void) { printf(\"%d\\n\", 1); return 0; }"), Ok(Language::C));
        assert_eq!(
            detect_default("#include <iostream>\nusing namespace std;\nint main() { cout << 1 << endl; }"),
            Ok(Language::Cpp)
        );
        assert_eq!(detect_default("function f(n) { return n; }\nconsole.log(f(2));"), Ok(Language::JavaScript));
    }

    #[test]
    fn test_no_markers_is_ambiguous() {
        assert_eq!(detect_default("x"), Err(ConversionError::AmbiguousSource { candidates: vec![] }));
    }

    #[test]
    fn test_scores_are_sorted() {
        let ranked = scores("console.log(1); let x = 2;");
        assert_eq!(ranked[0], Score { language: Language::JavaScript, score: 7 });
        assert!(ranked.windows(2).all(|w| w[0].score >= w[1].score));
    }
}
