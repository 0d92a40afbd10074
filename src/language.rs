// File: src/language.rs
//
// The closed set of languages Polyglot can read and write.
// Every front end and every backend is keyed by one of these tags.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Java,
    C,
    Cpp,
    #[serde(alias = "js")]
    JavaScript,
}

impl Language {
    /// All supported languages, in registry order
    pub const ALL: [Language; 4] = [Language::Java, Language::C, Language::Cpp, Language::JavaScript];

    /// The wire tag used in requests and on the command line
    pub fn tag(self) -> &'static str {
        match self {
            Language::Java => "java",
            Language::C => "c",
            Language::Cpp => "cpp",
            Language::JavaScript => "javascript",
        }
    }

    /// Human readable name, used in solution titles
    pub fn display_name(self) -> &'static str {
        match self {
            Language::Java => "Java",
            Language::C => "C",
            Language::Cpp => "C++",
            Language::JavaScript => "JavaScript",
        }
    }

    pub fn file_extension(self) -> &'static str {
        match self {
            Language::Java => "java",
            Language::C => "c",
            Language::Cpp => "cpp",
            Language::JavaScript => "js",
        }
    }

    /// Guess a language from a file extension, e.g. when the CLI is given a path
    pub fn from_extension(ext: &str) -> Option<Language> {
        match ext.to_ascii_lowercase().as_str() {
            "java" => Some(Language::Java),
            "c" | "h" => Some(Language::C),
            "cpp" | "cc" | "cxx" | "hpp" => Some(Language::Cpp),
            "js" | "mjs" | "cjs" => Some(Language::JavaScript),
            _ => None,
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Returned when a tag names no supported language
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown language tag '{0}'")]
pub struct UnknownLanguage(pub String);

impl FromStr for Language {
    type Err = UnknownLanguage;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "java" => Ok(Language::Java),
            "c" => Ok(Language::C),
            "cpp" | "c++" | "cxx" => Ok(Language::Cpp),
            "javascript" | "js" | "node" => Ok(Language::JavaScript),
            _ => Err(UnknownLanguage(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tags_round_trip() {
        for lang in Language::ALL {
            assert_eq!(lang.tag().parse::<Language>(), Ok(lang));
        }
    }

    #[test]
    fn test_aliases() {
        assert_eq!("C++".parse::<Language>(), Ok(Language::Cpp));
        assert_eq!("JS".parse::<Language>(), Ok(Language::JavaScript));
        assert!("python".parse::<Language>().is_err());
    }

    #[test]
    fn test_serde_uses_lowercase_tags() {
        let json = serde_json::to_string(&Language::JavaScript).unwrap();
        assert_eq!(json, "\"javascript\"");
        let lang: Language = serde_json::from_str("\"cpp\"").unwrap();
        assert_eq!(lang, Language::Cpp);
    }
}
