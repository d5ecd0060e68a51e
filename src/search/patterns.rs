//! Regular expressions describing how a symbol can appear in kernel source.

use regex::escape;

/// The lexical forms searched for one symbol:
///
/// - `EXPORT_SYMBOL(s)` and `EXPORT_SYMBOL_GPL(s)` exports
/// - `s(...) {` function definitions
/// - `#define s` preprocessor macros
/// - `data1 s`, `ptr s`, `.word s` style assembly references
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolPatterns {
    alternatives: Vec<String>,
}

impl SymbolPatterns {
    pub fn new(symbol: &str) -> Self {
        let s = escape(symbol);
        SymbolPatterns {
            alternatives: vec![
                format!(r"EXPORT_SYMBOL\({}\)", s),
                format!(r"EXPORT_SYMBOL_GPL\({}\)", s),
                format!(r"{}\(.*\)[\s]*\{{", s),
                format!(r"#define {}", s),
                format!(r"(data\d+|ptr|(\.[a-zA-Z_]*))\W*{}", s),
            ],
        }
    }

    pub fn alternatives(&self) -> &[String] {
        &self.alternatives
    }

    /// All alternatives joined into one disjunction
    pub fn to_regex(&self) -> String {
        self.alternatives.join("|")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use regex::RegexBuilder;

    fn matcher(symbol: &str) -> regex::Regex {
        RegexBuilder::new(&SymbolPatterns::new(symbol).to_regex())
            .case_insensitive(true)
            .multi_line(true)
            .build()
            .unwrap()
    }

    #[test]
    fn test_five_alternatives() {
        let patterns = SymbolPatterns::new("do_fork");
        assert_eq!(patterns.alternatives().len(), 5);
        assert_eq!(patterns.alternatives()[0], r"EXPORT_SYMBOL\(do_fork\)");
    }

    #[test]
    fn test_matches_each_form() {
        let re = matcher("do_fork");
        assert!(re.is_match("EXPORT_SYMBOL(do_fork);"));
        assert!(re.is_match("EXPORT_SYMBOL_GPL(do_fork);"));
        assert!(re.is_match("long do_fork(unsigned long clone_flags)\n{"));
        assert!(re.is_match("#define do_fork _do_fork"));
        assert!(re.is_match("\t.word\tdo_fork"));
        assert!(re.is_match("\tptr\tdo_fork"));
        assert!(!re.is_match("do_fork();"));
    }

    #[test]
    fn test_case_insensitive() {
        assert!(matcher("do_fork").is_match("export_symbol(DO_FORK);"));
    }

    #[test]
    fn test_metacharacters_are_literal() {
        let re = matcher("foo.bar+");
        assert!(re.is_match("#define foo.bar+ 1"));
        assert!(!re.is_match("#define fooXbarr 1"));
        assert!(!re.is_match("#define foo.barrr 1"));
    }
}
