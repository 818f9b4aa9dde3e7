use serde::Serialize;
use std::fmt;

/// A selectable programming language: the name sent to the model and the
/// key an editor uses for syntax highlighting.
#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq, Hash)]
pub struct Language {
    pub name: &'static str,
    pub editor_key: &'static str,
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

pub static LANGUAGES: [Language; 12] = [
    Language { name: "JavaScript", editor_key: "javascript" },
    Language { name: "Python", editor_key: "python" },
    Language { name: "TypeScript", editor_key: "typescript" },
    Language { name: "Java", editor_key: "java" },
    Language { name: "C++", editor_key: "cpp" },
    Language { name: "C#", editor_key: "csharp" },
    Language { name: "Go", editor_key: "go" },
    Language { name: "Rust", editor_key: "rust" },
    Language { name: "Ruby", editor_key: "ruby" },
    Language { name: "PHP", editor_key: "php" },
    Language { name: "Swift", editor_key: "swift" },
    Language { name: "Kotlin", editor_key: "kotlin" },
];

/// Case-insensitive lookup by display name or editor key.
pub fn find(query: &str) -> Option<&'static Language> {
    let q = query.trim();
    LANGUAGES
        .iter()
        .find(|l| l.name.eq_ignore_ascii_case(q) || l.editor_key.eq_ignore_ascii_case(q))
}

pub fn default_source() -> &'static Language {
    &LANGUAGES[0]
}

pub fn default_target() -> &'static Language {
    &LANGUAGES[1]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn lookup_accepts_name_or_editor_key() {
        assert_eq!(find("c++").map(|l| l.editor_key), Some("cpp"));
        assert_eq!(find("CSHARP").map(|l| l.name), Some("C#"));
        assert_eq!(find(" python ").map(|l| l.name), Some("Python"));
        assert!(find("brainfuck").is_none());
    }

    #[test]
    fn defaults_are_first_two_entries() {
        assert_eq!(default_source().name, "JavaScript");
        assert_eq!(default_target().name, "Python");
    }

    #[test]
    fn names_and_keys_are_unique() {
        let names: HashSet<_> = LANGUAGES.iter().map(|l| l.name.to_lowercase()).collect();
        let keys: HashSet<_> = LANGUAGES.iter().map(|l| l.editor_key).collect();
        assert_eq!(names.len(), LANGUAGES.len());
        assert_eq!(keys.len(), LANGUAGES.len());
    }
}
