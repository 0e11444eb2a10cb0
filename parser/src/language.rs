//! @ai:module:intent Map language hints to the comment delimiters used to find annotations
//! @ai:module:layer domain
//! @ai:module:public_api CommentProfile, BlockDelimiter, LanguageEntry, ProfileRegistry, profile_for, detect_language
//! @ai:module:stateless true
//!
//! Every supported syntax is one row of [`BUILTIN_ROWS`]. Configuration can
//! add rows at runtime through [`ProfileRegistry::with_entry`]; no language
//! has its own control flow.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::LazyLock;

/// @ai:intent A multi-line comment delimiter pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockDelimiter {
    pub open: String,
    pub close: String,
    /// Decoration repeated at the start of inner lines, e.g. `*` in `/** ... */`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub continuation: Option<String>,
}

/// @ai:intent Comment syntax used to recognize candidate annotation lines
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CommentProfile {
    #[serde(default)]
    pub line_prefixes: Vec<String>,
    #[serde(default)]
    pub block_delimiters: Vec<BlockDelimiter>,
}

/// A comment opener found on a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opener<'a> {
    Line(&'a str),
    Block(&'a BlockDelimiter),
}

impl Opener<'_> {
    fn token(&self) -> &str {
        match self {
            Opener::Line(prefix) => prefix,
            Opener::Block(block) => &block.open,
        }
    }
}

impl CommentProfile {
    /// @ai:intent Build a profile from static delimiter tables
    /// @ai:effects pure
    pub fn new(line_prefixes: &[&str], blocks: &[(&str, &str, Option<&str>)]) -> Self {
        Self {
            line_prefixes: line_prefixes.iter().map(|p| p.to_string()).collect(),
            block_delimiters: blocks
                .iter()
                .map(|(open, close, continuation)| BlockDelimiter {
                    open: open.to_string(),
                    close: close.to_string(),
                    continuation: continuation.map(str::to_string),
                })
                .collect(),
        }
    }

    /// @ai:intent The permissive fallback used when no hint matches
    /// @ai:effects pure
    pub fn permissive() -> Self {
        Self::new(&["#", "//"], &[C_BLOCK, HTML_BLOCK])
    }

    /// @ai:intent Find the earliest comment opener in `text`
    /// @ai:post on equal positions the longer token wins, so `///` beats `//`
    /// @ai:effects pure
    pub fn first_opener(&self, text: &str) -> Option<(usize, Opener<'_>)> {
        let lines = self
            .line_prefixes
            .iter()
            .filter(|p| !p.is_empty())
            .map(|p| Opener::Line(p.as_str()));
        let blocks = self
            .block_delimiters
            .iter()
            .filter(|b| !b.open.is_empty())
            .map(Opener::Block);

        lines
            .chain(blocks)
            .filter_map(|opener| text.find(opener.token()).map(|pos| (pos, opener)))
            .min_by(|(a_pos, a), (b_pos, b)| {
                a_pos
                    .cmp(b_pos)
                    .then_with(|| b.token().len().cmp(&a.token().len()))
            })
    }

    /// @ai:intent Check the profile can recognize at least one kind of comment
    pub fn is_usable(&self) -> bool {
        self.line_prefixes.iter().any(|p| !p.is_empty())
            || self
                .block_delimiters
                .iter()
                .any(|b| !b.open.is_empty() && !b.close.is_empty())
    }
}

/// @ai:intent A named row of the registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LanguageEntry {
    pub name: String,
    pub aliases: Vec<String>,
    pub extensions: Vec<String>,
    pub file_names: Vec<String>,
    pub profile: CommentProfile,
}

impl LanguageEntry {
    fn matches_hint(&self, hint: &str) -> bool {
        self.name.eq_ignore_ascii_case(hint)
            || self.aliases.iter().any(|a| a.eq_ignore_ascii_case(hint))
            || self.extensions.iter().any(|e| e.eq_ignore_ascii_case(hint))
    }
}

const C_BLOCK: (&str, &str, Option<&str>) = ("/*", "*/", Some("*"));
const HTML_BLOCK: (&str, &str, Option<&str>) = ("<!--", "-->", None);
const SLASHES: &[&str] = &["///", "//!", "//"];

struct ProfileRow {
    name: &'static str,
    aliases: &'static [&'static str],
    extensions: &'static [&'static str],
    file_names: &'static [&'static str],
    line_prefixes: &'static [&'static str],
    blocks: &'static [(&'static str, &'static str, Option<&'static str>)],
}

static BUILTIN_ROWS: &[ProfileRow] = &[
    ProfileRow {
        name: "rust",
        aliases: &["rs"],
        extensions: &["rs"],
        file_names: &[],
        line_prefixes: SLASHES,
        blocks: &[C_BLOCK],
    },
    ProfileRow {
        name: "python",
        aliases: &["py"],
        extensions: &["py", "pyi", "pyw"],
        file_names: &[],
        line_prefixes: &["#"],
        blocks: &[("\"\"\"", "\"\"\"", None)],
    },
    ProfileRow {
        name: "shell",
        aliases: &["sh", "bash", "zsh"],
        extensions: &["sh", "bash", "zsh", "fish"],
        file_names: &[],
        line_prefixes: &["#"],
        blocks: &[],
    },
    ProfileRow {
        name: "ruby",
        aliases: &["rb"],
        extensions: &["rb", "rake", "gemspec"],
        file_names: &["Gemfile", "Rakefile"],
        line_prefixes: &["#"],
        blocks: &[("=begin", "=end", None)],
    },
    ProfileRow {
        name: "perl",
        aliases: &["pl"],
        extensions: &["pl", "pm"],
        file_names: &[],
        line_prefixes: &["#"],
        blocks: &[],
    },
    ProfileRow {
        name: "typescript",
        aliases: &["ts"],
        extensions: &["ts", "tsx", "mts", "cts"],
        file_names: &[],
        line_prefixes: SLASHES,
        blocks: &[C_BLOCK],
    },
    ProfileRow {
        name: "javascript",
        aliases: &["js", "node"],
        extensions: &["js", "jsx", "mjs", "cjs"],
        file_names: &[],
        line_prefixes: SLASHES,
        blocks: &[C_BLOCK],
    },
    ProfileRow {
        name: "go",
        aliases: &["golang"],
        extensions: &["go"],
        file_names: &[],
        line_prefixes: &["//"],
        blocks: &[C_BLOCK],
    },
    ProfileRow {
        name: "java",
        aliases: &[],
        extensions: &["java"],
        file_names: &[],
        line_prefixes: &["//"],
        blocks: &[C_BLOCK],
    },
    ProfileRow {
        name: "kotlin",
        aliases: &["kt"],
        extensions: &["kt", "kts"],
        file_names: &[],
        line_prefixes: &["//"],
        blocks: &[C_BLOCK],
    },
    ProfileRow {
        name: "swift",
        aliases: &[],
        extensions: &["swift"],
        file_names: &[],
        line_prefixes: SLASHES,
        blocks: &[C_BLOCK],
    },
    ProfileRow {
        name: "c",
        aliases: &[],
        extensions: &["c", "h"],
        file_names: &[],
        line_prefixes: SLASHES,
        blocks: &[C_BLOCK],
    },
    ProfileRow {
        name: "cpp",
        aliases: &["c++", "cxx"],
        extensions: &["cpp", "cc", "cxx", "hpp", "hh", "hxx"],
        file_names: &[],
        line_prefixes: SLASHES,
        blocks: &[C_BLOCK],
    },
    ProfileRow {
        name: "csharp",
        aliases: &["cs", "c#"],
        extensions: &["cs"],
        file_names: &[],
        line_prefixes: SLASHES,
        blocks: &[C_BLOCK],
    },
    ProfileRow {
        name: "php",
        aliases: &[],
        extensions: &["php"],
        file_names: &[],
        line_prefixes: &["//", "#"],
        blocks: &[C_BLOCK],
    },
    ProfileRow {
        name: "css",
        aliases: &[],
        extensions: &["css"],
        file_names: &[],
        line_prefixes: &[],
        blocks: &[C_BLOCK],
    },
    ProfileRow {
        name: "scss",
        aliases: &["sass", "less"],
        extensions: &["scss", "less"],
        file_names: &[],
        line_prefixes: &["//"],
        blocks: &[C_BLOCK],
    },
    ProfileRow {
        name: "html",
        aliases: &["htm"],
        extensions: &["html", "htm", "vue", "svelte"],
        file_names: &[],
        line_prefixes: &[],
        blocks: &[HTML_BLOCK],
    },
    ProfileRow {
        name: "xml",
        aliases: &["svg"],
        extensions: &["xml", "svg", "xsd", "xsl"],
        file_names: &[],
        line_prefixes: &[],
        blocks: &[HTML_BLOCK],
    },
    ProfileRow {
        name: "markdown",
        aliases: &["md"],
        extensions: &["md", "markdown", "mdx"],
        file_names: &[],
        line_prefixes: &[],
        blocks: &[HTML_BLOCK],
    },
    ProfileRow {
        name: "yaml",
        aliases: &["yml"],
        extensions: &["yaml", "yml"],
        file_names: &[],
        line_prefixes: &["#"],
        blocks: &[],
    },
    ProfileRow {
        name: "toml",
        aliases: &[],
        extensions: &["toml"],
        file_names: &[],
        line_prefixes: &["#"],
        blocks: &[],
    },
    ProfileRow {
        name: "ini",
        aliases: &["cfg", "conf"],
        extensions: &["ini", "cfg", "conf"],
        file_names: &[],
        line_prefixes: &[";", "#"],
        blocks: &[],
    },
    ProfileRow {
        name: "dockerfile",
        aliases: &["docker"],
        extensions: &["dockerfile"],
        file_names: &["Dockerfile", "Containerfile"],
        line_prefixes: &["#"],
        blocks: &[],
    },
    ProfileRow {
        name: "makefile",
        aliases: &["make"],
        extensions: &["mk"],
        file_names: &["Makefile", "makefile", "GNUmakefile"],
        line_prefixes: &["#"],
        blocks: &[],
    },
    ProfileRow {
        name: "sql",
        aliases: &[],
        extensions: &["sql"],
        file_names: &[],
        line_prefixes: &["--"],
        blocks: &[C_BLOCK],
    },
    ProfileRow {
        name: "lua",
        aliases: &[],
        extensions: &["lua"],
        file_names: &[],
        line_prefixes: &["--"],
        blocks: &[("--[[", "]]", None)],
    },
    ProfileRow {
        name: "haskell",
        aliases: &["hs"],
        extensions: &["hs", "lhs"],
        file_names: &[],
        line_prefixes: &["--"],
        blocks: &[("{-", "-}", None)],
    },
    ProfileRow {
        name: "elixir",
        aliases: &["ex"],
        extensions: &["ex", "exs"],
        file_names: &[],
        line_prefixes: &["#"],
        blocks: &[],
    },
    ProfileRow {
        name: "r",
        aliases: &[],
        extensions: &["r"],
        file_names: &[],
        line_prefixes: &["#"],
        blocks: &[],
    },
];

impl ProfileRow {
    fn to_entry(&self) -> LanguageEntry {
        let owned = |items: &[&str]| items.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        LanguageEntry {
            name: self.name.to_string(),
            aliases: owned(self.aliases),
            extensions: owned(self.extensions),
            file_names: owned(self.file_names),
            profile: CommentProfile::new(self.line_prefixes, self.blocks),
        }
    }
}

/// @ai:intent Lookup table from language hints to comment profiles
#[derive(Debug, Clone)]
pub struct ProfileRegistry {
    entries: Vec<LanguageEntry>,
    fallback: CommentProfile,
}

static BUILTIN: LazyLock<ProfileRegistry> = LazyLock::new(ProfileRegistry::builtin);

impl ProfileRegistry {
    /// @ai:intent Create a registry holding only the built-in rows
    /// @ai:effects pure
    pub fn builtin() -> Self {
        Self {
            entries: BUILTIN_ROWS.iter().map(ProfileRow::to_entry).collect(),
            fallback: CommentProfile::permissive(),
        }
    }

    /// @ai:intent Add a row, taking precedence over any existing row of the same name
    /// @ai:effects pure
    pub fn with_entry(mut self, entry: LanguageEntry) -> Self {
        self.entries.retain(|e| !e.name.eq_ignore_ascii_case(&entry.name));
        self.entries.insert(0, entry);
        self
    }

    pub fn entries(&self) -> &[LanguageEntry] {
        &self.entries
    }

    pub fn fallback(&self) -> &CommentProfile {
        &self.fallback
    }

    /// @ai:intent Find the row named by a language name, alias or extension
    /// @ai:example ("Python") -> Some(python)
    /// @ai:example (".rs") -> Some(rust)
    /// @ai:effects pure
    pub fn lookup(&self, hint: &str) -> Option<&LanguageEntry> {
        let hint = hint.trim();
        let hint = hint.strip_prefix('.').unwrap_or(hint);
        if hint.is_empty() {
            return None;
        }
        self.entries.iter().find(|e| e.matches_hint(hint))
    }

    /// @ai:intent Resolve a hint to a profile, falling back to the permissive default
    /// @ai:post never fails
    /// @ai:effects pure
    pub fn profile_for(&self, hint: Option<&str>) -> &CommentProfile {
        hint.and_then(|h| self.lookup(h))
            .map(|e| &e.profile)
            .unwrap_or(&self.fallback)
    }

    /// @ai:intent Detect the row for a path by file name, then by extension
    /// @ai:effects pure
    pub fn detect(&self, path: &Path) -> Option<&LanguageEntry> {
        let file_name = path.file_name()?.to_str()?;
        if let Some(entry) = self
            .entries
            .iter()
            .find(|e| e.file_names.iter().any(|n| n == file_name))
        {
            return Some(entry);
        }

        let ext = path.extension()?.to_str()?;
        self.entries
            .iter()
            .find(|e| e.extensions.iter().any(|x| x.eq_ignore_ascii_case(ext)))
    }
}

impl Default for ProfileRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

/// @ai:intent Resolve a hint against the built-in registry
/// @ai:example (Some("python")) -> profile with "#"
/// @ai:example (None) -> permissive default
/// @ai:effects pure
pub fn profile_for(hint: Option<&str>) -> &'static CommentProfile {
    BUILTIN.profile_for(hint)
}

/// @ai:intent Detect the language name of a path against the built-in registry
/// @ai:example ("test.rs") -> Some("rust")
/// @ai:example ("test.txt") -> None
/// @ai:effects pure
pub fn detect_language(path: &Path) -> Option<&'static str> {
    BUILTIN.detect(path).map(|e| e.name.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_rust() {
        assert_eq!(detect_language(Path::new("test.rs")), Some("rust"));
    }

    #[test]
    fn test_detect_python() {
        assert_eq!(detect_language(Path::new("pkg/test.py")), Some("python"));
    }

    #[test]
    fn test_detect_by_file_name() {
        assert_eq!(detect_language(Path::new("Dockerfile")), Some("dockerfile"));
        assert_eq!(detect_language(Path::new("build/Makefile")), Some("makefile"));
    }

    #[test]
    fn test_unsupported() {
        assert_eq!(detect_language(Path::new("test.txt")), None);
    }

    #[test]
    fn test_hint_accepts_alias_and_extension() {
        let registry = ProfileRegistry::builtin();
        assert_eq!(registry.lookup("PY").map(|e| e.name.as_str()), Some("python"));
        assert_eq!(registry.lookup(".tsx").map(|e| e.name.as_str()), Some("typescript"));
        assert_eq!(registry.lookup("c++").map(|e| e.name.as_str()), Some("cpp"));
        assert!(registry.lookup("").is_none());
    }

    #[test]
    fn test_unknown_hint_falls_back() {
        let profile = profile_for(Some("klingon"));
        assert_eq!(profile, &CommentProfile::permissive());
        assert_eq!(profile_for(None), &CommentProfile::permissive());
        assert_eq!(profile.line_prefixes, vec!["#", "//"]);
        assert_eq!(profile.block_delimiters.len(), 2);
    }

    #[test]
    fn test_first_opener_prefers_earliest_then_longest() {
        let profile = profile_for(Some("rust"));
        let (pos, opener) = profile.first_opener("let x = 1; /// doc").unwrap();
        assert_eq!(pos, 11);
        assert_eq!(opener, Opener::Line("///"));

        let (pos, opener) = profile.first_opener("a /* b */ // c").unwrap();
        assert_eq!(pos, 2);
        assert!(matches!(opener, Opener::Block(b) if b.open == "/*"));

        assert!(profile.first_opener("no comment here").is_none());
    }

    #[test]
    fn test_with_entry_overrides_builtin() {
        let registry = ProfileRegistry::builtin().with_entry(LanguageEntry {
            name: "python".to_string(),
            aliases: vec![],
            extensions: vec!["py".to_string()],
            file_names: vec![],
            profile: CommentProfile::new(&[";;"], &[]),
        });
        assert_eq!(registry.profile_for(Some("py")).line_prefixes, vec![";;"]);
        assert_eq!(
            registry.entries().iter().filter(|e| e.name == "python").count(),
            1
        );
    }
}
