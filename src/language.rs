//! Source language detection from file extensions.

use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    TypeScript,
    JavaScript,
    Python,
    Rust,
    Go,
    Java,
    Kotlin,
    CSharp,
    Cpp,
    C,
    Ruby,
    Php,
    Swift,
    Scala,
    Shell,
    Lua,
    Sql,
    Html,
    Css,
    Vue,
    Svelte,
    Dart,
    Haskell,
    Elixir,
    Unknown,
}

/// Extension (lowercase, without the dot) to language.
const EXTENSION_TABLE: &[(&str, Language)] = &[
    ("ts", Language::TypeScript),
    ("tsx", Language::TypeScript),
    ("mts", Language::TypeScript),
    ("cts", Language::TypeScript),
    ("js", Language::JavaScript),
    ("jsx", Language::JavaScript),
    ("mjs", Language::JavaScript),
    ("cjs", Language::JavaScript),
    ("py", Language::Python),
    ("pyi", Language::Python),
    ("rs", Language::Rust),
    ("go", Language::Go),
    ("java", Language::Java),
    ("kt", Language::Kotlin),
    ("kts", Language::Kotlin),
    ("cs", Language::CSharp),
    ("cpp", Language::Cpp),
    ("cc", Language::Cpp),
    ("cxx", Language::Cpp),
    ("hpp", Language::Cpp),
    ("hh", Language::Cpp),
    ("c", Language::C),
    ("h", Language::C),
    ("rb", Language::Ruby),
    ("php", Language::Php),
    ("swift", Language::Swift),
    ("scala", Language::Scala),
    ("sh", Language::Shell),
    ("bash", Language::Shell),
    ("zsh", Language::Shell),
    ("lua", Language::Lua),
    ("sql", Language::Sql),
    ("html", Language::Html),
    ("htm", Language::Html),
    ("css", Language::Css),
    ("scss", Language::Css),
    ("vue", Language::Vue),
    ("svelte", Language::Svelte),
    ("dart", Language::Dart),
    ("hs", Language::Haskell),
    ("ex", Language::Elixir),
    ("exs", Language::Elixir),
];

impl Language {
    pub fn from_extension(ext: &str) -> Language {
        let ext = ext.trim_start_matches('.').to_ascii_lowercase();
        EXTENSION_TABLE
            .iter()
            .find(|(candidate, _)| *candidate == ext)
            .map(|(_, language)| *language)
            .unwrap_or(Language::Unknown)
    }

    pub fn from_path(path: &Path) -> Language {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(Language::from_extension)
            .unwrap_or(Language::Unknown)
    }

    pub fn is_supported(self) -> bool {
        self != Language::Unknown
    }

    /// Stable lowercase tag stored alongside cached commentary.
    pub fn tag(self) -> &'static str {
        match self {
            Language::TypeScript => "typescript",
            Language::JavaScript => "javascript",
            Language::Python => "python",
            Language::Rust => "rust",
            Language::Go => "go",
            Language::Java => "java",
            Language::Kotlin => "kotlin",
            Language::CSharp => "csharp",
            Language::Cpp => "cpp",
            Language::C => "c",
            Language::Ruby => "ruby",
            Language::Php => "php",
            Language::Swift => "swift",
            Language::Scala => "scala",
            Language::Shell => "shellscript",
            Language::Lua => "lua",
            Language::Sql => "sql",
            Language::Html => "html",
            Language::Css => "css",
            Language::Vue => "vue",
            Language::Svelte => "svelte",
            Language::Dart => "dart",
            Language::Haskell => "haskell",
            Language::Elixir => "elixir",
            Language::Unknown => "unknown",
        }
    }
}
