use serde::Serialize;

/// A language the explanation service can answer in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Language {
    pub label: &'static str,
    pub code: &'static str, // ISO-639-1
}

pub const LANGUAGES: &[Language] = &[
    Language { label: "🇺🇸 English", code: "en" },
    Language { label: "🇪🇸 Spanish", code: "es" },
    Language { label: "🇫🇷 French", code: "fr" },
    Language { label: "🇩🇪 German", code: "de" },
    Language { label: "🇮🇳 Hindi", code: "hi" },
    Language { label: "🇨🇳 Chinese", code: "zh" },
    Language { label: "🇯🇵 Japanese", code: "ja" },
    Language { label: "🇷🇺 Russian", code: "ru" },
];

pub fn find(code: &str) -> Option<&'static Language> {
    LANGUAGES.iter().find(|l| l.code.eq_ignore_ascii_case(code))
}
