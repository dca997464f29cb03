// ABOUTME: Theme catalog for the deckgen application
// ABOUTME: Maps theme names to the five-color palettes used by every renderer

use std::collections::BTreeMap;

/// Theme used whenever a requested name is not in the catalog.
pub const DEFAULT_THEME: &str = "professional";

/// Five-color palette resolved from a theme name. Colors are six-digit hex
/// strings without a leading `#`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPalette {
    pub primary: String,
    pub secondary: String,
    pub accent: String,
    pub background: String,
    pub text: String,
}

impl ResolvedPalette {
    fn new(primary: &str, secondary: &str, accent: &str, background: &str, text: &str) -> Self {
        Self {
            primary: primary.to_string(),
            secondary: secondary.to_string(),
            accent: accent.to_string(),
            background: background.to_string(),
            text: text.to_string(),
        }
    }
}

/// Immutable theme lookup table, built once at startup and shared by `Arc`.
#[derive(Debug, Clone)]
pub struct ThemeCatalog {
    palettes: BTreeMap<String, ResolvedPalette>,
}

impl Default for ThemeCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ThemeCatalog {
    /// The five built-in themes.
    pub fn builtin() -> Self {
        let mut palettes = BTreeMap::new();
        palettes.insert(
            "professional".to_string(),
            ResolvedPalette::new("1f3a93", "2d5aa0", "4a90e2", "ffffff", "333333"),
        );
        palettes.insert(
            "creative".to_string(),
            ResolvedPalette::new("8b5cf6", "ec4899", "f59e0b", "faf5ff", "1f2937"),
        );
        palettes.insert(
            "minimal".to_string(),
            ResolvedPalette::new("000000", "6b7280", "9ca3af", "ffffff", "111827"),
        );
        palettes.insert(
            "dark".to_string(),
            ResolvedPalette::new("ffffff", "e5e7eb", "60a5fa", "111827", "f9fafb"),
        );
        palettes.insert(
            "colorful".to_string(),
            ResolvedPalette::new("ef4444", "3b82f6", "10b981", "fef3c7", "1f2937"),
        );
        Self { palettes }
    }

    /// Canonical catalog key for `name`, falling back to `professional`.
    pub fn canonicalize(&self, name: &str) -> String {
        let key = name.trim().to_lowercase();
        if self.palettes.contains_key(&key) {
            key
        } else {
            DEFAULT_THEME.to_string()
        }
    }

    /// Palette for `name`; unknown names resolve to the `professional` palette.
    pub fn resolve(&self, name: &str) -> &ResolvedPalette {
        let key = self.canonicalize(name);
        match self.palettes.get(&key) {
            Some(palette) => palette,
            None => &self.palettes[DEFAULT_THEME],
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.palettes.keys().map(String::as_str)
    }
}
