//! Supported interface and email locales.

use core::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A locale the application has translations for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    /// French.
    Fr,
    /// British English.
    #[default]
    Gb,
}

impl Locale {
    /// Short code as used by the frontend (`fr`, `gb`).
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Fr => "fr",
            Self::Gb => "gb",
        }
    }

    /// BCP 47 language tag, for `lang` attributes and `Content-Language`.
    #[must_use]
    pub const fn language_tag(self) -> &'static str {
        match self {
            Self::Fr => "fr-FR",
            Self::Gb => "en-GB",
        }
    }

    /// Pick the first supported language from an `Accept-Language` value.
    ///
    /// Quality values are ignored; entries are taken in the order sent.
    /// Falls back to [`Locale::Gb`].
    ///
    /// ```
    /// use territory_core::Locale;
    ///
    /// assert_eq!(Locale::from_accept_language("fr-CH, fr;q=0.9, en;q=0.8"), Locale::Fr);
    /// assert_eq!(Locale::from_accept_language("de-DE"), Locale::Gb);
    /// ```
    #[must_use]
    pub fn from_accept_language(header: &str) -> Self {
        header
            .split(',')
            .filter_map(|entry| entry.split(';').next())
            .filter_map(|tag| tag.trim().split(['-', '_']).next())
            .find_map(|primary| primary.parse().ok())
            .unwrap_or_default()
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Locale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fr" => Ok(Self::Fr),
            "gb" | "en" | "uk" => Ok(Self::Gb),
            other => Err(format!("unsupported locale: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_str_aliases() {
        assert_eq!("FR".parse::<Locale>(), Ok(Locale::Fr));
        assert_eq!("en".parse::<Locale>(), Ok(Locale::Gb));
        assert!("es".parse::<Locale>().is_err());
    }

    #[test]
    fn test_accept_language_order() {
        assert_eq!(Locale::from_accept_language("en-GB,fr;q=0.5"), Locale::Gb);
        assert_eq!(Locale::from_accept_language("es, fr_FR"), Locale::Fr);
        assert_eq!(Locale::from_accept_language(""), Locale::Gb);
    }

    #[test]
    fn test_language_tags() {
        assert_eq!(Locale::Fr.language_tag(), "fr-FR");
        assert_eq!(Locale::Gb.language_tag(), "en-GB");
    }

    #[test]
    fn test_serde_codes() {
        assert_eq!(serde_json::to_string(&Locale::Fr).ok().as_deref(), Some("\"fr\""));
    }
}
