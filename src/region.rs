//! Operating region: backend language plus an optional theme suffix.
//!
//! Written as `<lang>` or `<lang>_<theme>`, e.g. `de`, `en_animals`,
//! `fr_objects`.

use std::fmt;
use std::str::FromStr;

use anyhow::{Result, bail};

use crate::consts::DEFAULT_THEME;

/// Languages the backend serves.
const LANGUAGES: &[&str] = &[
    "ar", "cn", "de", "en", "es", "fr", "id", "il", "it", "jp", "kr", "nl", "pl", "pt", "ru", "tr",
];

/// A validated region code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Region {
    language: String,
    theme: u8,
    code: String,
}

impl Region {
    /// Two-letter language, also the backend subdomain.
    pub fn language(&self) -> &str {
        &self.language
    }

    /// Backend theme id: characters (1), objects (2), animals (14).
    pub fn theme(&self) -> u8 {
        self.theme
    }

    /// Base URL of the backend for this region.
    pub fn base_url(&self) -> String {
        format!("https://{}.akinator.com", self.language)
    }
}

impl FromStr for Region {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let code = s.trim().to_lowercase();
        if code.is_empty() {
            bail!("region must not be empty");
        }

        let (language, theme) = match code.split_once('_') {
            Some((lang, suffix)) => {
                let theme = match suffix {
                    "people" | "characters" => DEFAULT_THEME,
                    "objects" => 2,
                    "animals" => 14,
                    other => bail!("unknown theme '{}' in region '{}'", other, code),
                };
                (lang.to_string(), theme)
            }
            None => (code.clone(), DEFAULT_THEME),
        };

        if !LANGUAGES.contains(&language.as_str()) {
            bail!(
                "unknown region '{}' (expected one of: {})",
                code,
                LANGUAGES.join(", ")
            );
        }

        Ok(Self {
            language,
            theme,
            code,
        })
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.code)
    }
}
