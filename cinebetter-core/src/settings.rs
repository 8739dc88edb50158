//! Per-client settings carried in the leading path segment of every addon URL.
//!
//! The token is a URL query string (`l=fr-FR&h=1`) with one short parameter per
//! field. Fields equal to their default are never written, so the all-default
//! settings encode to the empty string.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::form_urlencoded;

const LANGUAGE_PARAM: &str = "l";
const HIDE_LOW_QUALITY_PARAM: &str = "h";
const DISCOVER_ONLY_PARAM: &str = "d";

const DEFAULT_LANGUAGE: &str = "en-US";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SettingsError {
    #[error("invalid language code: {0}")]
    InvalidLanguage(String),

    #[error("invalid boolean value \"{value}\" on {param}")]
    InvalidFlag { param: &'static str, value: String },
}

/// A `language-REGION` pair normalised to `ll-RR`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LanguageCode(String);

impl LanguageCode {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn language(&self) -> &str {
        &self.0[..2]
    }

    pub fn country(&self) -> &str {
        &self.0[3..]
    }
}

impl Default for LanguageCode {
    fn default() -> Self {
        Self(DEFAULT_LANGUAGE.to_string())
    }
}

impl FromStr for LanguageCode {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split('-');
        let (Some(language), Some(region), None) =
            (parts.next(), parts.next(), parts.next())
        else {
            return Err(SettingsError::InvalidLanguage(s.to_string()));
        };

        let valid = |part: &str| {
            part.len() == 2 && part.chars().all(|c| c.is_ascii_alphabetic())
        };
        if !valid(language) || !valid(region) {
            return Err(SettingsError::InvalidLanguage(s.to_string()));
        }

        Ok(Self(format!(
            "{}-{}",
            language.to_ascii_lowercase(),
            region.to_ascii_uppercase()
        )))
    }
}

impl TryFrom<String> for LanguageCode {
    type Error = SettingsError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<LanguageCode> for String {
    fn from(value: LanguageCode) -> Self {
        value.0
    }
}

impl fmt::Display for LanguageCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSettings {
    pub language_code: LanguageCode,
    pub hide_low_quality: bool,
    pub discover_only: bool,
}

impl UserSettings {
    /// Keying settings that only carry the caller's language.
    pub fn language_only(&self) -> Self {
        Self {
            language_code: self.language_code.clone(),
            ..Self::default()
        }
    }

    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }

    /// Canonical token. Empty for the default settings.
    pub fn encode(&self) -> String {
        let defaults = Self::default();
        let mut serializer = form_urlencoded::Serializer::new(String::new());

        if self.language_code != defaults.language_code {
            serializer.append_pair(LANGUAGE_PARAM, self.language_code.as_str());
        }
        if self.hide_low_quality != defaults.hide_low_quality {
            serializer
                .append_pair(HIDE_LOW_QUALITY_PARAM, encode_flag(self.hide_low_quality));
        }
        if self.discover_only != defaults.discover_only {
            serializer.append_pair(DISCOVER_ONLY_PARAM, encode_flag(self.discover_only));
        }

        serializer.finish()
    }

    /// Parses a token. Missing parameters take their default, unknown ones are
    /// ignored and the first occurrence of a repeated parameter wins.
    pub fn decode(token: &str) -> Result<Self, SettingsError> {
        let token = token.strip_prefix('?').unwrap_or(token);
        let lookup = |param: &str| {
            form_urlencoded::parse(token.as_bytes())
                .find(|(key, _)| key == param)
                .map(|(_, value)| value.into_owned())
        };

        let language_code = match lookup(LANGUAGE_PARAM) {
            Some(value) if !value.is_empty() => value.parse()?,
            _ => LanguageCode::default(),
        };

        Ok(Self {
            language_code,
            hide_low_quality: decode_flag(
                HIDE_LOW_QUALITY_PARAM,
                lookup(HIDE_LOW_QUALITY_PARAM),
            )?,
            discover_only: decode_flag(
                DISCOVER_ONLY_PARAM,
                lookup(DISCOVER_ONLY_PARAM),
            )?,
        })
    }
}

fn encode_flag(value: bool) -> &'static str {
    if value { "1" } else { "0" }
}

fn decode_flag(
    param: &'static str,
    value: Option<String>,
) -> Result<bool, SettingsError> {
    match value.as_deref() {
        None => Ok(false),
        Some("0") => Ok(false),
        Some("1") => Ok(true),
        Some(other) => Err(SettingsError::InvalidFlag {
            param,
            value: other.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_encode_to_empty_token() {
        assert_eq!(UserSettings::default().encode(), "");
        assert_eq!(UserSettings::decode("").unwrap(), UserSettings::default());
    }

    #[test]
    fn explicit_defaults_collapse_to_empty_token() {
        let settings = UserSettings::decode("l=en-us&h=0&d=0").unwrap();
        assert!(settings.is_default());
        assert_eq!(settings.encode(), "");
    }

    #[test]
    fn encodes_in_field_order() {
        let settings = UserSettings {
            language_code: "FR-fr".parse().unwrap(),
            hide_low_quality: true,
            discover_only: true,
        };
        assert_eq!(settings.encode(), "l=fr-FR&h=1&d=1");
    }

    #[test]
    fn encode_decode_encode_is_stable() {
        for token in ["", "l=de-DE", "h=1", "d=1&l=ja-jp", "x=9&h=1&d=0"] {
            let first = UserSettings::decode(token).unwrap().encode();
            let second = UserSettings::decode(&first).unwrap().encode();
            assert_eq!(first, second, "token {token:?}");
        }
    }

    #[test]
    fn rejects_malformed_values() {
        assert!(matches!(
            UserSettings::decode("l=english"),
            Err(SettingsError::InvalidLanguage(_))
        ));
        assert!(matches!(
            UserSettings::decode("h=yes"),
            Err(SettingsError::InvalidFlag { param: "h", .. })
        ));
    }

    #[test]
    fn language_code_parts() {
        let code: LanguageCode = "pt-br".parse().unwrap();
        assert_eq!(code.as_str(), "pt-BR");
        assert_eq!(code.language(), "pt");
        assert_eq!(code.country(), "BR");
    }
}
