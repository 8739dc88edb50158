use tracing::warn;

use crate::settings::UserSettings;

/// The parts of an inbound request the cache layer and services care about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub method: String,
    /// Path as received, still carrying the settings segment if one was sent.
    pub path: String,
    pub query: Option<String>,
    /// Raw settings segment exactly as it appeared in the path.
    pub settings_segment: Option<String>,
    pub settings: UserSettings,
}

impl RequestContext {
    /// Builds a context, decoding the settings segment when present.
    ///
    /// A segment that fails to decode falls back to the default settings.
    pub fn new(
        method: impl Into<String>,
        path: impl Into<String>,
        query: Option<String>,
        settings_segment: Option<String>,
    ) -> Self {
        let settings = match settings_segment.as_deref() {
            Some(segment) => decode_segment(segment),
            None => UserSettings::default(),
        };

        Self {
            method: method.into(),
            path: path.into(),
            query: query.filter(|q| !q.is_empty()),
            settings_segment,
            settings,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new("GET", path, None, None)
    }

    /// Path with the leading settings segment removed.
    pub fn path_without_settings(&self) -> &str {
        let Some(segment) = self.settings_segment.as_deref() else {
            return &self.path;
        };

        self.path
            .strip_prefix('/')
            .and_then(|rest| rest.strip_prefix(segment))
            .filter(|rest| rest.is_empty() || rest.starts_with('/'))
            .unwrap_or(&self.path)
    }
}

fn decode_segment(segment: &str) -> UserSettings {
    let decoded = match urlencoding::decode(segment) {
        Ok(decoded) => decoded.into_owned(),
        Err(e) => {
            warn!("Settings segment is not valid UTF-8: {e}");
            return UserSettings::default();
        }
    };

    UserSettings::decode(&decoded).unwrap_or_else(|e| {
        warn!("Falling back to default settings: {e}");
        UserSettings::default()
    })
}
