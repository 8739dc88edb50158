//! Addon manifest.

use chrono::{Datelike, Utc};
use serde::{Deserialize, Serialize};

use crate::catalog::{ALL_GENRES, CatalogId};
use crate::settings::UserSettings;
use crate::title::ContentType;

pub const ADDON_ID: &str = "dev.thea.cinebetter";
pub const ADDON_VERSION: &str = "1.0.0";
pub const ADDON_NAME: &str = "Cinebetter";
pub const ADDON_DESCRIPTION: &str = "IMDb metadata in Stremio";

/// First year offered by the "New" catalog.
pub const FIRST_RELEASE_YEAR: i32 = 1874;

const BULK_OPTIONS_LIMIT: u32 = 100;

pub const IMDB_GENRES: [&str; 27] = [
    "Action",
    "Adventure",
    "Animation",
    "Biography",
    "Comedy",
    "Crime",
    "Documentary",
    "Drama",
    "Family",
    "Fantasy",
    "Film-Noir",
    "Game-Show",
    "History",
    "Horror",
    "Music",
    "Musical",
    "Mystery",
    "News",
    "Reality-TV",
    "Romance",
    "Sci-Fi",
    "Short",
    "Sport",
    "Talk-Show",
    "Thriller",
    "War",
    "Western",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub id: String,
    pub version: String,
    pub name: String,
    pub description: String,
    pub catalogs: Vec<ManifestCatalog>,
    pub resources: Vec<String>,
    pub types: Vec<ContentType>,
    pub id_prefixes: Vec<String>,
    pub behavior_hints: ManifestBehaviorHints,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestCatalog {
    #[serde(rename = "type")]
    pub content_type: ContentType,
    pub id: String,
    pub name: String,
    pub extra: Vec<ExtraProperty>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtraProperty {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options_limit: Option<u32>,
}

impl ExtraProperty {
    fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            options: None,
            is_required: false,
            options_limit: None,
        }
    }

    fn required(mut self) -> Self {
        self.is_required = true;
        self
    }

    fn with_options(mut self, options: Vec<String>) -> Self {
        self.options = Some(options);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestBehaviorHints {
    pub configurable: bool,
    pub configuration_required: bool,
}

/// Builds the manifest for `settings`, listing years up to `current_year`.
///
/// With `discover_only` the genre filters gain an `All` option and become
/// required, which hides the catalogs from the board.
pub fn build_manifest_for_year(settings: &UserSettings, current_year: i32) -> Manifest {
    let genre_options = || {
        let genres = IMDB_GENRES.iter().map(|g| g.to_string());
        if settings.discover_only {
            std::iter::once(ALL_GENRES.to_string()).chain(genres).collect()
        } else {
            genres.collect()
        }
    };
    let genre_filter = || {
        let extra = ExtraProperty::named("genre").with_options(genre_options());
        if settings.discover_only {
            extra.required()
        } else {
            extra
        }
    };
    let years: Vec<String> = (FIRST_RELEASE_YEAR..=current_year)
        .rev()
        .map(|year| year.to_string())
        .collect();

    let mut catalogs = Vec::new();
    for content_type in [ContentType::Movie, ContentType::Series] {
        let catalog = |id: CatalogId, name: &str, extra: Vec<ExtraProperty>| ManifestCatalog {
            content_type,
            id: id.as_str().to_string(),
            name: name.to_string(),
            extra,
        };

        catalogs.push(catalog(
            CatalogId::Search,
            "Search",
            vec![ExtraProperty::named("search").required()],
        ));
        catalogs.push(catalog(
            CatalogId::Popular,
            "Popular",
            vec![genre_filter(), ExtraProperty::named("skip")],
        ));
        catalogs.push(catalog(
            CatalogId::New,
            "New",
            vec![
                ExtraProperty::named("genre")
                    .with_options(years.clone())
                    .required(),
                ExtraProperty::named("skip"),
            ],
        ));
        catalogs.push(catalog(
            CatalogId::Featured,
            "Featured",
            vec![genre_filter(), ExtraProperty::named("skip")],
        ));
    }

    for (id, name, extra) in [
        (CatalogId::Calendar, "Calendar", "calendarVideosIds"),
        (CatalogId::Notifications, "Notifications", "lastVideosIds"),
    ] {
        catalogs.push(ManifestCatalog {
            content_type: ContentType::Series,
            id: id.as_str().to_string(),
            name: name.to_string(),
            extra: vec![ExtraProperty {
                options_limit: Some(BULK_OPTIONS_LIMIT),
                ..ExtraProperty::named(extra).required()
            }],
        });
    }

    Manifest {
        id: ADDON_ID.to_string(),
        version: ADDON_VERSION.to_string(),
        name: ADDON_NAME.to_string(),
        description: ADDON_DESCRIPTION.to_string(),
        catalogs,
        resources: vec!["catalog".to_string(), "meta".to_string()],
        types: vec![ContentType::Movie, ContentType::Series],
        id_prefixes: vec!["tt".to_string()],
        behavior_hints: ManifestBehaviorHints {
            configurable: true,
            configuration_required: false,
        },
    }
}

pub fn build_manifest(settings: &UserSettings) -> Manifest {
    build_manifest_for_year(settings, Utc::now().year())
}

/// Manifest URL for `settings` under `base_url`. Default settings have no
/// configuration segment.
pub fn transport_url(base_url: &str, settings: &UserSettings) -> String {
    let base = base_url.trim_end_matches('/');
    let token = settings.encode();
    if token.is_empty() {
        format!("{base}/manifest.json")
    } else {
        format!("{base}/{token}/manifest.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn find<'a>(manifest: &'a Manifest, content_type: ContentType, id: CatalogId) -> &'a ManifestCatalog {
        manifest
            .catalogs
            .iter()
            .find(|c| c.content_type == content_type && c.id == id.as_str())
            .unwrap()
    }

    #[test]
    fn lists_catalogs_per_type() {
        let manifest = build_manifest_for_year(&UserSettings::default(), 2025);

        assert_eq!(manifest.catalogs.len(), 10);
        assert!(manifest
            .catalogs
            .iter()
            .filter(|c| c.id == "calendar" || c.id == "notifications")
            .all(|c| c.content_type == ContentType::Series));

        let popular = find(&manifest, ContentType::Movie, CatalogId::Popular);
        assert!(!popular.extra[0].is_required);
        assert_eq!(popular.extra[0].options.as_ref().unwrap()[0], "Action");

        let new = find(&manifest, ContentType::Series, CatalogId::New);
        let years = new.extra[0].options.as_ref().unwrap();
        assert_eq!(years.first().map(String::as_str), Some("2025"));
        assert_eq!(years.last().map(String::as_str), Some("1874"));
    }

    #[test]
    fn discover_only_requires_genre() {
        let settings = UserSettings {
            discover_only: true,
            ..UserSettings::default()
        };
        let manifest = build_manifest_for_year(&settings, 2025);

        let featured = find(&manifest, ContentType::Series, CatalogId::Featured);
        assert!(featured.extra[0].is_required);
        assert_eq!(featured.extra[0].options.as_ref().unwrap()[0], "All");
    }

    #[test]
    fn serializes_wire_shape() {
        let json = serde_json::to_value(build_manifest_for_year(&UserSettings::default(), 2025)).unwrap();

        assert_eq!(json["idPrefixes"], serde_json::json!(["tt"]));
        assert_eq!(json["behaviorHints"]["configurable"], true);
        assert_eq!(json["catalogs"][0]["type"], "movie");
        assert_eq!(json["catalogs"][0]["extra"][0]["isRequired"], true);
        assert!(json["catalogs"][1]["extra"][1].get("isRequired").is_none());
        assert_eq!(json["catalogs"][9]["extra"][0]["optionsLimit"], 100);
    }

    #[test]
    fn transport_url_carries_settings() {
        assert_eq!(
            transport_url("https://addon.example/", &UserSettings::default()),
            "https://addon.example/manifest.json"
        );

        let settings = UserSettings {
            hide_low_quality: true,
            ..UserSettings::default()
        };
        assert_eq!(
            transport_url("https://addon.example", &settings),
            "https://addon.example/h=1/manifest.json"
        );
    }
}
