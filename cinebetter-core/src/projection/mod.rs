//! Projection of raw upstream titles into published meta items.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::catalog::CatalogId;
use crate::episodes::EpisodeRecord;
use crate::identity::TitleMatch;
use crate::title::{ContentType, PartialDate, RawTitle, ReleaseYear};

const METAHUB_BASE: &str = "https://images.metahub.space";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetaItem {
    pub id: String,
    #[serde(rename = "type")]
    pub content_type: ContentType,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub poster: Option<String>,
    pub background: String,
    pub logo: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub release_info: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub runtime: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub released: Option<String>,
    pub poster_shape: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub imdb_rating: Option<String>,
    pub links: Vec<Link>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub videos: Option<Vec<Video>>,
    pub behavior_hints: BehaviorHints,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub name: String,
    pub category: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Video {
    pub id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub released: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overview: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    pub season: u32,
    pub episode: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BehaviorHints {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_video_id: Option<String>,
    pub has_scheduled_videos: bool,
}

#[derive(Debug, Clone)]
pub struct ProjectionOptions {
    /// Manifest URL of this addon for the caller's settings.
    pub transport_url: String,
    pub now: DateTime<Utc>,
}

/// Maps a raw title to its published shape.
///
/// Returns `None` when the title has no id or name, or when
/// `filter_no_match` is set and resolution found nothing.
pub fn project(
    title: &RawTitle,
    matched: Option<&TitleMatch>,
    filter_no_match: bool,
    options: &ProjectionOptions,
) -> Option<MetaItem> {
    let id = title.id.as_deref()?;
    let name = title.name.as_deref()?;

    if filter_no_match && matched.is_some_and(TitleMatch::is_empty) {
        return None;
    }

    let content_type = ContentType::from_episodic(title.can_have_episodes);
    let image_id = matched
        .and_then(|m| m.used_connection.as_deref())
        .unwrap_or(id);

    let videos = title
        .can_have_episodes
        .then(|| title.episodes.as_ref())
        .flatten()
        .map(|episodes| {
            episodes
                .items
                .iter()
                .filter_map(|record| build_video(id, record))
                .collect::<Vec<_>>()
        });

    let has_scheduled_videos = videos.iter().flatten().any(|video| {
        video
            .released
            .as_deref()
            .and_then(|released| DateTime::parse_from_rfc3339(released).ok())
            .is_some_and(|released| released > options.now)
    });

    Some(MetaItem {
        id: id.to_string(),
        content_type,
        name: name.to_string(),
        poster: title.poster.clone(),
        background: format!("{METAHUB_BASE}/background/large/{image_id}/img"),
        logo: format!("{METAHUB_BASE}/logo/large/{image_id}/img"),
        description: title.plot.clone(),
        release_info: release_info(content_type, title.release_year),
        runtime: title.runtime.clone(),
        released: title.release_date.and_then(iso_date),
        poster_shape: "poster".to_string(),
        imdb_rating: title.rating.map(|rating| rating.to_string()),
        links: build_links(title, id, name, content_type, &options.transport_url),
        videos,
        behavior_hints: BehaviorHints {
            default_video_id: (!title.can_have_episodes).then(|| id.to_string()),
            has_scheduled_videos,
        },
    })
}

fn iso_date(date: PartialDate) -> Option<String> {
    date.to_utc()
        .map(|date| date.to_rfc3339_opts(SecondsFormat::Millis, true))
}

/// `2008` for movies and single-year runs, `2008-2013` or `2008-` otherwise.
pub fn release_info(content_type: ContentType, years: ReleaseYear) -> Option<String> {
    let start = years.start?;

    if years.end == Some(start) || content_type == ContentType::Movie {
        return Some(start.to_string());
    }

    Some(match years.end {
        Some(end) => format!("{start}-{end}"),
        None => format!("{start}-"),
    })
}

/// True for series still airing (`2019-`).
pub fn is_ongoing(release_info: Option<&str>) -> bool {
    release_info
        .and_then(|info| info.strip_suffix('-'))
        .is_some_and(|year| year.chars().all(|c| c.is_ascii_digit()))
}

fn build_video(title_id: &str, record: &EpisodeRecord) -> Option<Video> {
    let title = record.title.clone()?;
    let season: u32 = record.season.trim().parse().ok()?;
    let episode: u32 = record.episode.trim().parse().ok()?;

    Some(Video {
        id: format!("{title_id}:{season}:{episode}"),
        title,
        released: record.released.and_then(iso_date),
        overview: record.overview.clone(),
        thumbnail: record.thumbnail.clone(),
        season,
        episode,
    })
}

fn credit_category(category: &str) -> Option<&'static str> {
    match category {
        "cast" => Some("Cast"),
        "director" => Some("Directors"),
        "writer" => Some("Writers"),
        _ => None,
    }
}

fn build_links(
    title: &RawTitle,
    id: &str,
    name: &str,
    content_type: ContentType,
    transport_url: &str,
) -> Vec<Link> {
    let mut links = Vec::new();

    if let Some(rating) = title.rating {
        links.push(Link {
            name: rating.to_string(),
            category: "imdb".to_string(),
            url: format!("https://imdb.com/title/{id}"),
        });
    }

    links.push(Link {
        name: name.to_string(),
        category: "share".to_string(),
        url: format!(
            "https://www.strem.io/s/{content_type}/{}",
            id.strip_prefix("tt").unwrap_or(id)
        ),
    });

    let transport = urlencoding::encode(transport_url);
    links.extend(title.genres.iter().map(|genre| Link {
        name: genre.clone(),
        category: "Genres".to_string(),
        url: format!(
            "stremio:///discover/{transport}/{content_type}/{}?genre={}",
            CatalogId::Popular.as_str(),
            urlencoding::encode(genre)
        ),
    }));

    links.extend(title.credits.iter().flat_map(|group| {
        credit_category(&group.category)
            .into_iter()
            .flat_map(move |category| {
                group.names.iter().map(move |person| Link {
                    name: person.clone(),
                    category: category.to_string(),
                    url: format!("stremio:///search?search={}", urlencoding::encode(person)),
                })
            })
    }));

    links
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::episodes::{PageInfo, PagedConnection};
    use crate::identity::TmdbMatch;
    use crate::title::PrincipalCredits;

    fn options() -> ProjectionOptions {
        ProjectionOptions {
            transport_url: "https://cinebetter.example/manifest.json".to_string(),
            now: Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap(),
        }
    }

    fn movie() -> RawTitle {
        RawTitle {
            id: Some("tt0111161".to_string()),
            name: Some("The Shawshank Redemption".to_string()),
            release_year: ReleaseYear {
                start: Some(1994),
                end: None,
            },
            release_date: Some(PartialDate {
                year: 1994,
                month: Some(9),
                day: Some(23),
            }),
            rating: Some(9.3),
            genres: vec!["Drama".to_string()],
            credits: vec![
                PrincipalCredits {
                    category: "director".to_string(),
                    names: vec!["Frank Darabont".to_string()],
                },
                PrincipalCredits {
                    category: "producer".to_string(),
                    names: vec!["Niki Marvin".to_string()],
                },
            ],
            ..RawTitle::default()
        }
    }

    fn episode(season: &str, number: &str, released: Option<PartialDate>) -> EpisodeRecord {
        EpisodeRecord {
            id: format!("tt-ep-{season}-{number}"),
            season: season.to_string(),
            episode: number.to_string(),
            title: Some(format!("S{season}E{number}")),
            overview: None,
            released,
            thumbnail: None,
        }
    }

    fn series() -> RawTitle {
        RawTitle {
            id: Some("tt0903747".to_string()),
            name: Some("Breaking Bad".to_string()),
            can_have_episodes: true,
            release_year: ReleaseYear {
                start: Some(2008),
                end: Some(2013),
            },
            episodes: Some(PagedConnection::new(
                vec![
                    episode("1", "1", Some(PartialDate::year(2008))),
                    episode("0", "1", None),
                    episode("?", "x", None),
                    episode("6", "1", Some(PartialDate::year(2030))),
                ],
                PageInfo::last(),
            )),
            ..RawTitle::default()
        }
    }

    #[test]
    fn requires_id_and_name() {
        let mut title = movie();
        title.name = None;
        assert!(project(&title, None, false, &options()).is_none());

        let mut title = movie();
        title.id = None;
        assert!(project(&title, None, false, &options()).is_none());
    }

    #[test]
    fn projects_movie() {
        let meta = project(&movie(), None, false, &options()).unwrap();

        assert_eq!(meta.content_type, ContentType::Movie);
        assert_eq!(meta.release_info.as_deref(), Some("1994"));
        assert_eq!(meta.released.as_deref(), Some("1994-09-23T00:00:00.000Z"));
        assert_eq!(meta.imdb_rating.as_deref(), Some("9.3"));
        assert_eq!(meta.behavior_hints.default_video_id.as_deref(), Some("tt0111161"));
        assert!(meta.videos.is_none());
        assert_eq!(
            meta.background,
            "https://images.metahub.space/background/large/tt0111161/img"
        );

        let categories: Vec<_> = meta.links.iter().map(|l| l.category.as_str()).collect();
        assert_eq!(categories, ["imdb", "share", "Genres", "Directors"]);
        assert_eq!(meta.links[1].url, "https://www.strem.io/s/movie/0111161");
        assert_eq!(
            meta.links[2].url,
            "stremio:///discover/https%3A%2F%2Fcinebetter.example%2Fmanifest.json/movie/top?genre=Drama"
        );
        assert_eq!(meta.links[3].url, "stremio:///search?search=Frank%20Darabont");
    }

    #[test]
    fn projects_series_videos() {
        let meta = project(&series(), None, false, &options()).unwrap();

        assert_eq!(meta.content_type, ContentType::Series);
        assert_eq!(meta.release_info.as_deref(), Some("2008-2013"));
        assert!(meta.behavior_hints.default_video_id.is_none());
        assert!(meta.behavior_hints.has_scheduled_videos);

        let ids: Vec<_> = meta.videos.unwrap().into_iter().map(|v| v.id).collect();
        assert_eq!(ids, ["tt0903747:1:1", "tt0903747:0:1", "tt0903747:6:1"]);
    }

    #[test]
    fn connection_match_drives_images() {
        let matched = TitleMatch {
            matched: TmdbMatch {
                movie: Some(1),
                series: None,
            },
            used_connection: Some("tt0000001".to_string()),
        };
        let meta = project(&movie(), Some(&matched), true, &options()).unwrap();

        assert_eq!(meta.logo, "https://images.metahub.space/logo/large/tt0000001/img");
    }

    #[test]
    fn filter_drops_unmatched_titles() {
        let unmatched = TitleMatch {
            matched: TmdbMatch::default(),
            used_connection: None,
        };

        assert!(project(&movie(), Some(&unmatched), true, &options()).is_none());
        assert!(project(&movie(), Some(&unmatched), false, &options()).is_some());
        assert!(project(&movie(), None, true, &options()).is_some());
    }

    #[test]
    fn release_info_forms() {
        let years = |start, end| ReleaseYear { start, end };

        assert_eq!(release_info(ContentType::Series, years(Some(2019), None)).as_deref(), Some("2019-"));
        assert_eq!(release_info(ContentType::Series, years(Some(2019), Some(2019))).as_deref(), Some("2019"));
        assert_eq!(release_info(ContentType::Movie, years(Some(2019), Some(2021))).as_deref(), Some("2019"));
        assert_eq!(release_info(ContentType::Movie, years(None, Some(2021))), None);

        assert!(is_ongoing(Some("2019-")));
        assert!(!is_ongoing(Some("2008-2013")));
        assert!(!is_ongoing(None));
    }
}
