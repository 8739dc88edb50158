//! Response shapes of the IMDb GraphQL API and their mapping into
//! [`RawTitle`]. Every field is optional upstream.

use serde::Deserialize;

use crate::episodes::{EpisodeRecord, PageInfo, PagedConnection, UNKNOWN_SEASON};
use crate::title::{PartialDate, PrincipalCredits, RawTitle, ReleaseYear};

#[derive(Debug, Deserialize)]
pub(crate) struct GraphQlResponse<T> {
    pub data: Option<T>,
    pub errors: Option<Vec<GraphQlError>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GraphQlError {
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TitleData {
    pub title: Option<TitleNode>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TitlesData {
    pub titles: Option<Vec<Option<TitleNode>>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct MainSearchData {
    pub main_search: Option<Edges<SearchNode>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SearchNode {
    pub entity: TitleNode,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AdvancedSearchData {
    pub advanced_title_search: Option<Edges<AdvancedSearchNode>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AdvancedSearchNode {
    pub title: TitleNode,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Edges<N> {
    pub edges: Option<Vec<Option<Edge<N>>>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Edge<N> {
    pub node: N,
}

impl<N> Edges<N> {
    pub fn into_nodes(self) -> impl Iterator<Item = N> {
        self.edges.into_iter().flatten().flatten().map(|edge| edge.node)
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct Text {
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Markdown {
    pub plain_text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TitleNode {
    #[serde(rename = "__typename")]
    pub typename: Option<String>,
    pub id: Option<String>,
    pub title_text: Option<Text>,
    pub title_type: Option<TitleType>,
    pub release_year: Option<YearRange>,
    pub release_date: Option<DateParts>,
    pub plot: Option<Plot>,
    pub ratings_summary: Option<RatingsSummary>,
    pub primary_image: Option<Image>,
    pub runtime: Option<Runtime>,
    pub title_genres: Option<TitleGenres>,
    pub principal_credits: Option<Vec<Option<CreditGroup>>>,
    pub episodes: Option<Episodes>,
    pub connections: Option<Edges<ConnectionNode>>,
}

impl TitleNode {
    /// Search results may contain people and companies as well as titles.
    pub fn is_title(&self) -> bool {
        self.typename.as_deref().is_none_or(|name| name == "Title")
    }

    pub fn into_episode_page(self) -> Option<PagedConnection<EpisodeRecord>> {
        self.episodes?.episodes.map(EpisodeConnection::into_connection)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TitleType {
    pub can_have_episodes: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct YearRange {
    pub year: Option<i32>,
    pub end_year: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DateParts {
    pub year: Option<i32>,
    pub month: Option<u32>,
    pub day: Option<u32>,
}

impl DateParts {
    fn into_partial(self) -> Option<PartialDate> {
        Some(PartialDate {
            year: self.year?,
            month: self.month,
            day: self.day,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Plot {
    pub plot_text: Option<Markdown>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RatingsSummary {
    pub aggregate_rating: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Image {
    pub url: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Runtime {
    pub displayable_property: Option<DisplayableProperty>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DisplayableProperty {
    pub value: Option<Markdown>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TitleGenres {
    pub genres: Option<Vec<Option<GenreItem>>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GenreItem {
    pub genre: Option<Text>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CreditGroup {
    pub category: Option<CategoryId>,
    pub credits: Option<Vec<Option<Credit>>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CategoryId {
    pub id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Credit {
    pub name: Option<CreditName>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreditName {
    pub name_text: Option<Text>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Episodes {
    pub episodes: Option<EpisodeConnection>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct EpisodeConnection {
    pub edges: Option<Vec<Option<Edge<EpisodeNode>>>>,
    pub page_info: Option<WirePageInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WirePageInfo {
    pub has_next_page: Option<bool>,
    pub end_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct EpisodeNode {
    pub id: Option<String>,
    pub series: Option<EpisodeSeries>,
    pub title_text: Option<Text>,
    pub plot: Option<Plot>,
    pub release_date: Option<DateParts>,
    pub primary_image: Option<Image>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct EpisodeSeries {
    pub displayable_episode_number: Option<DisplayableEpisodeNumber>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct DisplayableEpisodeNumber {
    pub displayable_season: Option<Text>,
    pub episode_number: Option<Text>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ConnectionNode {
    pub associated_title: Option<AssociatedTitle>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AssociatedTitle {
    pub id: Option<String>,
    pub connections: Option<Edges<ConnectionNode>>,
}

fn plain_text(plot: Option<Plot>) -> Option<String> {
    plot?.plot_text?.plain_text
}

fn first_connection(connections: Option<Edges<ConnectionNode>>) -> Option<AssociatedTitle> {
    connections?
        .into_nodes()
        .find_map(|node| node.associated_title)
}

/// Deepest of up to two "follows" hops.
fn connection_id(connections: Option<Edges<ConnectionNode>>) -> Option<String> {
    let first = first_connection(connections)?;
    let first_id = first.id;
    first_connection(first.connections)
        .and_then(|second| second.id)
        .or(first_id)
}

impl EpisodeConnection {
    pub fn into_connection(self) -> PagedConnection<EpisodeRecord> {
        let page_info = self
            .page_info
            .map(|info| PageInfo {
                has_next_page: info.has_next_page.unwrap_or(false),
                end_cursor: info.end_cursor,
            })
            .unwrap_or_default();

        let items = self
            .edges
            .into_iter()
            .flatten()
            .flatten()
            .filter_map(|edge| edge.node.into_record())
            .collect();

        PagedConnection::new(items, page_info)
    }
}

impl EpisodeNode {
    /// Episodes without an id or a displayable season/number are dropped.
    /// Unclassified episodes may lack a number; the normalizer assigns one.
    fn into_record(self) -> Option<EpisodeRecord> {
        let numbering = self.series?.displayable_episode_number?;
        let season = numbering.displayable_season?.text?;
        let episode = match numbering.episode_number.and_then(|n| n.text) {
            Some(episode) => episode,
            None if season == UNKNOWN_SEASON => String::new(),
            None => return None,
        };

        Some(EpisodeRecord {
            id: self.id?,
            season,
            episode,
            title: self.title_text.and_then(|t| t.text),
            overview: plain_text(self.plot),
            released: self.release_date.and_then(DateParts::into_partial),
            thumbnail: self.primary_image.and_then(|i| i.url),
        })
    }
}

impl From<TitleNode> for RawTitle {
    fn from(node: TitleNode) -> Self {
        let genres = node
            .title_genres
            .and_then(|g| g.genres)
            .into_iter()
            .flatten()
            .flatten()
            .filter_map(|item| item.genre?.text)
            .collect();

        let credits = node
            .principal_credits
            .into_iter()
            .flatten()
            .flatten()
            .filter_map(|group| {
                let category = group.category?.id?;
                let names = group
                    .credits
                    .into_iter()
                    .flatten()
                    .flatten()
                    .filter_map(|credit| credit.name?.name_text?.text)
                    .collect();
                Some(PrincipalCredits { category, names })
            })
            .collect();

        RawTitle {
            id: node.id,
            name: node.title_text.and_then(|t| t.text),
            can_have_episodes: node
                .title_type
                .and_then(|t| t.can_have_episodes)
                .unwrap_or(false),
            release_year: node
                .release_year
                .map(|y| ReleaseYear {
                    start: y.year,
                    end: y.end_year,
                })
                .unwrap_or_default(),
            release_date: node.release_date.and_then(DateParts::into_partial),
            plot: plain_text(node.plot),
            rating: node.ratings_summary.and_then(|r| r.aggregate_rating),
            poster: node.primary_image.and_then(|i| i.url),
            runtime: node
                .runtime
                .and_then(|r| r.displayable_property?.value?.plain_text),
            genres,
            credits,
            episodes: node
                .episodes
                .and_then(|e| e.episodes)
                .map(EpisodeConnection::into_connection),
            connection_id: connection_id(node.connections),
        }
    }
}
