//! GraphQL documents sent to the IMDb API.

/// Shared selection for episode connections. Appended to every document that
/// spreads `...EpisodesConnection`.
pub const EPISODES_CONNECTION_FRAGMENT: &str = r#"
fragment EpisodesConnection on EpisodeConnection {
  edges {
    node {
      id
      series {
        displayableEpisodeNumber {
          displayableSeason { text }
          episodeNumber { text }
        }
      }
      titleText { text }
      plot { plotText { plainText } }
      releaseDate { year month day }
      primaryImage { url }
    }
  }
  pageInfo { hasNextPage endCursor }
}
"#;

const FOLLOWS_CONNECTION: &str = r#"
connections(first: 1, filter: { categories: ["follows"] }) {
  edges {
    node {
      associatedTitle {
        id
        connections(first: 1, filter: { categories: ["follows"] }) {
          edges { node { associatedTitle { id } } }
        }
      }
    }
  }
}
"#;

const TITLE_FULL: &str = r#"
query Title($id: ID!) {
  title(id: $id) {
    id
    titleText { text }
    releaseYear { year endYear }
    releaseDate { year month day }
    titleType { canHaveEpisodes }
    plot { plotText { plainText } }
    ratingsSummary { aggregateRating }
    primaryImage { url }
    runtime { displayableProperty { value { plainText } } }
    titleGenres { genres { genre { text } } }
    principalCredits {
      category { id }
      credits { name { id nameText { text } } }
    }
    episodes {
      episodes(first: 250, sort: { by: EPISODE_THEN_RELEASE, order: ASC }) {
        ...EpisodesConnection
      }
    }
    __CONNECTIONS__
  }
}
"#;

const MORE_EPISODES: &str = r#"
query GetMoreEpisodes($id: ID!, $after: ID!) {
  title(id: $id) {
    episodes {
      episodes(sort: { by: EPISODE_THEN_RELEASE, order: ASC }, first: 250, after: $after) {
        ...EpisodesConnection
      }
    }
  }
}
"#;

const TITLES: &str = r#"
query Titles($ids: [ID!]!, $episodeCount: Int) {
  titles(ids: $ids) {
    id
    titleText { text }
    titleType { canHaveEpisodes }
    plot { plotText { plainText } }
    primaryImage { url }
    episodes {
      episodes(last: $episodeCount, filter: { excludeSeasons: ["unknown"] }) {
        ...EpisodesConnection
      }
    }
  }
}
"#;

const MAIN_SEARCH: &str = r#"
query MainSearch($search: MainSearchOptions!) {
  mainSearch(first: 20, options: $search) {
    edges {
      node {
        entity {
          __typename
          ... on Title {
            id
            titleText { text }
            titleType { canHaveEpisodes }
            primaryImage { url }
            __CONNECTIONS__
          }
        }
      }
    }
  }
}
"#;

const ADVANCED_TITLE_SEARCH: &str = r#"
query AdvancedTitleSearch(
  $search: AdvancedTitleSearchConstraints!
  $sort: AdvancedTitleSearchSort!
  $first: Int!
  $jumpToPosition: Int
) {
  advancedTitleSearch(
    constraints: $search
    sort: $sort
    first: $first
    jumpToPosition: $jumpToPosition
  ) {
    edges {
      node {
        title {
          id
          titleText { text }
          titleType { canHaveEpisodes }
          releaseYear { year endYear }
          plot { plotText { plainText } }
          ratingsSummary { aggregateRating }
          primaryImage { url }
          runtime { displayableProperty { value { plainText } } }
          titleGenres { genres { genre { text } } }
          principalCredits {
            category { id }
            credits { name { id nameText { text } } }
          }
          __CONNECTIONS__
        }
      }
    }
  }
}
"#;

fn with_connections(document: &str) -> String {
    document.replace("__CONNECTIONS__", FOLLOWS_CONNECTION)
}

fn with_episodes_fragment(document: &str) -> String {
    format!("{document}{EPISODES_CONNECTION_FRAGMENT}")
}

pub fn title_full() -> String {
    with_episodes_fragment(&with_connections(TITLE_FULL))
}

pub fn more_episodes() -> String {
    with_episodes_fragment(MORE_EPISODES)
}

pub fn titles() -> String {
    with_episodes_fragment(TITLES)
}

pub fn main_search() -> String {
    with_connections(MAIN_SEARCH)
}

pub fn advanced_title_search() -> String {
    with_connections(ADVANCED_TITLE_SEARCH)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn documents_are_fully_expanded() {
        for document in [
            title_full(),
            more_episodes(),
            titles(),
            main_search(),
            advanced_title_search(),
        ] {
            assert!(!document.contains("__CONNECTIONS__"));
            assert_eq!(
                document.contains("...EpisodesConnection"),
                document.contains("fragment EpisodesConnection"),
            );
        }
    }
}
