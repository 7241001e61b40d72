use std::cmp::Ordering;
use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::models::Movie;

/// Artifact schema version this build understands
pub const CATALOG_SCHEMA_VERSION: u32 = 1;

/// Maximum number of results returned by a title search
const MAX_SEARCH_RESULTS: usize = 50;

/// Browsing categories exposed by the catalog listing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Popular,
    TopRated,
    Upcoming,
}

impl Category {
    /// Parses the query-string form of a category
    pub fn parse(s: &str) -> AppResult<Self> {
        match s {
            "popular" => Ok(Category::Popular),
            "top_rated" => Ok(Category::TopRated),
            "upcoming" => Ok(Category::Upcoming),
            other => Err(AppError::Validation(format!(
                "Unknown category: {}",
                other
            ))),
        }
    }
}

/// On-disk catalog artifact produced by the offline build
#[derive(Debug, Deserialize)]
struct CatalogArtifact {
    schema_version: u32,
    movies: Vec<Movie>,
}

/// Read-only movie catalog, loaded once at startup.
///
/// All orderings are precomputed so pagination is stable across calls: each
/// category ranking breaks ties by ascending movie id.
pub struct CatalogStore {
    movies: Vec<Movie>,
    by_id: HashMap<i64, usize>,
    by_popularity: Vec<usize>,
    by_rating: Vec<usize>,
    by_recency: Vec<usize>,
}

impl CatalogStore {
    /// Loads the catalog artifact from disk, refusing incompatible versions
    pub fn load(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            AppError::Artifact(format!("Cannot read catalog {}: {}", path.display(), e))
        })?;

        let artifact: CatalogArtifact = serde_json::from_str(&raw).map_err(|e| {
            AppError::Artifact(format!("Malformed catalog {}: {}", path.display(), e))
        })?;

        if artifact.schema_version != CATALOG_SCHEMA_VERSION {
            return Err(AppError::Artifact(format!(
                "Catalog schema version {} is not supported (expected {})",
                artifact.schema_version, CATALOG_SCHEMA_VERSION
            )));
        }

        let store = Self::from_movies(artifact.movies)?;
        tracing::info!(movie_count = store.len(), path = %path.display(), "Catalog loaded");
        Ok(store)
    }

    /// Builds a catalog directly from movie records (fixtures, tests)
    pub fn from_movies(movies: Vec<Movie>) -> AppResult<Self> {
        let mut by_id = HashMap::with_capacity(movies.len());
        for (idx, movie) in movies.iter().enumerate() {
            if by_id.insert(movie.id, idx).is_some() {
                return Err(AppError::Artifact(format!(
                    "Duplicate movie id {} in catalog",
                    movie.id
                )));
            }
        }

        let by_popularity = ranked(&movies, |m| m.popularity);
        let by_rating = ranked(&movies, |m| m.vote_average);

        let mut by_recency: Vec<usize> = (0..movies.len()).collect();
        by_recency.sort_by(|&a, &b| {
            movies[b]
                .release_date
                .cmp(&movies[a].release_date)
                .then_with(|| movies[a].id.cmp(&movies[b].id))
        });

        Ok(Self {
            movies,
            by_id,
            by_popularity,
            by_rating,
            by_recency,
        })
    }

    pub fn len(&self) -> usize {
        self.movies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.movies.is_empty()
    }

    pub fn contains(&self, id: i64) -> bool {
        self.by_id.contains_key(&id)
    }

    /// Fetches a single movie by its catalog identifier
    pub fn get(&self, id: i64) -> Option<&Movie> {
        self.by_id.get(&id).map(|&idx| &self.movies[idx])
    }

    /// Returns one page of the ranked listing for a category plus the total count
    pub fn list(&self, category: Category, limit: usize, offset: usize) -> (Vec<&Movie>, usize) {
        let ranking = match category {
            Category::Popular => &self.by_popularity,
            Category::TopRated => &self.by_rating,
            Category::Upcoming => &self.by_recency,
        };

        let page = ranking
            .iter()
            .skip(offset)
            .take(limit)
            .map(|&idx| &self.movies[idx])
            .collect();

        (page, self.movies.len())
    }

    /// Case-insensitive prefix search over titles.
    ///
    /// An empty (or whitespace-only) query returns nothing rather than the full
    /// catalog. Exact title matches sort ahead of prefix matches, then shorter
    /// titles ahead of longer ones, then by id.
    pub fn search_title(&self, query: &str) -> Vec<&Movie> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }

        let mut hits: Vec<&Movie> = self
            .movies
            .iter()
            .filter(|m| m.title.to_lowercase().starts_with(&needle))
            .collect();

        hits.sort_by(|a, b| {
            let a_exact = a.title.to_lowercase() == needle;
            let b_exact = b.title.to_lowercase() == needle;
            b_exact
                .cmp(&a_exact)
                .then_with(|| a.title.len().cmp(&b.title.len()))
                .then_with(|| a.id.cmp(&b.id))
        });

        hits.truncate(MAX_SEARCH_RESULTS);
        hits
    }
}

/// Produces an index ranking by a float key, descending, ties by id ascending
fn ranked(movies: &[Movie], key: impl Fn(&Movie) -> f64) -> Vec<usize> {
    let mut order: Vec<usize> = (0..movies.len()).collect();
    order.sort_by(|&a, &b| {
        key(&movies[b])
            .partial_cmp(&key(&movies[a]))
            .unwrap_or(Ordering::Equal)
            .then_with(|| movies[a].id.cmp(&movies[b].id))
    });
    order
}

#[cfg(test)]
mod tests {
    use super::*;

    fn movie(id: i64, title: &str, vote_average: f64, popularity: f64) -> Movie {
        Movie {
            id,
            title: title.to_string(),
            overview: String::new(),
            genres: Vec::new(),
            release_date: None,
            runtime: None,
            vote_average,
            popularity,
            poster_path: None,
            backdrop_path: None,
        }
    }

    fn fixture() -> CatalogStore {
        CatalogStore::from_movies(vec![
            movie(1, "Alpha", 7.0, 50.0),
            movie(2, "Beta", 9.0, 10.0),
            movie(3, "Gamma", 8.0, 90.0),
            movie(4, "Alpha Dog", 6.0, 5.0),
        ])
        .unwrap()
    }

    #[test]
    fn test_list_popular_orders_by_popularity() {
        let catalog = fixture();
        let (page, total) = catalog.list(Category::Popular, 20, 0);
        assert_eq!(total, 4);
        let ids: Vec<i64> = page.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![3, 1, 2, 4]);
    }

    #[test]
    fn test_list_top_rated_orders_by_vote_average() {
        let catalog = fixture();
        let (page, _) = catalog.list(Category::TopRated, 2, 0);
        let ids: Vec<i64> = page.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![2, 3]);
    }

    #[test]
    fn test_list_pagination_is_stable() {
        let catalog = fixture();
        let (first, _) = catalog.list(Category::Popular, 2, 0);
        let (second, _) = catalog.list(Category::Popular, 2, 2);
        let ids: Vec<i64> = first.iter().chain(second.iter()).map(|m| m.id).collect();
        assert_eq!(ids, vec![3, 1, 2, 4]);
    }

    #[test]
    fn test_list_ties_break_by_id() {
        let catalog = CatalogStore::from_movies(vec![
            movie(9, "Nine", 5.0, 1.0),
            movie(2, "Two", 5.0, 1.0),
            movie(5, "Five", 5.0, 1.0),
        ])
        .unwrap();
        let (page, _) = catalog.list(Category::Popular, 10, 0);
        let ids: Vec<i64> = page.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![2, 5, 9]);
    }

    #[test]
    fn test_get_unknown_id_is_none() {
        let catalog = fixture();
        assert!(catalog.get(999).is_none());
        assert_eq!(catalog.get(2).unwrap().title, "Beta");
    }

    #[test]
    fn test_search_empty_query_returns_nothing() {
        let catalog = fixture();
        assert!(catalog.search_title("").is_empty());
        assert!(catalog.search_title("   ").is_empty());
    }

    #[test]
    fn test_search_is_case_insensitive_prefix() {
        let catalog = fixture();
        let hits = catalog.search_title("alp");
        let ids: Vec<i64> = hits.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![1, 4]);
    }

    #[test]
    fn test_search_exact_match_sorts_first() {
        let catalog = fixture();
        let hits = catalog.search_title("ALPHA");
        assert_eq!(hits[0].id, 1);
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let result = CatalogStore::from_movies(vec![
            movie(1, "Alpha", 7.0, 50.0),
            movie(1, "Alpha Again", 7.0, 50.0),
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_category_parse() {
        assert_eq!(Category::parse("popular").unwrap(), Category::Popular);
        assert_eq!(Category::parse("top_rated").unwrap(), Category::TopRated);
        assert!(Category::parse("trending").is_err());
    }
}
