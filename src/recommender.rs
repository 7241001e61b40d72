use std::sync::Arc;

use crate::catalog::CatalogStore;
use crate::models::Movie;
use crate::similarity::SimilarityIndex;

/// Number of recommendations resolved for a confident match
const RECOMMENDATION_LIMIT: usize = 10;

/// Result of a catalog search: the matching movies plus, when the query
/// unambiguously names a single title, its precomputed nearest neighbors.
#[derive(Debug)]
pub struct SearchOutcome {
    pub matches: Vec<Movie>,
    pub recommendations: Vec<Movie>,
}

/// Resolves search queries against the catalog and the similarity index.
///
/// This is the only place offline-computed data (the index) meets online
/// request handling. Recommendations are attached only when the top match's
/// title equals the query case-insensitively; with zero or several ambiguous
/// matches the resolver does not guess.
pub struct Recommender {
    catalog: Arc<CatalogStore>,
    similarity: Arc<SimilarityIndex>,
}

impl Recommender {
    pub fn new(catalog: Arc<CatalogStore>, similarity: Arc<SimilarityIndex>) -> Self {
        Self {
            catalog,
            similarity,
        }
    }

    pub fn search(&self, query: &str) -> SearchOutcome {
        let matches: Vec<Movie> = self
            .catalog
            .search_title(query)
            .into_iter()
            .cloned()
            .collect();

        let recommendations = match confident_match(query, &matches) {
            Some(movie_id) => self.resolve_neighbors(movie_id),
            None => Vec::new(),
        };

        SearchOutcome {
            matches,
            recommendations,
        }
    }

    /// Maps a movie's neighbor list back through the catalog.
    ///
    /// Ids the catalog no longer knows (index built against an older snapshot)
    /// are skipped with a warning; the search itself still succeeds.
    fn resolve_neighbors(&self, movie_id: i64) -> Vec<Movie> {
        let neighbors = self.similarity.neighbors_of(movie_id, RECOMMENDATION_LIMIT);

        let mut resolved = Vec::with_capacity(neighbors.len());
        for neighbor in neighbors {
            match self.catalog.get(neighbor.movie_id()) {
                Some(movie) => resolved.push(movie.clone()),
                None => {
                    tracing::warn!(
                        movie_id,
                        neighbor_id = neighbor.movie_id(),
                        "Similarity index references a movie absent from the catalog"
                    );
                }
            }
        }
        resolved
    }
}

/// A match is confident only when the best-ranked result's title equals the
/// query case-insensitively. Prefix-only matches never trigger
/// recommendations.
fn confident_match(query: &str, matches: &[Movie]) -> Option<i64> {
    let top = matches.first()?;
    let query = query.trim().to_lowercase();
    if top.title.to_lowercase() == query {
        Some(top.id)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::similarity::Neighbor;

    fn movie(id: i64, title: &str) -> Movie {
        Movie {
            id,
            title: title.to_string(),
            overview: String::new(),
            genres: Vec::new(),
            release_date: None,
            runtime: None,
            vote_average: 0.0,
            popularity: 0.0,
            poster_path: None,
            backdrop_path: None,
        }
    }

    fn recommender(movies: Vec<Movie>, neighbors: HashMap<i64, Vec<Neighbor>>) -> Recommender {
        Recommender::new(
            Arc::new(CatalogStore::from_movies(movies).unwrap()),
            Arc::new(SimilarityIndex::from_neighbors(neighbors).unwrap()),
        )
    }

    fn fixture() -> Recommender {
        let movies = vec![
            movie(1, "Alpha"),
            movie(2, "Beta"),
            movie(3, "Gamma"),
            movie(4, "Alpha Dog"),
        ];
        let mut neighbors = HashMap::new();
        neighbors.insert(1, vec![Neighbor(2, 0.9), Neighbor(3, 0.8)]);
        recommender(movies, neighbors)
    }

    #[test]
    fn test_exact_match_attaches_recommendations() {
        let outcome = fixture().search("Alpha");
        assert_eq!(outcome.matches[0].title, "Alpha");
        let rec_ids: Vec<i64> = outcome.recommendations.iter().map(|m| m.id).collect();
        assert_eq!(rec_ids, vec![2, 3]);
    }

    #[test]
    fn test_ambiguous_prefix_has_no_recommendations() {
        let outcome = fixture().search("A");
        assert!(!outcome.matches.is_empty());
        assert!(outcome.recommendations.is_empty());
    }

    #[test]
    fn test_no_match_has_no_recommendations() {
        let outcome = fixture().search("Zeta");
        assert!(outcome.matches.is_empty());
        assert!(outcome.recommendations.is_empty());
    }

    #[test]
    fn test_exact_match_is_case_insensitive() {
        let outcome = fixture().search("aLpHa");
        assert_eq!(outcome.recommendations.len(), 2);
    }

    #[test]
    fn test_match_absent_from_index_yields_empty_recommendations() {
        let outcome = fixture().search("Beta");
        assert_eq!(outcome.matches.len(), 1);
        assert!(outcome.recommendations.is_empty());
    }

    #[test]
    fn test_drifted_neighbor_is_skipped() {
        let movies = vec![movie(1, "Alpha"), movie(2, "Beta")];
        let mut neighbors = HashMap::new();
        // 99 is not in the catalog
        neighbors.insert(1, vec![Neighbor(99, 0.95), Neighbor(2, 0.9)]);
        let outcome = recommender(movies, neighbors).search("Alpha");
        let rec_ids: Vec<i64> = outcome.recommendations.iter().map(|m| m.id).collect();
        assert_eq!(rec_ids, vec![2]);
    }
}
