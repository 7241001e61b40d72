use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use crate::catalog::CatalogStore;
use crate::error::{AppError, AppResult};

/// Artifact schema version this build understands
pub const SIMILARITY_SCHEMA_VERSION: u32 = 1;

/// One precomputed neighbor entry: (movie id, similarity score)
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Neighbor(pub i64, pub f64);

impl Neighbor {
    pub fn movie_id(&self) -> i64 {
        self.0
    }

    pub fn score(&self) -> f64 {
        self.1
    }
}

/// On-disk similarity artifact produced by the offline recommender build
#[derive(Debug, Deserialize)]
struct SimilarityArtifact {
    schema_version: u32,
    #[allow(dead_code)]
    top_n: usize,
    neighbors: HashMap<i64, Vec<Neighbor>>,
}

/// Precomputed nearest-neighbor table over catalog movies.
///
/// Built entirely offline; the running service only reads it. Lookup is a
/// single map access, nothing is recomputed per request.
pub struct SimilarityIndex {
    neighbors: HashMap<i64, Vec<Neighbor>>,
}

impl SimilarityIndex {
    /// Loads the similarity artifact from disk and validates it against the
    /// catalog snapshot.
    ///
    /// A missing file, parse failure, unsupported schema version, or a movie
    /// listed as its own neighbor all abort startup. Neighbor ids the catalog
    /// does not know (the catalog was refreshed independently of the index)
    /// are logged and left in place; the resolver filters them per request.
    pub fn load(path: impl AsRef<Path>, catalog: &CatalogStore) -> AppResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            AppError::Artifact(format!(
                "Cannot read similarity index {}: {}",
                path.display(),
                e
            ))
        })?;

        let artifact: SimilarityArtifact = serde_json::from_str(&raw).map_err(|e| {
            AppError::Artifact(format!(
                "Malformed similarity index {}: {}",
                path.display(),
                e
            ))
        })?;

        if artifact.schema_version != SIMILARITY_SCHEMA_VERSION {
            return Err(AppError::Artifact(format!(
                "Similarity index schema version {} is not supported (expected {})",
                artifact.schema_version, SIMILARITY_SCHEMA_VERSION
            )));
        }

        let index = Self::from_neighbors(artifact.neighbors)?;

        let drifted = index.count_drifted(catalog);
        if drifted > 0 {
            tracing::warn!(
                drifted,
                "Similarity index references movies absent from the catalog"
            );
        }

        tracing::info!(
            entry_count = index.neighbors.len(),
            path = %path.display(),
            "Similarity index loaded"
        );

        Ok(index)
    }

    /// Builds an index directly from a neighbor table (fixtures, tests)
    pub fn from_neighbors(neighbors: HashMap<i64, Vec<Neighbor>>) -> AppResult<Self> {
        for (movie_id, list) in &neighbors {
            if list.iter().any(|n| n.movie_id() == *movie_id) {
                return Err(AppError::Artifact(format!(
                    "Movie {} appears in its own neighbor list",
                    movie_id
                )));
            }
        }
        Ok(Self { neighbors })
    }

    /// Returns up to `k` precomputed neighbors for a movie, best first.
    ///
    /// Unknown movies and `k` larger than the stored top-N both degrade to
    /// "what exists": an empty or shorter slice, never an error.
    pub fn neighbors_of(&self, movie_id: i64, k: usize) -> &[Neighbor] {
        match self.neighbors.get(&movie_id) {
            Some(list) => &list[..k.min(list.len())],
            None => &[],
        }
    }

    pub fn contains(&self, movie_id: i64) -> bool {
        self.neighbors.contains_key(&movie_id)
    }

    fn count_drifted(&self, catalog: &CatalogStore) -> usize {
        self.neighbors
            .values()
            .flatten()
            .filter(|n| !catalog.contains(n.movie_id()))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index(entries: &[(i64, &[(i64, f64)])]) -> AppResult<SimilarityIndex> {
        let neighbors = entries
            .iter()
            .map(|(id, list)| (*id, list.iter().map(|&(n, s)| Neighbor(n, s)).collect()))
            .collect();
        SimilarityIndex::from_neighbors(neighbors)
    }

    #[test]
    fn test_neighbors_of_returns_best_first() {
        let idx = index(&[(1, &[(2, 0.9), (3, 0.7)])]).unwrap();
        let got = idx.neighbors_of(1, 10);
        assert_eq!(got.len(), 2);
        assert_eq!(got[0].movie_id(), 2);
        assert_eq!(got[1].movie_id(), 3);
    }

    #[test]
    fn test_neighbors_of_truncates_to_k() {
        let idx = index(&[(1, &[(2, 0.9), (3, 0.7), (4, 0.5)])]).unwrap();
        assert_eq!(idx.neighbors_of(1, 2).len(), 2);
    }

    #[test]
    fn test_neighbors_of_unknown_movie_is_empty() {
        let idx = index(&[(1, &[(2, 0.9)])]).unwrap();
        assert!(idx.neighbors_of(42, 10).is_empty());
    }

    #[test]
    fn test_self_reference_is_rejected() {
        let result = index(&[(1, &[(1, 1.0), (2, 0.9)])]);
        assert!(result.is_err());
    }

    #[test]
    fn test_wrong_schema_version_is_refused() {
        let artifact = r#"{"schema_version": 2, "top_n": 10, "neighbors": {}}"#;
        let path = std::env::temp_dir().join(format!("sim-{}.json", uuid::Uuid::new_v4()));
        std::fs::write(&path, artifact).unwrap();

        let catalog = CatalogStore::from_movies(Vec::new()).unwrap();
        let result = SimilarityIndex::load(&path, &catalog);
        std::fs::remove_file(&path).ok();

        assert!(matches!(result, Err(AppError::Artifact(_))));
    }

    #[test]
    fn test_missing_artifact_is_refused() {
        let catalog = CatalogStore::from_movies(Vec::new()).unwrap();
        let result = SimilarityIndex::load("/nonexistent/similarity.json", &catalog);
        assert!(matches!(result, Err(AppError::Artifact(_))));
    }

    #[test]
    fn test_valid_artifact_loads() {
        let artifact = r#"{
            "schema_version": 1,
            "top_n": 2,
            "neighbors": {"1": [[2, 0.93], [3, 0.81]]}
        }"#;
        let path = std::env::temp_dir().join(format!("sim-{}.json", uuid::Uuid::new_v4()));
        std::fs::write(&path, artifact).unwrap();

        let catalog = CatalogStore::from_movies(Vec::new()).unwrap();
        let idx = SimilarityIndex::load(&path, &catalog).unwrap();
        std::fs::remove_file(&path).ok();

        assert!(idx.contains(1));
        assert_eq!(idx.neighbors_of(1, 10).len(), 2);
    }
}
