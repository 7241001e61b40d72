use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A movie record from the read-only catalog snapshot.
///
/// Identifiers are assigned by the offline catalog build and are stable across
/// service restarts. Nothing in the running service mutates these records.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Movie {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub overview: String,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub release_date: Option<NaiveDate>,
    #[serde(default)]
    pub runtime: Option<i32>,
    #[serde(default)]
    pub vote_average: f64,
    #[serde(default)]
    pub popularity: f64,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub backdrop_path: Option<String>,
}

/// A registered user account
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// A comment on a movie, joined with the author's username for display
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Comment {
    pub id: Uuid,
    pub movie_id: i64,
    pub username: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

/// Aggregate engagement counters for a single user
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct EngagementStats {
    pub liked_count: i64,
    pub viewed_count: i64,
    pub search_count: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_movie_deserializes_with_missing_optionals() {
        let json = r#"{"id": 603, "title": "The Matrix"}"#;
        let movie: Movie = serde_json::from_str(json).unwrap();
        assert_eq!(movie.id, 603);
        assert_eq!(movie.title, "The Matrix");
        assert_eq!(movie.overview, "");
        assert!(movie.genres.is_empty());
        assert_eq!(movie.release_date, None);
        assert_eq!(movie.runtime, None);
    }

    #[test]
    fn test_movie_round_trips_full_record() {
        let movie = Movie {
            id: 603,
            title: "The Matrix".to_string(),
            overview: "A hacker learns the truth.".to_string(),
            genres: vec!["Action".to_string(), "Science Fiction".to_string()],
            release_date: Some(NaiveDate::from_ymd_opt(1999, 3, 31).unwrap()),
            runtime: Some(136),
            vote_average: 8.2,
            popularity: 104.5,
            poster_path: Some("/matrix.jpg".to_string()),
            backdrop_path: None,
        };

        let json = serde_json::to_string(&movie).unwrap();
        let back: Movie = serde_json::from_str(&json).unwrap();
        assert_eq!(back, movie);
    }
}
