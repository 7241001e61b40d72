use std::collections::HashSet;

use axum::{http::StatusCode, Json};
use serde::Serialize;
use serde_json::{json, Value};

use crate::models::Movie;

pub mod auth;
pub mod movies;
pub mod user;

/// Health check endpoint
pub async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}

/// A catalog movie decorated with the caller's like state
#[derive(Debug, Serialize)]
pub struct MovieWithLiked {
    #[serde(flatten)]
    pub movie: Movie,
    pub is_liked: bool,
}

/// Decorates movies with `is_liked` flags for the current user
pub fn decorate_liked(movies: Vec<Movie>, liked: &HashSet<i64>) -> Vec<MovieWithLiked> {
    movies
        .into_iter()
        .map(|movie| MovieWithLiked {
            is_liked: liked.contains(&movie.id),
            movie,
        })
        .collect()
}
