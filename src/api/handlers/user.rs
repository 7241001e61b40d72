use std::collections::HashMap;

use axum::{extract::State, Extension, Json};
use serde::Serialize;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::models::EngagementStats;

use super::super::AppState;
use super::{decorate_liked, MovieWithLiked};

/// How many favorite genres to report
const FAVORITE_GENRE_LIMIT: usize = 3;

#[derive(Debug, Serialize)]
pub struct ProfileStats {
    #[serde(flatten)]
    pub counts: EngagementStats,
    pub favorite_genres: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub username: String,
    pub email: String,
    pub stats: ProfileStats,
}

/// Returns the caller's profile and aggregate engagement stats
pub async fn profile(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> AppResult<Json<ProfileResponse>> {
    let counts = state.engagement.stats(user.id).await?;
    let liked_ids = state.engagement.liked_movie_ids(user.id).await?;
    let favorite_genres = favorite_genres(&state, &liked_ids);

    Ok(Json(ProfileResponse {
        username: user.username,
        email: user.email,
        stats: ProfileStats {
            counts,
            favorite_genres,
        },
    }))
}

#[derive(Debug, Serialize)]
pub struct LikedMoviesResponse {
    pub movies: Vec<MovieWithLiked>,
}

/// Returns the full movie records for everything the caller has liked
pub async fn liked_movies(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> AppResult<Json<LikedMoviesResponse>> {
    let liked_ids = state.engagement.liked_movie_ids(user.id).await?;

    // Likes can reference movies dropped by a catalog refresh; skip those.
    let movies: Vec<_> = liked_ids
        .iter()
        .filter_map(|&id| state.catalog.get(id).cloned())
        .collect();

    let liked = liked_ids.into_iter().collect();
    Ok(Json(LikedMoviesResponse {
        movies: decorate_liked(movies, &liked),
    }))
}

/// Ranks the genres of the user's liked movies, most frequent first
fn favorite_genres(state: &AppState, liked_ids: &[i64]) -> Vec<String> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for &id in liked_ids {
        if let Some(movie) = state.catalog.get(id) {
            for genre in &movie.genres {
                *counts.entry(genre.as_str()).or_default() += 1;
            }
        }
    }

    let mut ranked: Vec<(&str, usize)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    ranked
        .into_iter()
        .take(FAVORITE_GENRE_LIMIT)
        .map(|(genre, _)| genre.to_string())
        .collect()
}
