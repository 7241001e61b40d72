use std::collections::HashSet;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::catalog::Category;
use crate::error::{AppError, AppResult};
use crate::middleware::CurrentUser;
use crate::models::Comment;
use crate::store::validate_comment;

use super::super::AppState;
use super::{decorate_liked, MovieWithLiked};

const DEFAULT_PAGE_SIZE: usize = 20;
const MAX_PAGE_SIZE: usize = 100;

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub category: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct MovieListResponse {
    pub movies: Vec<MovieWithLiked>,
    pub total: usize,
}

/// Returns one page of the catalog listing for a category
pub async fn list_movies(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Query(params): Query<ListParams>,
) -> AppResult<Json<MovieListResponse>> {
    let category = Category::parse(params.category.as_deref().unwrap_or("popular"))?;
    let limit = params
        .limit
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, MAX_PAGE_SIZE);
    let offset = params.offset.unwrap_or(0);

    let (page, total) = state.catalog.list(category, limit, offset);
    let movies: Vec<_> = page.into_iter().cloned().collect();
    let liked = liked_set(&state, &user).await?;

    Ok(Json(MovieListResponse {
        movies: decorate_liked(movies, &liked),
        total,
    }))
}

/// Returns a single movie's details and records the view
pub async fn get_movie(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(movie_id): Path<i64>,
) -> AppResult<Json<MovieWithLiked>> {
    let movie = state
        .catalog
        .get(movie_id)
        .cloned()
        .ok_or_else(|| AppError::NotFound("Movie not found".to_string()))?;

    // Tracking feeds the offline model only; a failure must not take down the
    // detail page.
    if let Err(e) = state.engagement.record_view(user.id, movie_id).await {
        tracing::warn!(error = %e, movie_id, "Failed to record view");
    }

    let liked = liked_set(&state, &user).await?;
    let is_liked = liked.contains(&movie_id);

    Ok(Json(MovieWithLiked { movie, is_liked }))
}

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub query: String,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub movies: Vec<MovieWithLiked>,
    pub recommendations: Vec<MovieWithLiked>,
    pub query: String,
}

/// Searches the catalog by title; an unambiguous match also yields the
/// precomputed similar titles.
pub async fn search_movies(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(request): Json<SearchRequest>,
) -> AppResult<Json<SearchResponse>> {
    if let Err(e) = state.engagement.record_search(user.id, &request.query).await {
        tracing::warn!(error = %e, "Failed to record search");
    }

    let outcome = state.recommender.search(&request.query);
    let liked = liked_set(&state, &user).await?;

    Ok(Json(SearchResponse {
        movies: decorate_liked(outcome.matches, &liked),
        recommendations: decorate_liked(outcome.recommendations, &liked),
        query: request.query,
    }))
}

/// Flips the caller's like on a movie
pub async fn toggle_like(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(movie_id): Path<i64>,
) -> AppResult<Json<Value>> {
    if !state.catalog.contains(movie_id) {
        return Err(AppError::NotFound("Movie not found".to_string()));
    }

    let is_liked = state.engagement.toggle_like(user.id, movie_id).await?;

    Ok(Json(json!({ "is_liked": is_liked })))
}

#[derive(Debug, Serialize)]
pub struct CommentsResponse {
    pub comments: Vec<Comment>,
}

/// Lists a movie's comments, newest first
pub async fn list_comments(
    State(state): State<AppState>,
    Path(movie_id): Path<i64>,
) -> AppResult<Json<CommentsResponse>> {
    if !state.catalog.contains(movie_id) {
        return Err(AppError::NotFound("Movie not found".to_string()));
    }

    let comments = state.engagement.list_comments(movie_id).await?;
    Ok(Json(CommentsResponse { comments }))
}

#[derive(Debug, Deserialize)]
pub struct AddCommentRequest {
    pub text: String,
}

/// Appends a comment to a movie
pub async fn add_comment(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(movie_id): Path<i64>,
    Json(request): Json<AddCommentRequest>,
) -> AppResult<(StatusCode, Json<Comment>)> {
    if !state.catalog.contains(movie_id) {
        return Err(AppError::NotFound("Movie not found".to_string()));
    }

    let text = validate_comment(&request.text)?;
    let comment = state.engagement.add_comment(user.id, movie_id, text).await?;

    Ok((StatusCode::CREATED, Json(comment)))
}

async fn liked_set(state: &AppState, user: &CurrentUser) -> AppResult<HashSet<i64>> {
    Ok(state
        .engagement
        .liked_movie_ids(user.id)
        .await?
        .into_iter()
        .collect())
}
