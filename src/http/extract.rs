//! Extractors whose rejections answer with the JSON error body

use axum::extract::{FromRequest, FromRequestParts};

use crate::http::routes::AppError;

/// `axum::Json`, rejecting malformed bodies through [`AppError`]
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// `axum::extract::Path`, rejecting bad path segments through [`AppError`]
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct ApiPath<T>(pub T);
