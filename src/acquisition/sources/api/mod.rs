//! Authenticated backend API integration.
//!
//! - `dto`: exact response shapes
//! - `adapter`: picks the download URL out of a response
//! - `client`: HTTP client and [`SourceStrategy`](crate::acquisition::traits::SourceStrategy) impl

pub mod adapter;
pub mod client;
pub mod dto;

pub use client::AuthenticatedApiClient;
