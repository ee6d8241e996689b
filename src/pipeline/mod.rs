//! Refresh Pipeline Module
//!
//! Turns a configured source into a cached PNG: download the document for a
//! candidate edition date, rasterize its first page, crop and resize, encode.
//!
//! # Stages
//! - `fetch`: HTTP retrieval behind the [`DocumentFetcher`] trait
//! - `render`: first-page rasterization behind the [`PageRenderer`] trait
//! - `transform`: crop, resize and PNG encoding
//! - `refresh`: the lookback loop tying the stages to the cache

pub mod fetch;
pub mod refresh;
pub mod render;
pub mod transform;

pub use fetch::{DocumentFetcher, FetchedDocument, HttpFetcher};
pub use refresh::{FetchPipeline, PassSummary};
pub use render::{PageRenderer, PdftoppmRenderer};
pub use transform::{encode_png, transform};
