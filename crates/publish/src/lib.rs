//! Publishing of new video posts.

mod asset;
mod error;
mod pipeline;

pub use asset::{AssetKind, MediaAsset};
pub use error::PublishError;
pub use pipeline::{Draft, PublishPipeline};
