pub mod backfill;
mod model;
mod repo;

pub use backfill::{assign_image, assign_images, BackfillError, BackfillOutcome, ImageAssignment};
pub use model::{NewPost, Post, PostPatch};
