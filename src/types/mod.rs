// ABOUTME: Validated domain types shared across the orchestrator.
// ABOUTME: Release ids, image tags, stage names and versions.

mod image_tag;
mod release_id;
mod stage_name;

pub use image_tag::{ImageTag, ImageTagError};
pub use release_id::{RELEASE_ID_FORMAT, ReleaseId, ReleaseIdError};
pub use stage_name::{NameError, StageName, Version};
