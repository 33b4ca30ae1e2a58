/// Item Image Subsystem
///
/// Accepts uploaded image files, validates them against a closed type allow
/// list, persists them to the per-user blob store, and links them to item
/// records one-to-one inside a database transaction. Replacement and
/// deletion remove the previous blob only after the metadata commit, so no
/// row ever points at a missing blob.

pub mod metadata;
pub mod ownership;
pub mod service;
pub mod types;

pub use metadata::ImageRecord;
pub use ownership::OwnershipOracle;
pub use service::{ImageService, ImageUpload, MAX_IMAGE_BYTES};
pub use types::ImageType;
