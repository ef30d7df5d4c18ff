pub mod media;
pub mod update;

pub use media::{
    Media, MediaSpeciesTag, MediaStatus, MediaType, ProcessedVersion, ProcessedVersions,
    SpeciesTagSource,
};
pub use update::{Field, MediaDetailsUpdate};
