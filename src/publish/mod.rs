//! Publishing artifacts: descriptors, secondary builds, changelog and the
//! master feed.

mod builder;
mod changelog;
mod descriptor;
mod feed;

pub use builder::{BINARIES_DIR, CommandBuilder, SRC_DESCRIPTOR_ENV, binary_descriptors};
pub use changelog::{changelog_file_name, export_changelog};
pub use descriptor::{
    ArchiveRef, ArtifactDescriptor, SOURCE_ARCH, archive_url, source_descriptor_name,
};
pub use feed::{FeedRelease, MasterFeed, Stability};

/// Fill in public URLs for the source and binary descriptors
pub fn merge_descriptors(
    source: &ArtifactDescriptor,
    binaries: &[ArtifactDescriptor],
    public_base: &str,
) -> Vec<ArtifactDescriptor> {
    std::iter::once(source)
        .chain(binaries.iter())
        .map(|d| d.with_url(public_base))
        .collect()
}
