//! Package coordinates: versions, identities, ranges and dependencies.

mod dependency;
mod identity;
mod range;
mod version;

pub use dependency::{FeedDependency, parse_dependencies};
pub use identity::PackageIdentity;
pub use range::{VersionRange, VersionRangeParseError};
pub use version::{PackageVersion, VersionParseError};
