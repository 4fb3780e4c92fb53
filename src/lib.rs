pub mod cache;
pub mod commands;
pub mod download;
pub mod error;
pub mod feed;
pub mod http;
pub mod package;
pub mod source;

pub use cache::{ResourceCache, ResourceFactory};
pub use download::{DownloadResolver, DownloadResult, DownloadSettings, HttpDownloadResolver};
pub use error::{FeedError, Result};
pub use feed::{FeedClient, FeedPackageRecord, FeedPager, SearchFilter};
pub use package::{PackageIdentity, PackageVersion, VersionRange};
pub use source::{Credentials, PackageSource};
