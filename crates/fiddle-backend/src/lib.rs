mod error;
mod traits;
mod types;

pub use error::BackendError;
pub use traits::{
    BinaryProvisioner, KeyValueStore, KnownVersionsSource, NoTypeDefinitions,
    TypeDefinitionService,
};
pub use types::{DownloadState, ReleaseInfo, VersionIdentifier, VersionParseError, normalize};
