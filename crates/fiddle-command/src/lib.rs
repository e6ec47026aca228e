mod detection;
mod inventory;
mod provisioner;

pub use detection::{HELPER_NAME, ProvisionerDetection, detect_provisioner};
pub use inventory::parse_downloaded_versions;
pub use provisioner::{CommandProvisioner, CommandTypeDefinitions};
