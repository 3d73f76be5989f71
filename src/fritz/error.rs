use thiserror::Error;

/// Errors surfaced by the FRITZ!Box client
#[derive(Debug, Error)]
pub enum FritzError {
    /// Credentials rejected, or password login is disabled on the device
    #[error("cannot login to the FRITZ!Box: {0}")]
    Auth(String),

    /// Requested profile name is not present in the device's listing
    #[error("profile {0:?} does not exist on the device, check the spelling")]
    ProfileNotFound(String),

    /// Network failure or non-success response that survived the single retry
    #[error("request to the FRITZ!Box failed: {0}")]
    Transport(String),

    /// An expected field is missing from a device response, which usually
    /// means the firmware serves a different markup dialect
    #[error("missing {0:?} in the FRITZ!Box response")]
    Parse(&'static str),
}

pub type Result<T> = std::result::Result<T, FritzError>;
