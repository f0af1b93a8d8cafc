//! Error types for aclmgr

use thiserror::Error;
use tnsr_acl_common::{AclError, HttpError};

use crate::renumber::PartialRenumberFailure;

/// ACL manager errors
#[derive(Error, Debug)]
pub enum AclMgrError {
    /// Rule store error (remote failure, invalid rule, undecodable payload)
    #[error(transparent)]
    Acl(#[from] AclError),

    /// Another shift on the same ACL has not settled yet
    #[error("A shift is already in progress for ACL '{acl_name}'")]
    ShiftInProgress { acl_name: String },

    /// A renumbering chain halted part way
    #[error(transparent)]
    PartialRenumber(Box<PartialRenumberFailure>),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AclMgrError {
    /// Returns the remote failure behind this error, if any.
    pub fn http(&self) -> Option<&HttpError> {
        match self {
            AclMgrError::Acl(e) => e.http(),
            AclMgrError::PartialRenumber(p) => p.source.http(),
            _ => None,
        }
    }
}

impl From<HttpError> for AclMgrError {
    fn from(e: HttpError) -> Self {
        AclMgrError::Acl(AclError::Http(e))
    }
}

impl From<PartialRenumberFailure> for AclMgrError {
    fn from(e: PartialRenumberFailure) -> Self {
        AclMgrError::PartialRenumber(Box::new(e))
    }
}

/// Result type for aclmgr operations
pub type Result<T> = std::result::Result<T, AclMgrError>;
