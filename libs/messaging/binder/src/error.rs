//! Binder errors

use crate::handler::OwnerId;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BinderError {
    /// Binding through a scope whose owner was already detached
    #[error("Binding scope of {owner} is detached")]
    ScopeDetached { owner: OwnerId },
}

pub type Result<T> = std::result::Result<T, BinderError>;
