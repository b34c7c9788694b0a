//! Error taxonomy for the runtime and the cross-context bridge.

use std::time::Duration;

use crate::instance::InstanceId;

/// Errors raised by registration, instantiation and config access.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RuntimeError {
    /// A class was registered twice under the same name.
    #[error("class `{0}` is already registered")]
    DuplicateClassName(String),
    /// Merge or instantiation was requested for an unregistered class.
    #[error("unknown class `{0}`")]
    UnknownClass(String),
    /// The ancestor chain of a class loops back onto itself.
    #[error("ancestor chain of `{0}` is cyclic")]
    CyclicAncestry(String),
    /// Access to a config name absent from the class's merged map.
    #[error("class `{class}` has no config named `{config}`")]
    UnknownConfig { class: String, config: String },
    /// The instance id was never allocated by this runtime.
    #[error("unknown instance {0:?}")]
    UnknownInstance(InstanceId),
    /// The instance has been destroyed.
    #[error("instance {0:?} has been destroyed")]
    DestroyedInstanceAccess(InstanceId),
    /// A child instance is already owned by another live instance.
    #[error("instance {child:?} is already owned by {owner:?}")]
    AlreadyOwned { child: InstanceId, owner: InstanceId },
    /// A config held a value of the wrong shape.
    #[error("invalid value for `{config}`: {message}")]
    InvalidValue { config: String, message: String },
    /// A cross-context call failed.
    #[error(transparent)]
    Bridge(#[from] BridgeError),
}

/// Errors produced by [`crate::bridge::CrossContextBridge`] calls.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BridgeError {
    #[error("call {id} timed out after {after:?}")]
    Timeout { id: String, after: Duration },
    #[error("call {id} was cancelled")]
    Cancelled { id: String },
    #[error("call {id} failed in the remote context: {message}")]
    Remote { id: String, message: String },
    #[error("bridge channel closed")]
    ChannelClosed,
    #[error("malformed message: {0}")]
    Malformed(String),
}

/// Crate-wide result alias.
pub type Result<T, E = RuntimeError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_offender() {
        let err = RuntimeError::DuplicateClassName("menu.List".into());
        assert_eq!(err.to_string(), "class `menu.List` is already registered");

        let err = RuntimeError::UnknownConfig {
            class: "menu.List".into(),
            config: "colour".into(),
        };
        assert_eq!(err.to_string(), "class `menu.List` has no config named `colour`");
    }

    #[test]
    fn bridge_errors_convert() {
        let err: RuntimeError = BridgeError::Cancelled { id: "7".into() }.into();
        assert_eq!(err.to_string(), "call 7 was cancelled");
        assert!(matches!(err, RuntimeError::Bridge(BridgeError::Cancelled { .. })));
    }
}
