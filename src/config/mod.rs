//! Declarative class configuration.
//!
//! - [`ConfigMap`]: a class's own config declarations.
//! - [`ClassDefinition`]: name, ancestor, configs and explicit hooks.
//! - [`ConfigRegistry`]: per-name definitions plus lazily merged maps.
//! - [`MergedConfigMap`]: the override-resolved view of an ancestor chain.

pub mod definition;
pub mod descriptor;
pub mod registry;

pub use definition::ClassDefinition;
pub use descriptor::{
    parse_declared_name, public_name, ConfigDecl, ConfigDescriptor, ConfigMap, MergedConfigMap,
    REACTIVE_MARKER,
};
pub use registry::ConfigRegistry;
