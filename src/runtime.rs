//! Runtime: registry, class factory and instance arena tied together.
//!
//! A [`Runtime`] is an explicit value. There is no process-wide class
//! registry, so independent runtimes (and test fixtures) can coexist.

use std::rc::Rc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::bridge::BridgeConfig;
use crate::class::{ClassFactory, WriteMode};
use crate::config::{ClassDefinition, ConfigRegistry, MergedConfigMap};
use crate::error::Result;
use crate::instance::{InstanceArena, InstanceId, LifecycleEvent, LifecycleTracker};
use crate::value::Value;

// ---------------------------------------------------------------------------
// RuntimeConfig
// ---------------------------------------------------------------------------

/// Configuration for a runtime.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Application name, attached to log spans.
    pub app_name: Option<String>,
    /// Deadline for cross-context calls. `None` waits forever.
    pub bridge_timeout: Option<Duration>,
    /// Reject storing a child that another live instance already owns.
    pub strict_ownership: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            app_name: None,
            bridge_timeout: None,
            strict_ownership: true,
        }
    }
}

impl RuntimeConfig {
    /// Default settings: strict ownership, no bridge timeout.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the application name (builder).
    pub fn with_app_name(mut self, name: impl Into<String>) -> Self {
        self.app_name = Some(name.into());
        self
    }

    /// Set the bridge call deadline (builder).
    pub fn with_bridge_timeout(mut self, timeout: Duration) -> Self {
        self.bridge_timeout = Some(timeout);
        self
    }

    /// Toggle exclusive child ownership checks (builder).
    pub fn with_strict_ownership(mut self, strict: bool) -> Self {
        self.strict_ownership = strict;
        self
    }

    /// Bridge settings derived from this config.
    pub fn bridge_config(&self) -> BridgeConfig {
        BridgeConfig {
            timeout: self.bridge_timeout,
        }
    }
}

// ---------------------------------------------------------------------------
// Runtime
// ---------------------------------------------------------------------------

/// Owns classes and instances for one execution context.
pub struct Runtime {
    config: RuntimeConfig,
    pub(crate) registry: ConfigRegistry,
    pub(crate) factory: ClassFactory,
    pub(crate) instances: InstanceArena,
    pub(crate) lifecycle: LifecycleTracker,
    /// Parent of every instance liveness token.
    pub(crate) shutdown: CancellationToken,
}

impl Runtime {
    /// Create a runtime with its own registry, class cache and arena.
    pub fn new(config: RuntimeConfig) -> Self {
        Self {
            config,
            registry: ConfigRegistry::new(),
            factory: ClassFactory::new(),
            instances: InstanceArena::new(),
            lifecycle: LifecycleTracker::new(),
            shutdown: CancellationToken::new(),
        }
    }

    /// The settings this runtime was built with.
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Registered class definitions.
    pub fn registry(&self) -> &ConfigRegistry {
        &self.registry
    }

    /// Every instance this runtime has created.
    pub fn instances(&self) -> &InstanceArena {
        &self.instances
    }

    // -- classes ------------------------------------------------------------

    /// Register and freeze a class.
    ///
    /// # Panics
    ///
    /// Panics if the class name is already registered.
    pub fn apply_class_config(&mut self, definition: ClassDefinition) -> Result<()> {
        self.factory
            .apply_class_config(&mut self.registry, definition)
            .map(|_| ())
    }

    /// Register and freeze a class, reporting a name collision as an error.
    pub fn try_apply_class_config(&mut self, definition: ClassDefinition) -> Result<()> {
        self.factory
            .try_apply_class_config(&mut self.registry, definition)
            .map(|_| ())
    }

    /// Merged config map of `class`, computed on first use.
    pub fn merged_config(&mut self, class: &str) -> Result<Rc<MergedConfigMap>> {
        self.registry.merge(class)
    }

    // -- config access ------------------------------------------------------

    /// Read a config through its getter.
    pub fn get(&self, id: InstanceId, config: &str) -> Result<Value> {
        let class = Rc::clone(&self.instances.live(id)?.class);
        class.accessor(config)?.read(self, id)
    }

    /// Write a config through its setter.
    pub fn set(&mut self, id: InstanceId, config: &str, value: impl Into<Value>) -> Result<()> {
        self.set_with(id, config, value, WriteMode::Notify).map(|_| ())
    }

    /// Write a config without running `after_set`.
    pub fn set_silent(
        &mut self,
        id: InstanceId,
        config: &str,
        value: impl Into<Value>,
    ) -> Result<()> {
        self.set_with(id, config, value, WriteMode::Silent).map(|_| ())
    }

    /// Write a config with an explicit [`WriteMode`]. Returns whether it stored.
    pub fn set_with(
        &mut self,
        id: InstanceId,
        config: &str,
        value: impl Into<Value>,
        mode: WriteMode,
    ) -> Result<bool> {
        let class = Rc::clone(&self.instances.live(id)?.class);
        class.accessor(config)?.write(self, id, value.into(), mode)
    }

    // -- instance facts -----------------------------------------------------

    /// Name of the class `id` was created from.
    pub fn class_name(&self, id: InstanceId) -> Result<&str> {
        Ok(self.instances.live(id)?.class_name())
    }

    /// Whether `id` names a destroyed instance.
    pub fn is_destroyed(&self, id: InstanceId) -> bool {
        self.instances.get(id).is_some_and(|i| i.is_destroyed())
    }

    /// The instance holding `id` in its storage, if any.
    pub fn owner_of(&self, id: InstanceId) -> Result<Option<InstanceId>> {
        Ok(self.instances.live(id)?.owner())
    }

    /// Token revoked when `id` starts tearing down.
    pub fn liveness(&self, id: InstanceId) -> Result<CancellationToken> {
        Ok(self.instances.live(id)?.liveness.clone())
    }

    /// Configs of the running batch that have not been applied yet, in
    /// declaration order.
    pub fn pending_configs(&self, id: InstanceId) -> Result<Vec<String>> {
        let instance = self.instances.live(id)?;
        Ok(instance
            .class
            .accessors()
            .iter()
            .filter(|a| instance.pending_batch.contains(a.name()))
            .map(|a| a.name().to_owned())
            .collect())
    }

    // -- mounting -----------------------------------------------------------

    /// Mark `id` visible to rendering collaborators.
    pub fn mount(&mut self, id: InstanceId) -> Result<()> {
        self.instances.live(id)?;
        self.lifecycle.on_mount(id);
        Ok(())
    }

    /// Hide `id` without destroying it.
    pub fn unmount(&mut self, id: InstanceId) -> Result<()> {
        self.instances.live(id)?;
        self.lifecycle.on_unmount(id);
        Ok(())
    }

    /// Whether `id` is currently mounted.
    pub fn is_mounted(&self, id: InstanceId) -> bool {
        self.lifecycle.is_mounted(id)
    }

    /// Drain lifecycle events queued for rendering collaborators.
    pub fn drain_lifecycle_events(&mut self) -> Vec<LifecycleEvent> {
        self.lifecycle.drain()
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new(RuntimeConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_builders() {
        let cfg = RuntimeConfig::new()
            .with_app_name("demo")
            .with_bridge_timeout(Duration::from_millis(250))
            .with_strict_ownership(false);
        assert_eq!(cfg.app_name.as_deref(), Some("demo"));
        assert!(!cfg.strict_ownership);
        assert_eq!(
            cfg.bridge_config().timeout,
            Some(Duration::from_millis(250))
        );
    }

    #[test]
    fn default_config_is_strict_without_timeout() {
        let rt = Runtime::default();
        assert!(rt.config().strict_ownership);
        assert!(rt.config().bridge_timeout.is_none());
        assert_eq!(rt.instances().live_count(), 0);
    }
}
