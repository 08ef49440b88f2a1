//! Plugin catalog
//!
//! Plugins are compiled into the host and registered by name. Files in the
//! extensions directory are YAML manifests that only say which registered
//! entry point to bind and with which settings; no foreign code is loaded.

use crate::events::{EventBus, EventKind, MessageProcessed, MessageReceived};
use crate::handler::ChatHandler;
use crate::sender::SenderStateView;
use breeze_filters::DetectionService;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use parking_lot::Mutex;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// Free-form `settings` block of a manifest
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PluginSettings(serde_yaml::Mapping);

impl PluginSettings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a value, mostly useful in tests
    pub fn with(mut self, key: &str, value: impl Into<serde_yaml::Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Read one key, `None` when absent
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> anyhow::Result<Option<T>> {
        match self.0.get(key) {
            Some(value) => Ok(Some(serde_yaml::from_value(value.clone())?)),
            None => Ok(None),
        }
    }

    /// Read one key or fall back to a default
    pub fn get_or<T: DeserializeOwned>(&self, key: &str, default: T) -> anyhow::Result<T> {
        Ok(self.get(key)?.unwrap_or(default))
    }

    /// Deserialize the whole block into a typed settings struct
    pub fn parse<T: DeserializeOwned>(&self) -> anyhow::Result<T> {
        Ok(serde_yaml::from_value(serde_yaml::Value::Mapping(self.0.clone()))?)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Contents of one artifact file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ArtifactManifest {
    /// Catalog name of the custom handler (`handler.yaml` only)
    #[serde(default)]
    pub handler: Option<String>,

    /// Catalog name of the extension entry point
    #[serde(default)]
    pub on_load: Option<String>,

    #[serde(default)]
    pub settings: PluginSettings,
}

impl ArtifactManifest {
    /// Parse a manifest; an empty document is an empty manifest
    pub fn from_yaml(yaml: &str) -> breeze_core::Result<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> breeze_core::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }
}

/// Capabilities handed to an extension's `on_load`
#[derive(Clone)]
pub struct ExtensionContext {
    event_bus: Arc<EventBus>,
    senders: SenderStateView,
    detection: Arc<DetectionService>,
    module_name: String,
    settings: PluginSettings,
    registered: Arc<Mutex<Vec<EventKind>>>,
}

impl ExtensionContext {
    pub fn new(
        event_bus: Arc<EventBus>,
        senders: SenderStateView,
        detection: Arc<DetectionService>,
        module_name: impl Into<String>,
        settings: PluginSettings,
    ) -> Self {
        Self {
            event_bus,
            senders,
            detection,
            module_name: module_name.into(),
            settings,
            registered: Arc::default(),
        }
    }

    /// Subscribe to received messages under this module's name
    pub fn on_message_received<F>(&self, callback: F)
    where
        F: Fn(&MessageReceived) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.event_bus
            .on_message_received(self.module_name.as_str(), callback);
        self.registered.lock().push(EventKind::MessageReceived);
    }

    /// Subscribe to processed messages under this module's name
    pub fn on_message_processed<F>(&self, callback: F)
    where
        F: Fn(&MessageProcessed) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.event_bus
            .on_message_processed(self.module_name.as_str(), callback);
        self.registered.lock().push(EventKind::MessageProcessed);
    }

    /// Events subscribed through this context, in subscription order
    pub fn registered_hooks(&self) -> Vec<EventKind> {
        self.registered.lock().clone()
    }

    pub fn event_bus(&self) -> &Arc<EventBus> {
        &self.event_bus
    }

    pub fn senders(&self) -> &SenderStateView {
        &self.senders
    }

    pub fn detection(&self) -> &Arc<DetectionService> {
        &self.detection
    }

    pub fn module_name(&self) -> &str {
        &self.module_name
    }

    pub fn settings(&self) -> &PluginSettings {
        &self.settings
    }
}

impl fmt::Debug for ExtensionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtensionContext")
            .field("module_name", &self.module_name)
            .field("settings", &self.settings)
            .field("registered", &self.registered.lock())
            .finish_non_exhaustive()
    }
}

/// An auxiliary module that observes the pipeline
pub trait Extension: Send + Sync {
    /// Called exactly once at startup
    fn on_load(&self, ctx: &ExtensionContext) -> anyhow::Result<()>;
}

type HandlerFactory = Arc<dyn Fn(&PluginSettings) -> anyhow::Result<Arc<dyn ChatHandler>> + Send + Sync>;

/// Named entry points the host makes available to manifests
#[derive(Default, Clone)]
pub struct PluginCatalog {
    handlers: BTreeMap<String, HandlerFactory>,
    extensions: BTreeMap<String, Arc<dyn Extension>>,
}

impl PluginCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a custom handler factory under `name`
    pub fn register_handler<F>(&mut self, name: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn(&PluginSettings) -> anyhow::Result<Arc<dyn ChatHandler>> + Send + Sync + 'static,
    {
        self.handlers.insert(name.into(), Arc::new(factory));
        self
    }

    /// Register an extension under `name`
    pub fn register_extension(
        &mut self,
        name: impl Into<String>,
        extension: Arc<dyn Extension>,
    ) -> &mut Self {
        self.extensions.insert(name.into(), extension);
        self
    }

    /// Build the handler registered as `name`
    pub fn create_handler(
        &self,
        name: &str,
        settings: &PluginSettings,
    ) -> Option<anyhow::Result<Arc<dyn ChatHandler>>> {
        self.handlers.get(name).map(|factory| factory(settings))
    }

    pub fn extension(&self, name: &str) -> Option<Arc<dyn Extension>> {
        self.extensions.get(name).cloned()
    }

    pub fn handler_names(&self) -> Vec<&str> {
        self.handlers.keys().map(String::as_str).collect()
    }

    pub fn extension_names(&self) -> Vec<&str> {
        self.extensions.keys().map(String::as_str).collect()
    }
}

impl fmt::Debug for PluginCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginCatalog")
            .field("handlers", &self.handler_names())
            .field("extensions", &self.extension_names())
            .finish()
    }
}
