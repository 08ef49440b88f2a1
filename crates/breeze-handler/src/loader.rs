//! Extension discovery and binding
//!
//! Discovery is a plain directory listing: `handler.yaml` is the custom
//! handler artifact, every other `*.yaml` file is an extension. Files whose
//! name starts with `_` or `.` are stubs or private and are skipped, as is
//! anything that is not YAML. Extensions load in file name order.

use crate::events::{EventBus, EventKind};
use crate::handler::{panic_message, ChatHandler};
use crate::plugins::{ArtifactManifest, ExtensionContext, PluginCatalog};
use crate::sender::SenderStateView;
use breeze_core::{Error, Result};
use breeze_filters::DetectionService;
use serde::Serialize;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// File name of the custom handler artifact
pub const HANDLER_ARTIFACT: &str = "handler.yaml";

/// Artifacts found in an extensions directory
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Artifacts {
    pub handler: Option<PathBuf>,
    pub extensions: Vec<PathBuf>,
}

/// Outcome of loading one extension
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtensionRecord {
    /// File stem of the manifest
    pub module_name: String,

    /// Whether `on_load` ran to completion
    pub loaded: bool,

    /// Events the extension subscribed to, one entry per subscription
    pub registered_hooks: Vec<EventKind>,

    /// What went wrong, if anything
    pub error: Option<String>,
}

impl ExtensionRecord {
    fn failed(module_name: &str, registered_hooks: Vec<EventKind>, error: String) -> Self {
        Self {
            module_name: module_name.to_string(),
            loaded: false,
            registered_hooks,
            error: Some(error),
        }
    }
}

fn is_candidate(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    if name.starts_with('_') || name.starts_with('.') {
        return false;
    }
    path.extension().and_then(|e| e.to_str()) == Some("yaml")
}

/// List the artifacts in `dir`
pub fn discover(dir: &Path) -> Result<Artifacts> {
    let mut artifacts = Artifacts::default();

    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() || !is_candidate(&path) {
            debug!(path = %path.display(), "Skipping non-artifact");
            continue;
        }

        if path.file_name().and_then(|n| n.to_str()) == Some(HANDLER_ARTIFACT) {
            artifacts.handler = Some(path);
        } else {
            artifacts.extensions.push(path);
        }
    }

    artifacts.extensions.sort();
    Ok(artifacts)
}

fn module_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Bind the custom handler named by a `handler.yaml` manifest
pub fn bind_handler(path: &Path, catalog: &PluginCatalog) -> Result<Arc<dyn ChatHandler>> {
    let manifest = ArtifactManifest::from_file(path)?;
    let name = manifest.handler.ok_or_else(|| {
        Error::extension(format!("{} does not export a `handler` entry point", path.display()))
    })?;

    match catalog.create_handler(&name, &manifest.settings) {
        Some(Ok(handler)) => Ok(handler),
        Some(Err(e)) => Err(Error::extension(format!(
            "handler '{}' failed to initialize: {:#}",
            name, e
        ))),
        None => Err(Error::extension(format!(
            "handler '{}' is not registered",
            name
        ))),
    }
}

/// Load one extension and run its `on_load` hook.
///
/// Never fails: every fault is logged and reported in the record.
pub fn load_extension(
    path: &Path,
    catalog: &PluginCatalog,
    event_bus: &Arc<EventBus>,
    senders: &SenderStateView,
    detection: &Arc<DetectionService>,
) -> ExtensionRecord {
    let module = module_name(path);

    let manifest = match ArtifactManifest::from_file(path) {
        Ok(manifest) => manifest,
        Err(e) => {
            error!(module = %module, error = %e, "Failed to read extension manifest");
            return ExtensionRecord::failed(&module, Vec::new(), e.to_string());
        }
    };

    let Some(entry) = manifest.on_load else {
        warn!(module = %module, "Extension does not export an `on_load` entry point");
        return ExtensionRecord::failed(&module, Vec::new(), "missing on_load entry point".to_string());
    };

    let Some(extension) = catalog.extension(&entry) else {
        warn!(module = %module, entry = %entry, "Extension entry point is not registered");
        return ExtensionRecord::failed(&module, Vec::new(), format!("entry point '{}' is not registered", entry));
    };

    let ctx = ExtensionContext::new(
        event_bus.clone(),
        senders.clone(),
        detection.clone(),
        module.as_str(),
        manifest.settings,
    );

    let outcome = catch_unwind(AssertUnwindSafe(|| extension.on_load(&ctx)));
    let registered_hooks = ctx.registered_hooks();

    match outcome {
        Ok(Ok(())) => {
            info!(module = %module, entry = %entry, hooks = ?registered_hooks, "Extension loaded");
            ExtensionRecord {
                module_name: module,
                loaded: true,
                registered_hooks,
                error: None,
            }
        }
        Ok(Err(e)) => {
            error!(module = %module, error = %format!("{:#}", e), "Extension on_load failed");
            ExtensionRecord::failed(&module, registered_hooks, format!("{:#}", e))
        }
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            error!(module = %module, panic = %message, "Extension on_load panicked");
            ExtensionRecord::failed(&module, registered_hooks, format!("panicked: {}", message))
        }
    }
}
