//! Installation layout
//!
//! Breeze keeps its extensions under `<root>/extensions/`. The root is found
//! the same way every start:
//! - inside a managed server layout (`../state`, `../server`, `../extra` and
//!   `../config` all present) it is `../extra/breeze/`
//! - otherwise, when allowed, `./extra/breeze/` under the working directory
//! - otherwise Breeze is not installed and runs with the default handler only

use crate::config::InstallConfig;
use breeze_core::Result;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const MANAGED_MARKERS: [&str; 4] = ["state", "server", "extra", "config"];

const README_STUB: &str = "\
# Breeze extensions

Every `*.yaml` file in this directory binds a plugin compiled into the host.
Files starting with `_` or `.` are ignored.

- `handler.yaml` replaces the default chat handler:

      handler: <registered handler name>
      settings: {}

- any other `*.yaml` file loads an extension:

      on_load: <registered extension name>
      settings: {}

If the custom handler fails on a message, Breeze answers with the default
handler instead. Extensions can observe messages but cannot change verdicts.
";

const HANDLER_STUB: &str = "\
# Rename to handler.yaml to replace the default handler.
handler: strict
settings: {}
";

const EXTENSION_STUB: &str = "\
# Copy to <name>.yaml to load an extension.
on_load: chat-log
settings:
  prefix: \"[chat]\"
";

/// How the installation root was found
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallSource {
    /// `../extra/breeze/` in a managed server layout
    Managed,
    /// `./extra/breeze/` under the working directory
    WorkingDirectory,
    /// Set in configuration or on the command line
    Explicit,
}

/// A resolved installation root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Installation {
    root: PathBuf,
    source: InstallSource,
}

impl Installation {
    /// Use an explicit root
    pub fn at(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            source: InstallSource::Explicit,
        }
    }

    /// Resolve the root from the process working directory
    pub fn detect(config: &InstallConfig) -> Option<Self> {
        let cwd = match std::env::current_dir() {
            Ok(cwd) => cwd,
            Err(e) => {
                warn!(error = %e, "Cannot read the working directory");
                return None;
            }
        };
        Self::detect_in(&cwd, dirs::home_dir().as_deref(), config)
    }

    /// Resolve the root relative to `cwd`
    pub fn detect_in(cwd: &Path, home: Option<&Path>, config: &InstallConfig) -> Option<Self> {
        if let Some(root) = &config.root {
            return Some(Self::at(root.clone()));
        }

        if let Some(parent) = cwd.parent() {
            if is_managed_layout(parent) {
                return Some(Self {
                    root: parent.join("extra").join("breeze"),
                    source: InstallSource::Managed,
                });
            }
        }

        if config.use_cwd_for_extra {
            if home == Some(cwd) {
                warn!(
                    cwd = %cwd.display(),
                    "Running from the home directory; not creating extra/breeze/ here. \
                     Run from a different directory to use extensions"
                );
                return None;
            }
            return Some(Self {
                root: cwd.join("extra").join("breeze"),
                source: InstallSource::WorkingDirectory,
            });
        }

        None
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn source(&self) -> InstallSource {
        self.source
    }

    pub fn extensions_dir(&self) -> PathBuf {
        self.root.join("extensions")
    }

    /// Create the extensions directory and write the advisory stubs that are missing
    pub fn prepare(&self) -> Result<()> {
        let dir = self.extensions_dir();
        std::fs::create_dir_all(&dir)?;

        for (name, content) in [
            ("_README.md", README_STUB),
            ("_handler.example.yaml", HANDLER_STUB),
            ("_extension.example.yaml", EXTENSION_STUB),
        ] {
            let path = dir.join(name);
            if !path.exists() {
                std::fs::write(&path, content)?;
            }
        }

        info!(root = %self.root.display(), source = ?self.source, "Breeze installation ready");
        Ok(())
    }
}

/// Whether `dir` looks like the root of a managed server layout
pub fn is_managed_layout(dir: &Path) -> bool {
    MANAGED_MARKERS.iter().all(|marker| dir.join(marker).is_dir())
}
