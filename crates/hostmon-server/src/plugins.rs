use anyhow::{Context, Result};
use hostmon_common::types::{merge_namespaced, Metrics};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;

/// Hard ceiling on a single plugin run. Well under the fetcher's metric
/// timeout so one slow plugin cannot eat the whole transaction budget.
const PLUGIN_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Serialize)]
pub struct PluginInfo {
    pub id: String,
    pub path: PathBuf,
}

/// Executable metric plugins discovered in the plugin directory. A plugin
/// prints one JSON object in the metric output contract on stdout and
/// exits; its metrics are namespaced under the file stem.
pub struct PluginRegistry {
    plugins: Vec<PluginInfo>,
}

impl PluginRegistry {
    /// Scan `dir` for executable regular files. No directory, or an
    /// unreadable one, yields an empty registry.
    pub fn scan(dir: Option<&Path>) -> Self {
        let mut plugins = Vec::new();
        if let Some(dir) = dir {
            match std::fs::read_dir(dir) {
                Ok(entries) => {
                    for entry in entries.flatten() {
                        let path = entry.path();
                        if !path.is_file() || !is_executable(&path) {
                            continue;
                        }
                        let Some(id) = path.file_stem().and_then(|s| s.to_str()) else {
                            continue;
                        };
                        plugins.push(PluginInfo {
                            id: id.to_string(),
                            path,
                        });
                    }
                }
                Err(e) => {
                    tracing::warn!(dir = %dir.display(), error = %e, "plugin directory not readable");
                }
            }
        }
        plugins.sort_by(|a, b| a.id.cmp(&b.id));
        tracing::info!(count = plugins.len(), "plugins discovered");
        Self { plugins }
    }

    pub fn inventory(&self) -> &[PluginInfo] {
        &self.plugins
    }

    pub fn get(&self, id: &str) -> Option<&PluginInfo> {
        self.plugins.iter().find(|p| p.id == id)
    }

    /// Run one plugin to completion and parse its stdout.
    pub async fn run(&self, plugin: &PluginInfo) -> Result<Metrics> {
        let child = Command::new(&plugin.path)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("spawning plugin {}", plugin.id))?;

        let output = timeout(PLUGIN_TIMEOUT, child.wait_with_output())
            .await
            .with_context(|| format!("plugin {} timed out", plugin.id))?
            .with_context(|| format!("running plugin {}", plugin.id))?;

        if !output.status.success() {
            anyhow::bail!(
                "plugin {} exited with {}: {}",
                plugin.id,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        serde_json::from_slice(&output.stdout)
            .with_context(|| format!("parsing plugin {} output", plugin.id))
    }

    /// Run every plugin, namespacing results by plugin id. A failing plugin
    /// logs a warning and contributes nothing.
    pub async fn run_all(&self) -> Metrics {
        let mut all = Metrics::new();
        for plugin in &self.plugins {
            match self.run(plugin).await {
                Ok(metrics) => merge_namespaced(&mut all, &plugin.id, metrics),
                Err(e) => tracing::warn!(plugin = %plugin.id, error = %e, "plugin run failed"),
            }
        }
        all
    }
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|m| m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(_path: &Path) -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_directory_yields_empty_registry() {
        let registry = PluginRegistry::scan(Some(Path::new("/nonexistent/plugins")));
        assert!(registry.inventory().is_empty());
    }

    #[test]
    fn no_directory_yields_empty_registry() {
        let registry = PluginRegistry::scan(None);
        assert!(registry.inventory().is_empty());
        assert!(registry.get("anything").is_none());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn executable_plugin_is_discovered_and_run() {
        use std::io::Write as _;
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("probe.sh");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "#!/bin/sh").unwrap();
        writeln!(file, "echo '{{\"checks\":{{\"_type\":\"L\",\"_value\":3}}}}'").unwrap();
        drop(file);
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();

        // a non-executable neighbor is ignored
        std::fs::write(dir.path().join("notes.txt"), "not a plugin").unwrap();
        std::fs::set_permissions(
            dir.path().join("notes.txt"),
            std::fs::Permissions::from_mode(0o644),
        )
        .unwrap();

        let registry = PluginRegistry::scan(Some(dir.path()));
        assert_eq!(registry.inventory().len(), 1);
        assert_eq!(registry.inventory()[0].id, "probe");

        let all = registry.run_all().await;
        assert_eq!(
            all.get("probe.checks"),
            Some(&hostmon_common::types::Metric::uint64(3))
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failing_plugin_contributes_nothing() {
        use std::io::Write as _;
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.sh");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "#!/bin/sh").unwrap();
        writeln!(file, "exit 1").unwrap();
        drop(file);
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();

        let registry = PluginRegistry::scan(Some(dir.path()));
        let all = registry.run_all().await;
        assert!(all.is_empty());
    }
}
