// src/config/validate.rs

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use regex::Regex;

use crate::config::model::{BuildConfig, ConfigFile, ModuleConfig, RawConfigFile};
use crate::errors::{BuildgateError, Result};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = BuildgateError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        let src = require_dir(raw.config.src.as_deref(), "src")?;
        let dest = require_dir(raw.config.dest.as_deref(), "dest")?;
        let modules = ensure_has_modules(raw.modules.as_ref())?;
        let artifact_pattern = compile_artifact_pattern(&raw.config.artifact_pattern)?;
        validate_optimizer(&raw)?;

        let modules = modules
            .iter()
            .map(|(name, module)| {
                let resolved = resolve_module(name, module, &raw.defaults, &src, &dest);
                (name.clone(), resolved)
            })
            .collect();

        Ok(ConfigFile {
            src,
            dest,
            build: raw.config.build,
            once: raw.config.once,
            debug: raw.config.debug,
            rewatch: raw.config.rewatch,
            artifact_pattern,
            optimizer: raw.config.optimizer,
            modules,
        })
    }
}

fn require_dir(value: Option<&Path>, option: &str) -> Result<PathBuf> {
    match value {
        Some(path) if !path.as_os_str().is_empty() => Ok(path.to_path_buf()),
        _ => Err(BuildgateError::ConfigError(format!(
            "you must specify a `{option}` directory in [config]"
        ))),
    }
}

fn ensure_has_modules(
    modules: Option<&BTreeMap<String, ModuleConfig>>,
) -> Result<&BTreeMap<String, ModuleConfig>> {
    match modules {
        Some(modules) if !modules.is_empty() => Ok(modules),
        _ => Err(BuildgateError::ConfigError(
            "you must specify at least one module in [modules]".to_string(),
        )),
    }
}

fn compile_artifact_pattern(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| {
        BuildgateError::ConfigError(format!(
            "[config].artifact_pattern is not a valid regex ({pattern}): {e}"
        ))
    })
}

fn validate_optimizer(raw: &RawConfigFile) -> Result<()> {
    let needs_optimizer = raw.config.build || raw.config.once;
    if needs_optimizer && raw.config.optimizer.is_empty() {
        return Err(BuildgateError::ConfigError(
            "[config].optimizer must name a command when `build` or `once` is enabled"
                .to_string(),
        ));
    }
    Ok(())
}

fn resolve_module(
    name: &str,
    module: &ModuleConfig,
    defaults: &ModuleConfig,
    src: &Path,
    dest: &Path,
) -> BuildConfig {
    let merged = module.merged_with(defaults);
    let relative = name.trim_start_matches('/');

    BuildConfig {
        name: name.to_string(),
        entry: merged
            .entry
            .unwrap_or_else(|| default_entry(relative)),
        source: src.join(relative),
        out: dest.join(relative),
        base_url: merged.base_url,
        options: merged.options,
    }
}

/// `js/app.js` -> `js/app`.
fn default_entry(relative: &str) -> String {
    let path = Path::new(relative);
    path.with_extension("")
        .to_string_lossy()
        .replace('\\', "/")
}
