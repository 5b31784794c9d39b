// src/config/model.rs

use std::collections::BTreeMap;
use std::path::PathBuf;

use regex::Regex;
use serde::Deserialize;

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [config]
/// src = "public"
/// dest = "build"
/// build = true
/// optimizer = ["node", "r.js", "-o"]
///
/// [defaults]
/// base_url = "public/js"
///
/// [modules."/js/app.js"]
/// entry = "app"
/// ```
///
/// Everything is optional at the serde level; required options are checked
/// by the `TryFrom<RawConfigFile>` conversion so the error names the option.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawConfigFile {
    /// Global behaviour from `[config]`.
    #[serde(default)]
    pub config: ConfigSection,

    /// Partial build config merged into every module, from `[defaults]`.
    #[serde(default)]
    pub defaults: ModuleConfig,

    /// All modules from `[modules."<request path>"]`.
    ///
    /// `None` when the section is absent, so the validator can tell a missing
    /// table from an empty one.
    #[serde(default)]
    pub modules: Option<BTreeMap<String, ModuleConfig>>,
}

/// `[config]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigSection {
    /// Source tree the modules are built from. Required.
    #[serde(default)]
    pub src: Option<PathBuf>,

    /// Destination tree artifacts are written into. Required.
    #[serde(default)]
    pub dest: Option<PathBuf>,

    /// Bundle through the optimizer (`true`) or plain-copy the requested
    /// source file (`false`).
    #[serde(default)]
    pub build: bool,

    /// Compile every module once on the first artifact request and never
    /// again.
    #[serde(default)]
    pub once: bool,

    /// Diagnostic logging.
    #[serde(default)]
    pub debug: bool,

    /// Re-register a module's watch whenever a rebuild reports a different
    /// dependency set. `false` keeps the first registration forever.
    #[serde(default = "default_rewatch")]
    pub rewatch: bool,

    /// Regex deciding which request paths count as artifacts (once mode).
    #[serde(default = "default_artifact_pattern")]
    pub artifact_pattern: String,

    /// Optimizer command line; the module's build arguments are appended.
    #[serde(default)]
    pub optimizer: Vec<String>,
}

fn default_rewatch() -> bool {
    true
}

fn default_artifact_pattern() -> String {
    r"\.js$".to_string()
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            src: None,
            dest: None,
            build: false,
            once: false,
            debug: false,
            rewatch: default_rewatch(),
            artifact_pattern: default_artifact_pattern(),
            optimizer: Vec::new(),
        }
    }
}

/// Build configuration for one module, or the partial `[defaults]` merged
/// into each of them.
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
pub struct ModuleConfig {
    /// Source entry point handed to the optimizer as `name`.
    #[serde(default)]
    pub entry: Option<String>,

    /// Base directory the optimizer resolves module ids against.
    #[serde(default)]
    pub base_url: Option<PathBuf>,

    /// Optimizer-specific options, passed through as `key=value` arguments.
    #[serde(default)]
    pub options: toml::Table,
}

impl ModuleConfig {
    /// Deep-merge `defaults` underneath `self`: values set on the module win,
    /// nested option tables are merged key by key.
    pub fn merged_with(&self, defaults: &ModuleConfig) -> ModuleConfig {
        let mut options = defaults.options.clone();
        merge_tables(&mut options, &self.options);

        ModuleConfig {
            entry: self.entry.clone().or_else(|| defaults.entry.clone()),
            base_url: self.base_url.clone().or_else(|| defaults.base_url.clone()),
            options,
        }
    }
}

fn merge_tables(base: &mut toml::Table, overlay: &toml::Table) {
    for (key, value) in overlay {
        match (base.get_mut(key), value) {
            (Some(toml::Value::Table(existing)), toml::Value::Table(incoming)) => {
                merge_tables(existing, incoming);
            }
            _ => {
                base.insert(key.clone(), value.clone());
            }
        }
    }
}

/// Fully resolved build configuration handed to a [`Builder`](crate::build::Builder).
///
/// Read-only to the core once constructed.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildConfig {
    /// Module name: the request path it is served under.
    pub name: String,
    /// Optimizer entry point.
    pub entry: String,
    /// Where the requested source lives (`src` + name).
    pub source: PathBuf,
    /// Where the artifact is written (`dest` + name).
    pub out: PathBuf,
    pub base_url: Option<PathBuf>,
    pub options: toml::Table,
}

/// Validated configuration.
///
/// Only constructible through `TryFrom<RawConfigFile>`, so holding one means
/// the required options were present.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub src: PathBuf,
    pub dest: PathBuf,
    pub build: bool,
    pub once: bool,
    pub debug: bool,
    pub rewatch: bool,
    pub artifact_pattern: Regex,
    pub optimizer: Vec<String>,
    pub modules: BTreeMap<String, BuildConfig>,
}

impl ConfigFile {
    /// Look up a module by its request path.
    pub fn module(&self, name: &str) -> Option<&BuildConfig> {
        self.modules.get(name)
    }
}
