#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::PathBuf;

use buildgate::config::{ConfigFile, ConfigSection, ModuleConfig, RawConfigFile};

/// Builder for `ConfigFile` to simplify test setup.
///
/// Starts from `src = "/src"`, `dest = "/dest"` and no modules.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                config: ConfigSection {
                    src: Some(PathBuf::from("/src")),
                    dest: Some(PathBuf::from("/dest")),
                    ..ConfigSection::default()
                },
                defaults: ModuleConfig::default(),
                modules: Some(BTreeMap::new()),
            },
        }
    }

    pub fn src(mut self, src: impl Into<PathBuf>) -> Self {
        self.config.config.src = Some(src.into());
        self
    }

    pub fn dest(mut self, dest: impl Into<PathBuf>) -> Self {
        self.config.config.dest = Some(dest.into());
        self
    }

    /// Bundle through an optimizer (a placeholder command is set).
    pub fn bundle(mut self) -> Self {
        self.config.config.build = true;
        if self.config.config.optimizer.is_empty() {
            self.config.config.optimizer = vec!["optimizer".to_string()];
        }
        self
    }

    pub fn once(mut self) -> Self {
        self.config.config.once = true;
        if self.config.config.optimizer.is_empty() {
            self.config.config.optimizer = vec!["optimizer".to_string()];
        }
        self
    }

    pub fn debug(mut self, val: bool) -> Self {
        self.config.config.debug = val;
        self
    }

    pub fn rewatch(mut self, val: bool) -> Self {
        self.config.config.rewatch = val;
        self
    }

    pub fn artifact_pattern(mut self, pattern: &str) -> Self {
        self.config.config.artifact_pattern = pattern.to_string();
        self
    }

    pub fn optimizer(mut self, command: &[&str]) -> Self {
        self.config.config.optimizer = command.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_defaults(mut self, defaults: ModuleConfig) -> Self {
        self.config.defaults = defaults;
        self
    }

    pub fn with_module(mut self, name: &str, module: ModuleConfig) -> Self {
        self.config
            .modules
            .get_or_insert_with(BTreeMap::new)
            .insert(name.to_string(), module);
        self
    }

    /// The unvalidated config, for tests that expect validation to fail.
    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `ModuleConfig`.
pub struct ModuleConfigBuilder {
    module: ModuleConfig,
}

impl ModuleConfigBuilder {
    pub fn new() -> Self {
        Self {
            module: ModuleConfig::default(),
        }
    }

    pub fn entry(mut self, entry: &str) -> Self {
        self.module.entry = Some(entry.to_string());
        self
    }

    pub fn base_url(mut self, base_url: impl Into<PathBuf>) -> Self {
        self.module.base_url = Some(base_url.into());
        self
    }

    pub fn option(mut self, key: &str, value: impl Into<toml::Value>) -> Self {
        self.module.options.insert(key.to_string(), value.into());
        self
    }

    pub fn build(self) -> ModuleConfig {
        self.module
    }
}

impl Default for ModuleConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
