// soong: The module graph engine of the Android platform build.
// Copyright (C) 2024 International Digital Economy Academy
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.
//
// For inquiries, you can contact us via e-mail at jichuruanjian@idea.edu.cn.

//! Product configuration and the per-build runtime configuration.
//!
//! [`ProductVariables`] mirrors the `soong.variables` file written by the
//! product configuration step. [`Config`] wraps it together with the
//! directories of this build and the build-wide [`OncePer`] cache.

use std::{
    collections::BTreeSet,
    path::{Path, PathBuf},
};

use anyhow::Context;
use log::debug;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    arch::{ArchError, ArchType, OsType, Target},
    configured_jars::{ConfiguredJarError, ConfiguredJarList},
    once::OncePer,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid target configuration")]
    Arch(#[from] ArchError),

    #[error("invalid jar configuration")]
    Jars(#[from] ConfiguredJarError),
}

/// Product variables, deserialized from PascalCase JSON.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ProductVariables {
    pub device_name: Option<String>,
    pub device_arch: Option<String>,
    pub device_secondary_arch: Option<String>,
    pub host_arch: Option<String>,
    pub host_secondary_arch: Option<String>,

    pub vendor_path: Option<String>,
    pub odm_path: Option<String>,
    pub product_path: Option<String>,
    pub system_ext_path: Option<String>,

    pub board_uses_recovery_as_boot: bool,
    pub board_move_recovery_resources_to_vendor_boot: bool,

    pub boot_jars: ConfiguredJarList,
    pub apex_boot_jars: ConfiguredJarList,
    pub configured_jar_location_overrides: Vec<String>,

    pub namespaces_to_export: Vec<String>,

    #[serde(rename = "Allow_missing_dependencies")]
    pub allow_missing_dependencies: bool,
    #[serde(rename = "Make_suffix")]
    pub make_suffix: Option<String>,
    pub eng: bool,
}

/// Runtime switches that do not come from the product configuration.
#[derive(Debug, Clone, Default)]
pub struct ConfigOptions {
    pub src_dir: PathBuf,
    /// Output root, relative to `src_dir`. Defaults to `out`.
    pub out_dir: Option<String>,
    /// When set, source existence checks consult this set instead of the
    /// file system.
    pub mock_fs: Option<BTreeSet<String>>,
    /// Keep generated file contents in memory instead of writing them.
    pub capture_build: bool,
    pub kati_enabled: bool,
}

pub struct Config {
    variables: ProductVariables,
    options: ConfigOptions,
    out_dir: String,
    soong_out_dir: String,
    device_targets: Vec<Target>,
    host_targets: Vec<Target>,
    boot_jars: ConfiguredJarList,
    apex_boot_jars: ConfiguredJarList,
    once: OncePer,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("device", &self.device_name())
            .field("device_targets", &self.device_targets)
            .field("host_targets", &self.host_targets)
            .finish_non_exhaustive()
    }
}

fn parse_arches(
    primary: Option<&str>,
    secondary: Option<&str>,
) -> Result<Vec<ArchType>, ArchError> {
    [primary, secondary]
        .into_iter()
        .flatten()
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<ArchType>())
        .collect()
}

impl Config {
    pub fn new(variables: ProductVariables, options: ConfigOptions) -> Result<Self, ConfigError> {
        let device_targets = parse_arches(
            variables.device_arch.as_deref(),
            variables.device_secondary_arch.as_deref(),
        )?
        .into_iter()
        .map(|a| Target::new(OsType::Android, a))
        .collect();
        let host_targets = parse_arches(
            Some(variables.host_arch.as_deref().unwrap_or("x86_64")),
            variables.host_secondary_arch.as_deref(),
        )?
        .into_iter()
        .map(|a| Target::new(OsType::LinuxGlibc, a))
        .collect();

        let overrides = &variables.configured_jar_location_overrides;
        let boot_jars = variables.boot_jars.apply_location_overrides(overrides)?;
        let apex_boot_jars = variables.apex_boot_jars.apply_location_overrides(overrides)?;

        let out_dir = options.out_dir.clone().unwrap_or_else(|| "out".to_string());
        let soong_out_dir = format!("{out_dir}/soong");
        debug!("configured device {:?}", variables.device_name);

        Ok(Config {
            variables,
            options,
            out_dir,
            soong_out_dir,
            device_targets,
            host_targets,
            boot_jars,
            apex_boot_jars,
            once: OncePer::new(),
        })
    }

    /// Reads product variables from a `soong.variables` JSON file.
    pub fn from_variables_file(path: &Path, options: ConfigOptions) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let variables: ProductVariables = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        Ok(Self::new(variables, options)?)
    }

    /// A configuration for tests: an arm64 + arm device named `test_device`,
    /// a mock file system holding `files`, and captured generated files.
    pub fn for_test<S: AsRef<str>>(variables: ProductVariables, files: &[S]) -> Self {
        let mut variables = variables;
        variables.device_name.get_or_insert_with(|| "test_device".to_string());
        variables.device_arch.get_or_insert_with(|| "arm64".to_string());
        variables
            .device_secondary_arch
            .get_or_insert_with(|| "arm".to_string());
        let options = ConfigOptions {
            src_dir: PathBuf::from("."),
            out_dir: None,
            mock_fs: Some(files.iter().map(|f| f.as_ref().to_string()).collect()),
            capture_build: true,
            kati_enabled: false,
        };
        match Self::new(variables, options) {
            Ok(c) => c,
            Err(e) => panic!("invalid test configuration: {e}"),
        }
    }

    pub fn variables(&self) -> &ProductVariables {
        &self.variables
    }

    pub fn once(&self) -> &OncePer {
        &self.once
    }

    pub fn src_dir(&self) -> &Path {
        &self.options.src_dir
    }

    /// `out`, relative to the source root.
    pub fn out_dir(&self) -> &str {
        &self.out_dir
    }

    /// `out/soong`, relative to the source root.
    pub fn soong_out_dir(&self) -> &str {
        &self.soong_out_dir
    }

    pub fn device_name(&self) -> &str {
        self.variables.device_name.as_deref().unwrap_or("generic")
    }

    pub fn device_targets(&self) -> &[Target] {
        &self.device_targets
    }

    pub fn host_targets(&self) -> &[Target] {
        &self.host_targets
    }

    pub fn vendor_path(&self) -> &str {
        self.variables.vendor_path.as_deref().unwrap_or("vendor")
    }

    pub fn odm_path(&self) -> &str {
        self.variables.odm_path.as_deref().unwrap_or("odm")
    }

    pub fn product_path(&self) -> &str {
        self.variables.product_path.as_deref().unwrap_or("product")
    }

    pub fn system_ext_path(&self) -> &str {
        self.variables.system_ext_path.as_deref().unwrap_or("system_ext")
    }

    pub fn board_uses_recovery_as_boot(&self) -> bool {
        self.variables.board_uses_recovery_as_boot
    }

    pub fn board_move_recovery_resources_to_vendor_boot(&self) -> bool {
        self.variables.board_move_recovery_resources_to_vendor_boot
    }

    /// Platform boot jars with location overrides applied.
    pub fn boot_jars(&self) -> &ConfiguredJarList {
        &self.boot_jars
    }

    pub fn apex_boot_jars(&self) -> &ConfiguredJarList {
        &self.apex_boot_jars
    }

    pub fn exported_namespaces(&self) -> &[String] {
        &self.variables.namespaces_to_export
    }

    pub fn allow_missing_dependencies(&self) -> bool {
        self.variables.allow_missing_dependencies
    }

    pub fn make_suffix(&self) -> &str {
        self.variables.make_suffix.as_deref().unwrap_or("")
    }

    pub fn kati_enabled(&self) -> bool {
        self.options.kati_enabled
    }

    /// Turns the Kati stage on or off, for tests of Make-facing output.
    pub fn with_kati_enabled(mut self, enabled: bool) -> Self {
        self.options.kati_enabled = enabled;
        self
    }

    pub fn capture_build(&self) -> bool {
        self.options.capture_build
    }

    /// Whether the source file `rel` exists.
    pub fn source_exists(&self, rel: &str) -> bool {
        match &self.options.mock_fs {
            Some(files) => {
                files.contains(rel)
                    || files
                        .range(format!("{rel}/")..)
                        .next()
                        .is_some_and(|f| f.starts_with(&format!("{rel}/")))
            }
            None => self.options.src_dir.join(rel).exists(),
        }
    }

    /// Absolute or cwd-relative location of a path below the source root.
    pub fn abs(&self, rel: &str) -> PathBuf {
        self.options.src_dir.join(rel)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod test {
    use super::*;
    use test_log::test;

    #[test]
    fn parses_soong_variables() {
        let json = r#"{
            "DeviceName": "flounder",
            "DeviceArch": "arm64",
            "DeviceSecondaryArch": "arm",
            "BootJars": ["platform:framework", "com.android.art:core-oj"],
            "ConfiguredJarLocationOverrides": ["platform:framework:system_ext:framework"],
            "NamespacesToExport": ["vendor/acme"],
            "Allow_missing_dependencies": true
        }"#;
        let vars: ProductVariables = serde_json::from_str(json).unwrap();
        let config = Config::new(vars, ConfigOptions::default()).unwrap();
        assert_eq!(config.device_name(), "flounder");
        assert_eq!(
            config.device_targets(),
            &[
                Target::new(OsType::Android, ArchType::Arm64),
                Target::new(OsType::Android, ArchType::Arm)
            ]
        );
        assert_eq!(
            config.host_targets(),
            &[Target::new(OsType::LinuxGlibc, ArchType::X86_64)]
        );
        assert_eq!(
            config.boot_jars().to_string(),
            "system_ext:framework,com.android.art:core-oj"
        );
        assert!(config.allow_missing_dependencies());
        assert_eq!(config.soong_out_dir(), "out/soong");
    }

    #[test]
    fn rejects_unknown_arch() {
        let vars = ProductVariables {
            device_arch: Some("sparc".into()),
            ..Default::default()
        };
        assert!(Config::new(vars, ConfigOptions::default()).is_err());
    }

    #[test]
    fn mock_fs_knows_files_and_dirs() {
        let config = Config::for_test(ProductVariables::default(), &["a/b/c.txt", "d.txt"]);
        assert!(config.source_exists("a/b/c.txt"));
        assert!(config.source_exists("a/b"));
        assert!(config.source_exists("d.txt"));
        assert!(!config.source_exists("a/c"));
        assert!(!config.source_exists("a/b/c"));
    }
}
