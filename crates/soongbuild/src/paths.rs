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

//! The three path roles of the build: sources, intermediate outputs and
//! installed files. Only output and install paths may be written by build
//! statements.

use std::fmt;

use soongutil::{
    arch::{ArchType, OsClass, OsType, Target},
    config::Config,
    path::{PathError, validate_path},
};

use crate::module::{CommonProperties, ImageVariation};

/// A path below the source root.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourcePath(String);

impl SourcePath {
    pub(crate) fn new_unchecked(path: String) -> Self {
        SourcePath(path)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SourcePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A path a build statement may write.
pub trait WritablePath: fmt::Display {
    fn as_str(&self) -> &str;
}

/// A path below `out/soong`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OutputPath(String);

impl OutputPath {
    pub fn join(&self, components: &[&str]) -> Result<OutputPath, PathError> {
        let rel = validate_path(components)?;
        Ok(OutputPath(format!("{}/{rel}", self.0)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl WritablePath for OutputPath {
    fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OutputPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Returns `out/soong/<components>`.
pub fn path_for_output(config: &Config, components: &[&str]) -> Result<OutputPath, PathError> {
    let rel = validate_path(components)?;
    Ok(OutputPath(format!("{}/{rel}", config.soong_out_dir())))
}

/// Returns the intermediates directory of a module variant,
/// `out/soong/.intermediates/<dir>/<name>/<subdir>`.
pub fn path_for_module_out(
    config: &Config,
    module_dir: &str,
    name: &str,
    subdir: &str,
) -> Result<OutputPath, PathError> {
    path_for_output(config, &[".intermediates", module_dir, name, subdir])
}

/// An installed file, rooted at a partition directory.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstallPath {
    /// `out/soong` for Soong installs, `out` for Make installs.
    root: String,
    /// E.g. `target/product/<device>/system`.
    partition_dir: String,
    partition: String,
    /// Path below the partition directory.
    rel: String,
    full: String,
}

impl InstallPath {
    fn new(root: String, partition_dir: String, partition: String, rel: String) -> Self {
        let full = soongutil::path::join(&[&root, &partition_dir, &rel]);
        InstallPath {
            root,
            partition_dir,
            partition,
            rel,
            full,
        }
    }

    pub fn join(&self, components: &[&str]) -> Result<InstallPath, PathError> {
        let extra = validate_path(components)?;
        let rel = soongutil::path::join(&[&self.rel, &extra]);
        let rel = if rel == "." { String::new() } else { rel };
        Ok(InstallPath::new(
            self.root.clone(),
            self.partition_dir.clone(),
            self.partition.clone(),
            rel,
        ))
    }

    /// The same location in Make's install tree, below `out` instead of
    /// `out/soong`.
    pub fn to_make_path(&self, config: &Config) -> InstallPath {
        InstallPath::new(
            config.out_dir().to_string(),
            self.partition_dir.clone(),
            self.partition.clone(),
            self.rel.clone(),
        )
    }

    pub fn partition(&self) -> &str {
        &self.partition
    }

    pub fn partition_dir(&self) -> String {
        soongutil::path::join(&[&self.root, &self.partition_dir])
    }

    /// The path relative to the partition directory.
    pub fn rel(&self) -> &str {
        &self.rel
    }

    pub fn as_str(&self) -> &str {
        &self.full
    }
}

impl WritablePath for InstallPath {
    fn as_str(&self) -> &str {
        &self.full
    }
}

impl fmt::Display for InstallPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full)
    }
}

/// Install location switches a module type may turn on.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct InstallOptions {
    pub in_data: bool,
    pub in_testcases: bool,
    pub in_sanitizer_dir: bool,
    pub in_root: bool,
    pub debug: bool,
}

/// Selects the partition a module variant installs into.
pub fn module_partition(
    config: &Config,
    os: OsType,
    opts: InstallOptions,
    image: ImageVariation,
    common: &CommonProperties,
) -> String {
    if opts.in_testcases {
        return "testcases".to_string();
    }
    if os.class() != OsClass::Device {
        return String::new();
    }
    let mut partition = if opts.in_data {
        "data".to_string()
    } else {
        match image {
            ImageVariation::Ramdisk => {
                let mut p = if config.board_uses_recovery_as_boot() {
                    "recovery/root/first_stage_ramdisk".to_string()
                } else {
                    "ramdisk".to_string()
                };
                if !opts.in_root {
                    p.push_str("/system");
                }
                p
            }
            ImageVariation::VendorRamdisk => {
                let mut p = if config.board_move_recovery_resources_to_vendor_boot() {
                    "vendor-ramdisk/first_stage_ramdisk".to_string()
                } else {
                    "vendor-ramdisk".to_string()
                };
                if !opts.in_root {
                    p.push_str("/system");
                }
                p
            }
            ImageVariation::DebugRamdisk => "debug_ramdisk".to_string(),
            ImageVariation::Recovery => {
                if opts.in_root {
                    "recovery/root".to_string()
                } else {
                    "recovery/root/system".to_string()
                }
            }
            ImageVariation::Core => {
                if common.soc_specific() {
                    config.vendor_path().to_string()
                } else if common.device_specific {
                    config.odm_path().to_string()
                } else if common.product_specific {
                    config.product_path().to_string()
                } else if common.system_ext_specific {
                    config.system_ext_path().to_string()
                } else if opts.in_root {
                    "root".to_string()
                } else {
                    "system".to_string()
                }
            }
        }
    };
    if opts.in_sanitizer_dir {
        partition = format!("data/asan/{partition}");
    }
    partition
}

/// Builds an install path for `target` below the given partition.
pub fn path_for_install(
    config: &Config,
    target: Target,
    partition: &str,
    debug: bool,
    components: &[&str],
) -> Result<InstallPath, PathError> {
    let mut partition_paths: Vec<String> = match target.os.class() {
        OsClass::Device => vec![
            "target".into(),
            "product".into(),
            config.device_name().into(),
            partition.into(),
        ],
        OsClass::Host => {
            let arch = match target.arch {
                ArchType::X86_64 | ArchType::Common => "x86",
                other => other.name(),
            };
            vec![
                "host".into(),
                format!("{}-{arch}", target.os.host_dir_name()),
                partition.into(),
            ]
        }
    };
    if debug {
        partition_paths.insert(0, "debug".into());
    }
    let parts: Vec<&str> = partition_paths.iter().map(String::as_str).collect();
    let partition_dir = validate_path(&parts)?;
    let base = InstallPath::new(
        config.soong_out_dir().to_string(),
        partition_dir,
        partition.to_string(),
        String::new(),
    );
    base.join(components)
}

/// Location of a host tool built by Soong.
pub fn host_tool_path(config: &Config, tool: &str) -> Result<OutputPath, PathError> {
    path_for_output(config, &["host", "linux-x86", "bin", tool])
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod test {
    use soongutil::config::ProductVariables;

    use super::*;
    use test_log::test;

    fn config() -> Config {
        Config::for_test(
            ProductVariables {
                vendor_path: Some("vendor".into()),
                ..Default::default()
            },
            &[] as &[&str],
        )
    }

    fn partition(image: ImageVariation, common: CommonProperties, opts: InstallOptions) -> String {
        module_partition(&config(), OsType::Android, opts, image, &common)
    }

    #[test]
    fn partitions() {
        let none = CommonProperties::default();
        let opts = InstallOptions::default();
        assert_eq!(partition(ImageVariation::Core, none.clone(), opts), "system");
        assert_eq!(partition(ImageVariation::Ramdisk, none.clone(), opts), "ramdisk/system");
        assert_eq!(
            partition(ImageVariation::VendorRamdisk, none.clone(), opts),
            "vendor-ramdisk/system"
        );
        assert_eq!(partition(ImageVariation::Recovery, none.clone(), opts), "recovery/root/system");
        let root = InstallOptions {
            in_root: true,
            ..opts
        };
        assert_eq!(partition(ImageVariation::Recovery, none.clone(), root), "recovery/root");
        assert_eq!(partition(ImageVariation::Core, none.clone(), root), "root");
        let vendor = CommonProperties {
            vendor: true,
            ..Default::default()
        };
        assert_eq!(partition(ImageVariation::Core, vendor, opts), "vendor");
        let asan = InstallOptions {
            in_sanitizer_dir: true,
            ..opts
        };
        assert_eq!(partition(ImageVariation::Core, none.clone(), asan), "data/asan/system");
        let tests = InstallOptions {
            in_testcases: true,
            ..opts
        };
        assert_eq!(
            module_partition(&config(), OsType::LinuxGlibc, tests, ImageVariation::Core, &none),
            "testcases"
        );
    }

    #[test]
    fn install_paths() {
        let config = config();
        let device = Target::new(OsType::Android, ArchType::Arm64);
        let p = path_for_install(&config, device, "system", false, &["etc", "foo.conf"]).unwrap();
        assert_eq!(p.as_str(), "out/soong/target/product/test_device/system/etc/foo.conf");
        assert_eq!(p.rel(), "etc/foo.conf");
        assert_eq!(p.partition_dir(), "out/soong/target/product/test_device/system");
        assert_eq!(
            p.to_make_path(&config).as_str(),
            "out/target/product/test_device/system/etc/foo.conf"
        );

        let host = Target::new(OsType::LinuxGlibc, ArchType::X86_64);
        let p = path_for_install(&config, host, "", false, &["bin", "tool"]).unwrap();
        assert_eq!(p.as_str(), "out/soong/host/linux-x86/bin/tool");

        let p = path_for_install(&config, device, "system", true, &["x"]).unwrap();
        assert_eq!(p.as_str(), "out/soong/debug/target/product/test_device/system/x");

        assert!(path_for_install(&config, device, "system", false, &["..", "..", "x"]).is_err());
    }

    #[test]
    fn module_out() {
        let config = config();
        let p = path_for_module_out(&config, "a/b", "foo", "android_arm64").unwrap();
        assert_eq!(p.as_str(), "out/soong/.intermediates/a/b/foo/android_arm64");
        assert_eq!(
            p.join(&["gen", "x.txt"]).unwrap().as_str(),
            "out/soong/.intermediates/a/b/foo/android_arm64/gen/x.txt"
        );
    }
}
