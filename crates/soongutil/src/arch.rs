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

//! Operating systems, architectures and the targets built from them.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ArchError {
    #[error("unknown arch {0:?}")]
    UnknownArch(String),

    #[error("unknown os {0:?}")]
    UnknownOs(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OsClass {
    Device,
    Host,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OsType {
    Android,
    LinuxGlibc,
    Darwin,
    Windows,
}

impl OsType {
    pub fn name(self) -> &'static str {
        match self {
            OsType::Android => "android",
            OsType::LinuxGlibc => "linux_glibc",
            OsType::Darwin => "darwin",
            OsType::Windows => "windows",
        }
    }

    pub fn class(self) -> OsClass {
        match self {
            OsType::Android => OsClass::Device,
            _ => OsClass::Host,
        }
    }

    /// Directory name used for host install and tool paths.
    pub fn host_dir_name(self) -> &'static str {
        match self {
            OsType::LinuxGlibc => "linux",
            other => other.name(),
        }
    }
}

impl fmt::Display for OsType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for OsType {
    type Err = ArchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "android" => Ok(OsType::Android),
            "linux_glibc" => Ok(OsType::LinuxGlibc),
            "darwin" => Ok(OsType::Darwin),
            "windows" => Ok(OsType::Windows),
            _ => Err(ArchError::UnknownOs(s.to_string())),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArchType {
    Arm,
    Arm64,
    X86,
    #[serde(rename = "x86_64")]
    X86_64,
    Riscv64,
    Common,
}

impl ArchType {
    pub fn name(self) -> &'static str {
        match self {
            ArchType::Arm => "arm",
            ArchType::Arm64 => "arm64",
            ArchType::X86 => "x86",
            ArchType::X86_64 => "x86_64",
            ArchType::Riscv64 => "riscv64",
            ArchType::Common => "common",
        }
    }

    /// `lib32`, `lib64` or `common`.
    pub fn multilib(self) -> &'static str {
        match self {
            ArchType::Arm | ArchType::X86 => "lib32",
            ArchType::Arm64 | ArchType::X86_64 | ArchType::Riscv64 => "lib64",
            ArchType::Common => "common",
        }
    }
}

impl fmt::Display for ArchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ArchType {
    type Err = ArchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "arm" => Ok(ArchType::Arm),
            "arm64" => Ok(ArchType::Arm64),
            "x86" => Ok(ArchType::X86),
            "x86_64" => Ok(ArchType::X86_64),
            "riscv64" => Ok(ArchType::Riscv64),
            "common" => Ok(ArchType::Common),
            _ => Err(ArchError::UnknownArch(s.to_string())),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Target {
    pub os: OsType,
    pub arch: ArchType,
}

impl Target {
    pub fn new(os: OsType, arch: ArchType) -> Self {
        Target { os, arch }
    }

    /// The variation name of this target, e.g. `android_arm64`.
    pub fn variation(&self) -> String {
        format!("{}_{}", self.os.name(), self.arch.name())
    }

    pub fn is_device(&self) -> bool {
        self.os.class() == OsClass::Device
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.variation())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn variation_names() {
        assert_eq!(
            Target::new(OsType::Android, ArchType::Arm64).variation(),
            "android_arm64"
        );
        assert_eq!(
            Target::new(OsType::LinuxGlibc, ArchType::X86_64).to_string(),
            "linux_glibc_x86_64"
        );
    }

    #[test]
    fn multilib() {
        assert_eq!(ArchType::Arm.multilib(), "lib32");
        assert_eq!(ArchType::X86_64.multilib(), "lib64");
        assert_eq!(ArchType::Common.multilib(), "common");
        assert_eq!("x86_64".parse::<ArchType>(), Ok(ArchType::X86_64));
        assert!("mips".parse::<ArchType>().is_err());
    }
}
