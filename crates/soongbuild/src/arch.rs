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

//! The `arch` mutator: splits modules into one variant per target.

use soongutil::{
    arch::{ArchType, OsType, Target},
    config::Config,
};

use crate::{
    context::BottomUpMutatorContext,
    module::{CommonProperties, HostOrDeviceSupported, Module, Multilib},
    mutator::RegisterMutatorsContext,
};

pub(crate) fn register_mutator(ctx: &mut RegisterMutatorsContext) {
    ctx.bottom_up("arch", arch_mutator).parallel();
}

/// Which OS classes a module is built for, device first.
fn supported_classes(support: HostOrDeviceSupported, common: &CommonProperties) -> (bool, bool) {
    let device_on = common.device_supported != Some(false);
    match support {
        HostOrDeviceSupported::HostSupported => (false, true),
        HostOrDeviceSupported::DeviceSupported => (true, false),
        HostOrDeviceSupported::HostAndDeviceSupported => {
            (device_on, common.host_supported == Some(true))
        }
        HostOrDeviceSupported::HostAndDeviceDefault => {
            (device_on, common.host_supported != Some(false))
        }
    }
}

fn filter_multilib(targets: &[Target], os: OsType, multilib: Multilib) -> Vec<Target> {
    match multilib {
        Multilib::Common => vec![Target::new(os, ArchType::Common)],
        Multilib::Both => targets.to_vec(),
        Multilib::First => targets.iter().take(1).copied().collect(),
        Multilib::Lib32 => targets
            .iter()
            .filter(|t| t.arch.multilib() == "lib32")
            .copied()
            .collect(),
        Multilib::Lib64 => targets
            .iter()
            .filter(|t| t.arch.multilib() == "lib64")
            .copied()
            .collect(),
    }
}

/// The targets a module is built for, device targets first.
pub fn decode_targets(
    config: &Config,
    support: HostOrDeviceSupported,
    default_multilib: Multilib,
    common: &CommonProperties,
) -> Vec<Target> {
    let multilib = common.compile_multilib.unwrap_or(default_multilib);
    let (device, host) = supported_classes(support, common);
    let mut res = vec![];
    if device && !config.device_targets().is_empty() {
        res.extend(filter_multilib(config.device_targets(), OsType::Android, multilib));
    }
    if host {
        res.extend(filter_multilib(config.host_targets(), OsType::LinuxGlibc, multilib));
    }
    res
}

fn arch_mutator(ctx: &mut BottomUpMutatorContext<'_>, module: &mut dyn Module) {
    let Some((support, default_multilib)) = module.arch_support() else {
        return;
    };
    let config = ctx.config();
    let targets = decode_targets(config, support, default_multilib, module.base().common());
    if targets.is_empty() {
        module.base_mut().arch_disabled = true;
        return;
    }
    let multi = if module.wants_multi_targets() {
        config.device_targets().to_vec()
    } else {
        vec![]
    };

    let names: Vec<String> = targets.iter().map(Target::variation).collect();
    let created = ctx.create_variations(&*module, &names);
    for (variant, target) in created.iter_mut().zip(&targets) {
        let base = variant.module_mut().base_mut();
        base.target = Some(*target);
        if target.is_device() && target.arch == ArchType::Common {
            base.multi_targets = multi.clone();
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use soongutil::config::ProductVariables;
    use test_log::test;

    fn names(targets: &[Target]) -> Vec<String> {
        targets.iter().map(Target::variation).collect()
    }

    #[test]
    fn multilib_selection() {
        let config = Config::for_test(ProductVariables::default(), &[] as &[&str]);
        let common = CommonProperties::default();
        let both = decode_targets(
            &config,
            HostOrDeviceSupported::DeviceSupported,
            Multilib::Both,
            &common,
        );
        assert_eq!(names(&both), vec!["android_arm64", "android_arm"]);

        let lib32 = CommonProperties {
            compile_multilib: Some(Multilib::Lib32),
            ..Default::default()
        };
        let t = decode_targets(
            &config,
            HostOrDeviceSupported::DeviceSupported,
            Multilib::Both,
            &lib32,
        );
        assert_eq!(names(&t), vec!["android_arm"]);
    }

    #[test]
    fn host_support_flags() {
        let config = Config::for_test(ProductVariables::default(), &[] as &[&str]);
        let host = CommonProperties {
            host_supported: Some(true),
            ..Default::default()
        };
        let t = decode_targets(
            &config,
            HostOrDeviceSupported::HostAndDeviceSupported,
            Multilib::First,
            &host,
        );
        assert_eq!(names(&t), vec!["android_arm64", "linux_glibc_x86_64"]);

        let no_device = CommonProperties {
            device_supported: Some(false),
            ..Default::default()
        };
        let t = decode_targets(
            &config,
            HostOrDeviceSupported::HostAndDeviceSupported,
            Multilib::First,
            &no_device,
        );
        assert!(t.is_empty());

        let t = decode_targets(
            &config,
            HostOrDeviceSupported::HostSupported,
            Multilib::Common,
            &CommonProperties::default(),
        );
        assert_eq!(names(&t), vec!["linux_glibc_common"]);
    }
}
