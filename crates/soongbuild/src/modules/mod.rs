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

//! The module types shipped with the engine.

pub mod build_prop;
pub mod csuite_config;
pub mod filegroup;
pub mod filesystem;
pub mod java_import;
pub mod license;
pub mod makefile_goal;
pub mod namespace;
pub mod package;
pub mod prebuilt_etc;
pub mod team;

use crate::entry::Registry;

pub(crate) fn register(registry: &mut Registry) {
    registry
        .register_module_type("filegroup", filegroup::FileGroup::factory)
        .register_module_type("license", license::LicenseModule::factory)
        .register_module_type("license_kind", license::LicenseKindModule::factory)
        .register_module_type("package", package::PackageModule::factory)
        .register_module_type("team", team::TeamModule::factory)
        .register_module_type("soong_namespace", namespace::NamespaceModule::factory)
        .register_module_type("prebuilt_etc", prebuilt_etc::PrebuiltEtc::etc_factory)
        .register_module_type("prebuilt_etc_host", prebuilt_etc::PrebuiltEtc::etc_host_factory)
        .register_module_type("prebuilt_root", prebuilt_etc::PrebuiltEtc::root_factory)
        .register_module_type("prebuilt_root_host", prebuilt_etc::PrebuiltEtc::root_host_factory)
        .register_module_type("prebuilt_usr_share", prebuilt_etc::PrebuiltEtc::usr_share_factory)
        .register_module_type(
            "prebuilt_usr_share_host",
            prebuilt_etc::PrebuiltEtc::usr_share_host_factory,
        )
        .register_module_type("prebuilt_font", prebuilt_etc::PrebuiltEtc::font_factory)
        .register_module_type("prebuilt_firmware", prebuilt_etc::PrebuiltEtc::firmware_factory)
        .register_module_type("prebuilt_dsp", prebuilt_etc::PrebuiltEtc::dsp_factory)
        .register_module_type("prebuilt_defaults", prebuilt_etc::PrebuiltDefaults::factory)
        .register_module_type("build_prop", build_prop::BuildProp::factory)
        .register_module_type("makefile_goal", makefile_goal::MakefileGoal::factory)
        .register_module_type("csuite_config", csuite_config::CsuiteConfig::factory)
        .register_module_type("java_import", java_import::JavaImport::factory)
        .register_module_type("android_filesystem", filesystem::Filesystem::factory);
}
