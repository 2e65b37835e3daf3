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

//! `prebuilt_etc` and its siblings: checked-in files copied into a fixed
//! directory of a partition, such as `etc`, `usr/share` or `fonts`.

use serde::{Deserialize, Serialize};

use crate::{
    context::{BuilderContext, ModuleContext},
    module::{HostOrDeviceSupported, Module, ModuleBase, Multilib},
    properties::{Field, PropertyBag, Schema, decode},
    statement::BuildStatement,
};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrebuiltEtcProperties {
    /// Source file, or a `:module` reference.
    pub src: Option<String>,
    /// Name of the installed file. Defaults to the module name.
    pub filename: Option<String>,
    /// Name the installed file after the source file.
    pub filename_from_src: Option<bool>,
    pub installable: Option<bool>,
    /// Symlinks to the installed file, next to it.
    pub symlinks: Vec<String>,
    pub sub_dir: Option<String>,
    pub relative_install_path: Option<String>,
}

static PREBUILT_ETC_SCHEMA: Schema = Schema {
    name: "prebuilt_etc",
    fields: &[
        Field::path("src"),
        Field::plain("filename"),
        Field::plain("filename_from_src"),
        Field::plain("installable"),
        Field::plain("symlinks"),
        Field::plain("sub_dir"),
        Field::plain("relative_install_path"),
    ],
};

/// `prebuilt_root` installs directly into the partition and takes no
/// subdirectory.
static PREBUILT_ROOT_SCHEMA: Schema = Schema {
    name: "prebuilt_root",
    fields: &[
        Field::path("src"),
        Field::plain("filename"),
        Field::plain("filename_from_src"),
        Field::plain("installable"),
        Field::plain("symlinks"),
    ],
};

/// What distinguishes the module types of this family.
#[derive(Debug)]
pub struct PrebuiltEtcKind {
    /// Install directory below the partition, e.g. `usr/share`.
    pub install_dir_base: &'static str,
    /// Replaces `install_dir_base` for `soc_specific` modules.
    pub soc_install_dir_base: Option<&'static str>,
    pub support: HostOrDeviceSupported,
    pub multilib: Multilib,
    pub schema: &'static Schema,
}

macro_rules! kind {
    ($name:ident, $base:expr, $soc:expr, $support:ident, $multilib:ident, $schema:ident) => {
        static $name: PrebuiltEtcKind = PrebuiltEtcKind {
            install_dir_base: $base,
            soc_install_dir_base: $soc,
            support: HostOrDeviceSupported::$support,
            multilib: Multilib::$multilib,
            schema: &$schema,
        };
    };
}

kind!(ETC, "etc", None, DeviceSupported, First, PREBUILT_ETC_SCHEMA);
kind!(ETC_HOST, "etc", None, HostSupported, Common, PREBUILT_ETC_SCHEMA);
kind!(ROOT, ".", None, DeviceSupported, First, PREBUILT_ROOT_SCHEMA);
kind!(ROOT_HOST, ".", None, HostSupported, Common, PREBUILT_ETC_SCHEMA);
kind!(USR_SHARE, "usr/share", None, DeviceSupported, First, PREBUILT_ETC_SCHEMA);
kind!(USR_SHARE_HOST, "usr/share", None, HostSupported, Common, PREBUILT_ETC_SCHEMA);
kind!(FONT, "fonts", None, DeviceSupported, First, PREBUILT_ETC_SCHEMA);
kind!(FIRMWARE, "etc/firmware", Some("firmware"), DeviceSupported, First, PREBUILT_ETC_SCHEMA);
kind!(DSP, "etc/dsp", Some("dsp"), DeviceSupported, First, PREBUILT_ETC_SCHEMA);

#[derive(Clone, Debug)]
pub struct PrebuiltEtc {
    base: ModuleBase,
    kind: &'static PrebuiltEtcKind,
    pub properties: PrebuiltEtcProperties,
    output: Option<String>,
    install_dir: Option<String>,
}

impl PrebuiltEtc {
    fn new(kind: &'static PrebuiltEtcKind) -> Box<dyn Module> {
        Box::new(PrebuiltEtc {
            base: ModuleBase::default(),
            kind,
            properties: PrebuiltEtcProperties::default(),
            output: None,
            install_dir: None,
        })
    }

    pub fn etc_factory() -> Box<dyn Module> {
        Self::new(&ETC)
    }

    pub fn etc_host_factory() -> Box<dyn Module> {
        Self::new(&ETC_HOST)
    }

    pub fn root_factory() -> Box<dyn Module> {
        Self::new(&ROOT)
    }

    pub fn root_host_factory() -> Box<dyn Module> {
        Self::new(&ROOT_HOST)
    }

    pub fn usr_share_factory() -> Box<dyn Module> {
        Self::new(&USR_SHARE)
    }

    pub fn usr_share_host_factory() -> Box<dyn Module> {
        Self::new(&USR_SHARE_HOST)
    }

    pub fn font_factory() -> Box<dyn Module> {
        Self::new(&FONT)
    }

    pub fn firmware_factory() -> Box<dyn Module> {
        Self::new(&FIRMWARE)
    }

    pub fn dsp_factory() -> Box<dyn Module> {
        Self::new(&DSP)
    }

    pub fn kind(&self) -> &'static PrebuiltEtcKind {
        self.kind
    }

    /// `sub_dir`, falling back to `relative_install_path`.
    pub fn sub_dir(&self) -> &str {
        let p = &self.properties;
        p.sub_dir
            .as_deref()
            .filter(|s| !s.is_empty())
            .or(p.relative_install_path.as_deref())
            .unwrap_or("")
    }

    pub fn installable(&self) -> bool {
        self.properties.installable.unwrap_or(true)
    }

    /// The renamed copy of the source, once generated.
    pub fn output_file(&self) -> Option<&str> {
        self.output.as_deref()
    }

    /// The install directory, once generated.
    pub fn install_dir(&self) -> Option<&str> {
        self.install_dir.as_deref()
    }

    fn output_name(&self, ctx: &mut ModuleContext<'_>, src: &str) -> Option<String> {
        let filename = self.properties.filename.as_deref().unwrap_or("");
        let from_src = self.properties.filename_from_src.unwrap_or(false);
        let name = if !filename.is_empty() {
            if from_src {
                ctx.property_errorf(
                    "filename_from_src",
                    "filename is set. filename_from_src can't be true",
                );
                return None;
            }
            filename.to_string()
        } else if from_src {
            soongutil::path::base(src).to_string()
        } else {
            ctx.module_name().to_string()
        };
        if name.contains('/') {
            ctx.property_errorf("filename", "filename cannot contain separator '/'");
            return None;
        }
        Some(name)
    }
}

impl Module for PrebuiltEtc {
    fn base(&self) -> &ModuleBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ModuleBase {
        &mut self.base
    }

    fn property_schema(&self) -> &'static Schema {
        self.kind.schema
    }

    fn load_properties(&mut self, bag: &PropertyBag) -> Result<(), serde_json::Error> {
        self.properties = decode(bag)?;
        Ok(())
    }

    fn arch_support(&self) -> Option<(HostOrDeviceSupported, Multilib)> {
        Some((self.kind.support, self.kind.multilib))
    }

    fn generate_build_actions(&mut self, ctx: &mut ModuleContext<'_>) {
        let Some(src_prop) = self.properties.src.clone() else {
            ctx.property_errorf("src", "missing prebuilt source file");
            return;
        };
        let Some(src) = ctx.path_for_module_src("src", &src_prop) else {
            return;
        };
        let Some(filename) = self.output_name(ctx, &src) else {
            return;
        };
        let Some(out) = ctx.path_for_module_out(&[&filename]) else {
            return;
        };

        if self.properties.sub_dir.is_some() && self.properties.relative_install_path.is_some() {
            ctx.property_errorf("sub_dir", "relative_install_path is set. Cannot set sub_dir");
        }

        let base_dir = match self.kind.soc_install_dir_base {
            Some(soc) if ctx.common().soc_specific() => soc,
            _ => self.kind.install_dir_base,
        };
        let sub_dir = self.sub_dir().to_string();
        let Some(install_dir) = ctx.path_for_module_install(&[base_dir, &sub_dir]) else {
            return;
        };

        ctx.build(
            BuildStatement::new("cp", "rm -f $out && cp -f $in $out")
                .input(src.as_str())
                .output(&out)
                .description(format!("cp {filename}")),
        );

        if !self.installable() {
            ctx.skip_install();
        }
        // Uninstallable files still reach the packages that depend on them.
        let installed = ctx.install_file(&install_dir, &filename, out.as_str());
        if let Some(installed) = installed {
            for link in &self.properties.symlinks {
                ctx.install_symlink(&install_dir, link, &installed);
            }
        }

        ctx.set_output_files(vec![out.as_str().to_string()], "");
        self.output = Some(out.as_str().to_string());
        self.install_dir = Some(install_dir.as_str().to_string());
    }
}

/// `prebuilt_defaults`: shared properties of the modules above.
#[derive(Clone, Debug, Default)]
pub struct PrebuiltDefaults {
    base: ModuleBase,
}

impl PrebuiltDefaults {
    pub fn factory() -> Box<dyn Module> {
        Box::new(PrebuiltDefaults::default())
    }
}

impl Module for PrebuiltDefaults {
    fn base(&self) -> &ModuleBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ModuleBase {
        &mut self.base
    }

    fn property_schema(&self) -> &'static Schema {
        &PREBUILT_ETC_SCHEMA
    }

    fn load_properties(&mut self, _bag: &PropertyBag) -> Result<(), serde_json::Error> {
        Ok(())
    }

    fn generate_build_actions(&mut self, _ctx: &mut ModuleContext<'_>) {}

    fn is_defaults(&self) -> bool {
        true
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod test {
    use crate::fixture::TestFixture;
    use expect_test::expect;
    use test_log::test;

    use super::PrebuiltEtc;

    fn install_dir(fixture: TestFixture, name: &str, variant: &str) -> String {
        let result = fixture.run().unwrap();
        result
            .module::<PrebuiltEtc, _>(name, variant, |p| p.install_dir().map(str::to_string))
            .flatten()
            .unwrap()
    }

    #[test]
    fn variants_follow_the_module_type() {
        let result = TestFixture::new()
            .with_files(&["foo.conf", "bar.conf", "baz.conf"])
            .with_module("Android.bp", "prebuilt_etc", r#"{"name": "foo.conf", "src": "foo.conf"}"#)
            .with_module("Android.bp", "prebuilt_etc", r#"{
                "name": "bar.conf", "src": "bar.conf", "recovery_available": true
            }"#)
            .with_module("Android.bp", "prebuilt_etc", r#"{
                "name": "baz.conf", "src": "baz.conf", "recovery": true
            }"#)
            .run()
            .unwrap();
        assert_eq!(result.variants("foo.conf"), vec!["android_arm64"]);
        assert_eq!(
            result.variants("bar.conf"),
            vec!["android_arm64", "android_arm64_recovery"]
        );
        assert_eq!(result.variants("baz.conf"), vec!["android_arm64_recovery"]);
    }

    #[test]
    fn output_file_name_and_copy() {
        let result = TestFixture::new()
            .with_files(&["foo.conf", "conf/bar.txt"])
            .with_module("Android.bp", "prebuilt_etc", r#"{
                "name": "foo.conf", "src": "foo.conf", "filename": "foo.installed.conf"
            }"#)
            .with_module("Android.bp", "prebuilt_etc", r#"{
                "name": "bar", "src": "conf/bar.txt", "filename_from_src": true
            }"#)
            .run()
            .unwrap();
        assert_eq!(
            result.output_files("foo.conf", "android_arm64", ""),
            vec!["out/soong/.intermediates/foo.conf/android_arm64/foo.installed.conf"]
        );
        expect![[r#"
            cp: conf/bar.txt -> out/soong/.intermediates/bar/android_arm64/bar.txt
            cp: out/soong/.intermediates/bar/android_arm64/bar.txt -> out/soong/target/product/test_device/system/etc/bar.txt"#]]
        .assert_eq(&result.describe_statements("bar", "android_arm64"));
    }

    #[test]
    fn symlinks_and_uninstallable_files() {
        let result = TestFixture::new()
            .with_files(&["foo.conf", "bar.conf"])
            .with_module("Android.bp", "prebuilt_etc", r#"{
                "name": "foo.conf", "src": "foo.conf", "symlinks": ["foo.link"]
            }"#)
            .with_module("Android.bp", "prebuilt_etc", r#"{
                "name": "bar.conf", "src": "bar.conf", "installable": false
            }"#)
            .run()
            .unwrap();
        expect![[r#"
            cp: foo.conf -> out/soong/.intermediates/foo.conf/android_arm64/foo.conf
            cp: out/soong/.intermediates/foo.conf/android_arm64/foo.conf -> out/soong/target/product/test_device/system/etc/foo.conf
            symlink: out/soong/target/product/test_device/system/etc/foo.conf -> out/soong/target/product/test_device/system/etc/foo.link"#]]
        .assert_eq(&result.describe_statements("foo.conf", "android_arm64"));
        assert!(result.install_files("bar.conf", "android_arm64").is_empty());
        assert_eq!(
            result.packaged_paths("bar.conf", "android_arm64"),
            vec!["etc/bar.conf"]
        );
    }

    #[test]
    fn install_dirs() {
        let base = || TestFixture::new().with_files(&["foo.conf"]);
        assert_eq!(
            install_dir(
                base().with_module("Android.bp", "prebuilt_etc", r#"{
                    "name": "foo.conf", "src": "foo.conf", "sub_dir": "bar"
                }"#),
                "foo.conf",
                "android_arm64"
            ),
            "out/soong/target/product/test_device/system/etc/bar"
        );
        assert_eq!(
            install_dir(
                base().with_module("Android.bp", "prebuilt_root", r#"{"name": "foo.conf", "src": "foo.conf"}"#),
                "foo.conf",
                "android_arm64"
            ),
            "out/soong/target/product/test_device/system"
        );
        assert_eq!(
            install_dir(
                base().with_module("Android.bp", "prebuilt_usr_share_host", r#"{
                    "name": "foo.conf", "src": "foo.conf", "relative_install_path": "bar"
                }"#),
                "foo.conf",
                "linux_glibc_common"
            ),
            "out/soong/host/linux-x86/usr/share/bar"
        );
        assert_eq!(
            install_dir(
                base().with_module("Android.bp", "prebuilt_font", r#"{"name": "foo.conf", "src": "foo.conf"}"#),
                "foo.conf",
                "android_arm64"
            ),
            "out/soong/target/product/test_device/system/fonts"
        );
        assert_eq!(
            install_dir(
                base().with_module("Android.bp", "prebuilt_firmware", r#"{"name": "foo.conf", "src": "foo.conf"}"#),
                "foo.conf",
                "android_arm64"
            ),
            "out/soong/target/product/test_device/system/etc/firmware"
        );
        assert_eq!(
            install_dir(
                base().with_module("Android.bp", "prebuilt_firmware", r#"{
                    "name": "foo.conf", "src": "foo.conf", "soc_specific": true, "sub_dir": "sub_dir"
                }"#),
                "foo.conf",
                "android_arm64"
            ),
            "out/soong/target/product/test_device/vendor/firmware/sub_dir"
        );
    }

    #[test]
    fn defaults_supply_properties() {
        let dir = install_dir(
            TestFixture::new()
                .with_files(&["foo.conf"])
                .with_module("Android.bp", "prebuilt_defaults", r#"{
                    "name": "etc_defaults", "sub_dir": "shared"
                }"#)
                .with_module("Android.bp", "prebuilt_etc", r#"{
                    "name": "foo.conf", "src": "foo.conf", "defaults": ["etc_defaults"]
                }"#),
            "foo.conf",
            "android_arm64",
        );
        assert_eq!(dir, "out/soong/target/product/test_device/system/etc/shared");
    }

    #[test]
    fn property_errors() {
        expect![[r#"Android.bp: module "foo" variant "android_arm64": src: missing prebuilt source file"#]]
            .assert_eq(
                &TestFixture::new()
                    .with_module("Android.bp", "prebuilt_etc", r#"{"name": "foo"}"#)
                    .run_expecting_errors(),
            );
        expect![[r#"Android.bp: module "foo" variant "android_arm64": filename_from_src: filename is set. filename_from_src can't be true"#]]
            .assert_eq(
                &TestFixture::new()
                    .with_files(&["foo.conf"])
                    .with_module("Android.bp", "prebuilt_etc", r#"{
                        "name": "foo", "src": "foo.conf", "filename": "a", "filename_from_src": true
                    }"#)
                    .run_expecting_errors(),
            );
        expect![[r#"Android.bp: module "foo" variant "android_arm64": filename: filename cannot contain separator '/'"#]]
            .assert_eq(
                &TestFixture::new()
                    .with_files(&["foo.conf"])
                    .with_module("Android.bp", "prebuilt_etc", r#"{
                        "name": "foo", "src": "foo.conf", "filename": "a/b"
                    }"#)
                    .run_expecting_errors(),
            );
        expect![[r#"Android.bp: module "foo" variant "android_arm64": sub_dir: relative_install_path is set. Cannot set sub_dir"#]]
            .assert_eq(
                &TestFixture::new()
                    .with_files(&["foo.conf"])
                    .with_module("Android.bp", "prebuilt_etc", r#"{
                        "name": "foo", "src": "foo.conf", "sub_dir": "a", "relative_install_path": "b"
                    }"#)
                    .run_expecting_errors(),
            );
    }
}
