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

//! The `image` mutator: splits device modules into the images they are
//! installed in.

use crate::{
    context::BottomUpMutatorContext,
    module::{CommonProperties, ImageVariation, Module},
    mutator::RegisterMutatorsContext,
};

pub(crate) fn register_mutator(ctx: &mut RegisterMutatorsContext) {
    ctx.bottom_up("image", image_mutator).parallel();
}

/// The images of a module, core first. A module placed only in one image
/// gets no core variant.
pub fn image_variations(common: &CommonProperties) -> Vec<ImageVariation> {
    if common.ramdisk {
        return vec![ImageVariation::Ramdisk];
    }
    if common.vendor_ramdisk {
        return vec![ImageVariation::VendorRamdisk];
    }
    if common.debug_ramdisk {
        return vec![ImageVariation::DebugRamdisk];
    }
    if common.recovery {
        return vec![ImageVariation::Recovery];
    }
    let mut res = vec![ImageVariation::Core];
    let available = [
        (common.ramdisk_available, ImageVariation::Ramdisk),
        (common.vendor_ramdisk_available, ImageVariation::VendorRamdisk),
        (common.debug_ramdisk_available, ImageVariation::DebugRamdisk),
        (common.recovery_available, ImageVariation::Recovery),
    ];
    res.extend(available.iter().filter(|(on, _)| *on).map(|(_, v)| *v));
    res
}

fn image_mutator(ctx: &mut BottomUpMutatorContext<'_>, module: &mut dyn Module) {
    let on_device = module.base().target().is_some_and(|t| t.is_device());
    if !on_device {
        return;
    }
    let images = image_variations(module.base().common());
    let names: Vec<&str> = images.iter().map(|i| i.name()).collect();
    let created = ctx.create_variations(&*module, &names);
    for (variant, image) in created.iter_mut().zip(images) {
        variant.module_mut().base_mut().image = image;
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use test_log::test;

    #[test]
    fn core_comes_first() {
        let common = CommonProperties {
            recovery_available: true,
            ramdisk_available: true,
            ..Default::default()
        };
        assert_eq!(
            image_variations(&common),
            vec![
                ImageVariation::Core,
                ImageVariation::Ramdisk,
                ImageVariation::Recovery
            ]
        );
    }

    #[test]
    fn single_image_modules() {
        let common = CommonProperties {
            recovery: true,
            recovery_available: true,
            ..Default::default()
        };
        assert_eq!(image_variations(&common), vec![ImageVariation::Recovery]);
        assert_eq!(
            image_variations(&CommonProperties::default()),
            vec![ImageVariation::Core]
        );
    }
}
