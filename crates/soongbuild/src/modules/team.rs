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

//! `team`: an owner that modules name through their `team` property.

use serde::{Deserialize, Serialize};

use crate::{
    context::ModuleContext,
    module::{Module, ModuleBase},
    properties::{Field, PropertyBag, Schema, decode},
};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TeamProperties {
    /// The id of the team in the bug tracker.
    pub trendy_team_id: Option<String>,
}

static TEAM_SCHEMA: Schema = Schema {
    name: "team",
    fields: &[Field::plain("trendy_team_id")],
};

#[derive(Clone, Debug, Default)]
pub struct TeamModule {
    base: ModuleBase,
    pub properties: TeamProperties,
}

impl TeamModule {
    pub fn factory() -> Box<dyn Module> {
        Box::new(TeamModule::default())
    }
}

impl Module for TeamModule {
    fn base(&self) -> &ModuleBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ModuleBase {
        &mut self.base
    }

    fn property_schema(&self) -> &'static Schema {
        &TEAM_SCHEMA
    }

    fn load_properties(&mut self, bag: &PropertyBag) -> Result<(), serde_json::Error> {
        self.properties = decode(bag)?;
        Ok(())
    }

    fn generate_build_actions(&mut self, _ctx: &mut ModuleContext<'_>) {}

    fn license_exempt(&self) -> bool {
        true
    }
}
