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

//! Singletons generate build-wide actions once every module generated its
//! own.

use crate::{context::SingletonContext, makevars::MakeVarsContext};

pub trait Singleton: Send + Sync {
    fn generate_build_actions(&mut self, ctx: &mut SingletonContext<'_>);

    /// Variables and dist goals exported to Make. Runs after every
    /// singleton generated its actions.
    fn make_vars(&self, _ctx: &mut MakeVarsContext<'_>) {}
}

pub type SingletonFactory = fn() -> Box<dyn Singleton>;
