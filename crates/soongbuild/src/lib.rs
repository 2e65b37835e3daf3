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

//! The module graph engine: module variants connected by tagged
//! dependencies, the mutator pipeline transforming them, and the build
//! statements generated from the result.

#![warn(clippy::unwrap_used)] // We prefer clear panic messages

pub mod arch;
pub mod bootjars;
pub mod context;
pub mod defaults;
pub mod deptag;
pub mod entry;
pub mod error;
pub mod fixture;
pub mod graph;
pub mod image;
pub mod licenses;
pub mod loader;
pub mod lower;
pub mod makevars;
pub mod model;
pub mod module;
pub mod modules;
pub mod mutator;
pub mod packaging;
pub mod pathdeps;
pub mod paths;
pub mod prebuilt;
pub mod properties;
pub mod provider;
pub mod raw_files;
pub mod rule_builder;
pub mod singleton;
pub mod statement;
pub mod teams;
pub mod visibility;
