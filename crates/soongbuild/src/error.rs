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

//! Diagnostics collected while constructing the build graph.

use std::fmt;

use thiserror::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// A malformed or semantically invalid property value.
    Property,
    /// A problem with a module as a whole.
    Module,
    /// A dependency or path reference naming a module that does not exist.
    UnresolvedReference,
    /// Failure to encode generated metadata.
    Marshal,
}

/// The module variant a diagnostic is attributed to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModuleRef {
    pub name: String,
    pub variant: String,
    pub bp_file: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
    pub module: Option<ModuleRef>,
    pub property: Option<String>,
    pub kind: DiagnosticKind,
    pub message: String,
}

impl Diagnostic {
    /// A diagnostic that is not attached to any module.
    pub fn global(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Diagnostic {
            module: None,
            property: None,
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(m) = &self.module {
            write!(f, "{}: module \"{}\"", m.bp_file, m.name)?;
            if !m.variant.is_empty() {
                write!(f, " variant \"{}\"", m.variant)?;
            }
            f.write_str(": ")?;
        }
        if let Some(p) = &self.property {
            write!(f, "{p}: ")?;
        }
        f.write_str(&self.message)
    }
}

fn render_diagnostics(diags: &[Diagnostic]) -> String {
    let lines: Vec<String> = diags.iter().map(|d| d.to_string()).collect();
    lines.join("\n")
}

/// Why a build could not produce a lowered graph.
#[derive(Debug, Error)]
pub enum BuildFailed {
    /// Every diagnostic collected before the pipeline stopped, in order.
    #[error("{}", render_diagnostics(.0))]
    Diagnostics(Vec<Diagnostic>),

    #[error("invalid build statements")]
    Statements(#[from] crate::statement::StatementError),

    #[error("failed to lower build statements")]
    Lowering(#[from] crate::lower::LoweringError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl BuildFailed {
    /// The collected diagnostics, empty for failures after graph construction.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        match self {
            BuildFailed::Diagnostics(d) => d,
            _ => &[],
        }
    }
}
