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

//! Statements made of several shell commands, joined with `&&`.

use soongutil::config::Config;

use crate::{
    context::BuilderContext,
    paths::{WritablePath, host_tool_path},
    statement::BuildStatement,
};

/// Shell-quotes `arg`. NUL bytes, which no shell can carry, are dropped.
pub(crate) fn quote(arg: &str) -> String {
    shlex::try_quote(arg)
        .map(|q| q.into_owned())
        .unwrap_or_else(|_| arg.replace('\0', ""))
}

#[derive(Debug, Default)]
pub struct RuleBuilderCommand {
    parts: Vec<String>,
    inputs: Vec<String>,
    implicits: Vec<String>,
    order_only: Vec<String>,
    outputs: Vec<String>,
}

impl RuleBuilderCommand {
    /// Appends raw text, not quoted.
    pub fn text(&mut self, text: &str) -> &mut Self {
        self.parts.push(text.to_string());
        self
    }

    pub fn text_with_cond(&mut self, cond: bool, text: &str) -> &mut Self {
        if cond {
            self.text(text);
        }
        self
    }

    /// A flag, not quoted.
    pub fn flag(&mut self, flag: &str) -> &mut Self {
        self.text(flag)
    }

    /// Appends a quoted argument.
    pub fn arg(&mut self, arg: &str) -> &mut Self {
        self.parts.push(quote(arg));
        self
    }

    pub fn args<I, S>(&mut self, args: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for a in args {
            self.arg(a.as_ref());
        }
        self
    }

    /// `flag` immediately followed by the quoted `arg`, e.g. `-C <dir>` when
    /// `flag` ends with a space.
    pub fn flag_with_arg(&mut self, flag: &str, arg: &str) -> &mut Self {
        self.parts.push(format!("{flag}{}", quote(arg)));
        self
    }

    pub fn input(&mut self, path: &str) -> &mut Self {
        self.inputs.push(path.to_string());
        self.arg(path)
    }

    pub fn flag_with_input(&mut self, flag: &str, path: &str) -> &mut Self {
        self.inputs.push(path.to_string());
        self.flag_with_arg(flag, path)
    }

    /// An input that does not appear on the command line.
    pub fn implicit(&mut self, path: &str) -> &mut Self {
        self.implicits.push(path.to_string());
        self
    }

    pub fn order_only(&mut self, path: &str) -> &mut Self {
        self.order_only.push(path.to_string());
        self
    }

    pub fn output(&mut self, path: &dyn WritablePath) -> &mut Self {
        self.outputs.push(path.as_str().to_string());
        self.arg(path.as_str())
    }

    pub fn flag_with_output(&mut self, flag: &str, path: &dyn WritablePath) -> &mut Self {
        self.outputs.push(path.as_str().to_string());
        self.flag_with_arg(flag, path.as_str())
    }

    /// Runs a tool from a path, which becomes an implicit input.
    pub fn tool(&mut self, path: &str) -> &mut Self {
        self.implicits.push(path.to_string());
        self.arg(path)
    }

    /// Runs a host tool built by Soong. Tool names are plain file names.
    pub fn built_tool(&mut self, config: &Config, name: &str) -> &mut Self {
        match host_tool_path(config, name) {
            Ok(path) => self.tool(path.as_str()),
            Err(_) => self.arg(name),
        }
    }

    fn command_line(&self) -> String {
        self.parts.join(" ")
    }
}

/// Collects commands and emits them as one statement.
#[derive(Debug, Default)]
pub struct RuleBuilder {
    commands: Vec<RuleBuilderCommand>,
    restat: bool,
}

impl RuleBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn command(&mut self) -> &mut RuleBuilderCommand {
        self.commands.push(RuleBuilderCommand::default());
        let last = self.commands.len() - 1;
        &mut self.commands[last]
    }

    pub fn restat(&mut self) -> &mut Self {
        self.restat = true;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Files produced by one command and read by a later one are not inputs
    /// of the statement.
    pub fn to_statement(&self, rule: &str, desc: &str) -> BuildStatement {
        let mut outputs: Vec<String> = vec![];
        let mut inputs: Vec<String> = vec![];
        let mut implicits: Vec<String> = vec![];
        let mut order_only: Vec<String> = vec![];
        let push_unique = |list: &mut Vec<String>, item: &String| {
            if !list.contains(item) {
                list.push(item.clone());
            }
        };
        for cmd in &self.commands {
            for p in &cmd.inputs {
                if !outputs.contains(p) {
                    push_unique(&mut inputs, p);
                }
            }
            for p in &cmd.implicits {
                if !outputs.contains(p) && !inputs.contains(p) {
                    push_unique(&mut implicits, p);
                }
            }
            for p in &cmd.order_only {
                push_unique(&mut order_only, p);
            }
            for p in &cmd.outputs {
                push_unique(&mut outputs, p);
            }
        }
        let command = self
            .commands
            .iter()
            .map(RuleBuilderCommand::command_line)
            .collect::<Vec<_>>()
            .join(" && ");
        BuildStatement {
            rule: rule.to_string(),
            inputs,
            implicits,
            order_only,
            outputs,
            command,
            description: desc.to_string(),
            restat: self.restat,
            owner: String::new(),
        }
    }

    pub fn build(&self, ctx: &mut dyn BuilderContext, rule: &str, desc: &str) {
        if self.commands.is_empty() {
            return;
        }
        ctx.build(self.to_statement(rule, desc));
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use expect_test::expect;
    use soongutil::config::{Config, ProductVariables};
    use test_log::test;

    use crate::paths::path_for_output;

    #[test]
    #[allow(clippy::unwrap_used)]
    fn commands_are_joined_and_quoted() {
        let config = Config::for_test(ProductVariables::default(), &[] as &[&str]);
        let tmp = path_for_output(&config, &["tmp", "a b"]).unwrap();
        let out = path_for_output(&config, &["out.zip"]).unwrap();

        let mut rule = RuleBuilder::new();
        rule.command().text("mkdir").flag("-p").output(&tmp);
        rule.command()
            .tool("prebuilts/zip")
            .flag_with_output("-o ", &out)
            .flag_with_arg("-C ", tmp.as_str())
            .input(tmp.as_str())
            .input("src/x.txt");
        let stmt = rule.to_statement("zip", "zipping");

        expect![[r#"mkdir -p 'out/soong/tmp/a b' && prebuilts/zip -o out/soong/out.zip -C 'out/soong/tmp/a b' 'out/soong/tmp/a b' src/x.txt"#]]
            .assert_eq(&stmt.command);
        assert_eq!(stmt.inputs, vec!["src/x.txt"]);
        assert_eq!(stmt.implicits, vec!["prebuilts/zip"]);
        assert_eq!(stmt.outputs, vec!["out/soong/tmp/a b", "out/soong/out.zip"]);
    }
}
