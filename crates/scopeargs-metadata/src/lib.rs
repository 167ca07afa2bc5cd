//! Compiled schema for scopeargs applications.
//!
//! The types here are plain data. They are produced once by the metadata
//! extractor in `scopeargs-argparse` and are read-only afterwards, which makes
//! them safe to share between concurrent parses and to hand to help renderers
//! or other tooling (they serialize to kebab-case JSON).

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Tier at which an option is recognized and stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum OptionScope {
    Global,
    Group,
    #[default]
    Command,
}

impl OptionScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Global => "global",
            Self::Group => "group",
            Self::Command => "command",
        }
    }
}

impl fmt::Display for OptionScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a textual scope is not one of `global`, `group`, `command`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownScope(pub String);

impl fmt::Display for UnknownScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown option scope '{}'", self.0)
    }
}

impl std::error::Error for UnknownScope {}

impl FromStr for OptionScope {
    type Err = UnknownScope;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "global" => Ok(Self::Global),
            "group" => Ok(Self::Group),
            "command" => Ok(Self::Command),
            _ => Err(UnknownScope(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub struct CommandSpec {
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(default)]
    pub hidden: bool,
    /// Name of the Rust type the command binds into. Informational only; the
    /// factory works with the type handle kept next to the declaration.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub type_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct OptionSpec {
    pub scope: OptionScope,
    /// Every accepted spelling. The first one is the canonical alias.
    pub aliases: Vec<String>,
    /// Number of value tokens consumed after the alias. `0` is a flag.
    pub arity: usize,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allowed_values: Vec<String>,
    #[serde(default)]
    pub hidden: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub title: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

impl OptionSpec {
    /// The stable storage key for parsed values.
    pub fn canonical(&self) -> &str {
        self.aliases.first().map(String::as_str).unwrap_or_default()
    }

    pub fn is_flag(&self) -> bool {
        self.arity == 0
    }

    pub fn allows(&self, value: &str) -> bool {
        self.allowed_values.is_empty() || self.allowed_values.iter().any(|v| v == value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub struct FixedArgument {
    pub order: usize,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub title: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub struct CatchAllArgument {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub title: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

/// A positional slot of a command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ArgumentSpec {
    Fixed(FixedArgument),
    CatchAll(CatchAllArgument),
}

impl ArgumentSpec {
    /// Sort key placing every fixed argument (by order) before the catch-all.
    pub fn sort_key(&self) -> (u8, usize) {
        match self {
            Self::Fixed(a) => (0, a.order),
            Self::CatchAll(_) => (1, 0),
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Self::Fixed(a) => &a.title,
            Self::CatchAll(a) => &a.title,
        }
    }

    pub fn description(&self) -> &str {
        match self {
            Self::Fixed(a) => &a.description,
            Self::CatchAll(a) => &a.description,
        }
    }

    pub fn is_catch_all(&self) -> bool {
        matches!(self, Self::CatchAll(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub struct GroupSpec {
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub commands: Vec<String>,
}

/// Alias → spec table for one scope bucket.
pub type OptionTable = IndexMap<String, OptionSpec>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub struct Metadata {
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default)]
    pub single_command_mode: bool,
    #[serde(default)]
    pub help_on_incorrect_arguments: bool,
    pub help_keyword: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_command: Option<String>,
    #[serde(default)]
    pub global_options: OptionTable,
    #[serde(default)]
    pub group_options: IndexMap<String, OptionTable>,
    #[serde(default)]
    pub command_options: IndexMap<String, OptionTable>,
    /// Every reserved command name. The help keyword maps to `None`.
    #[serde(default)]
    pub commands: IndexMap<String, Option<CommandSpec>>,
    /// Positional slots per command, fixed arguments first (by order).
    #[serde(default)]
    pub command_arguments: IndexMap<String, Vec<ArgumentSpec>>,
    #[serde(default)]
    pub groups: IndexMap<String, GroupSpec>,
}

impl Metadata {
    pub fn new(name: impl Into<String>, help_keyword: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            help_keyword: help_keyword.into(),
            ..Default::default()
        }
    }

    pub fn is_group(&self, name: &str) -> bool {
        self.groups.contains_key(name)
    }

    /// Whether `name` is a real command (the reserved help keyword is not).
    pub fn is_command(&self, name: &str) -> bool {
        matches!(self.commands.get(name), Some(Some(_)))
    }

    pub fn is_help_keyword(&self, token: &str) -> bool {
        token == self.help_keyword
    }

    pub fn command(&self, name: &str) -> Option<&CommandSpec> {
        self.commands.get(name).and_then(Option::as_ref)
    }

    pub fn group(&self, name: &str) -> Option<&GroupSpec> {
        self.groups.get(name)
    }

    pub fn group_options(&self, group: &str) -> Option<&OptionTable> {
        self.group_options.get(group)
    }

    pub fn command_options(&self, command: &str) -> Option<&OptionTable> {
        self.command_options.get(command)
    }

    pub fn arguments(&self, command: &str) -> &[ArgumentSpec] {
        self.command_arguments
            .get(command)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Real commands in declaration order.
    pub fn command_specs(&self) -> impl Iterator<Item = &CommandSpec> {
        self.commands.values().filter_map(Option::as_ref)
    }
}

/// Distinct specs in a table, in first-registration order.
///
/// A table holds one entry per alias; this collapses them back to one entry per option.
pub fn distinct_options(table: &OptionTable) -> Vec<&OptionSpec> {
    let mut out: Vec<&OptionSpec> = Vec::new();
    for spec in table.values() {
        if !out.iter().any(|seen| seen.canonical() == spec.canonical()) {
            out.push(spec);
        }
    }
    out
}
