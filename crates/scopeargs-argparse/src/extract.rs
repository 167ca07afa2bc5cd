//! Compiles command declarations into `Metadata`.

use indexmap::IndexMap;
use scopeargs_metadata::{GroupSpec, Metadata, OptionScope, OptionSpec, OptionTable};

use crate::declare::{Declaration, GroupDef};
use crate::error::ConfigurationError;

pub const DEFAULT_HELP_KEYWORD: &str = "help";

/// Application-level settings that do not belong to any single command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub name: String,
    pub description: String,
    pub help_keyword: String,
    pub help_on_incorrect_arguments: bool,
    pub default_command: Option<String>,
    pub single_command_mode: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            description: String::new(),
            help_keyword: DEFAULT_HELP_KEYWORD.to_string(),
            help_on_incorrect_arguments: true,
            default_command: None,
            single_command_mode: false,
        }
    }
}

/// Build `Metadata` from ordered declarations and explicit group assignments.
///
/// Nothing partial is returned: the first configuration problem aborts the build.
pub fn extract(
    app: &AppConfig,
    commands: &[&dyn Declaration],
    groups: &[GroupDef],
) -> Result<Metadata, ConfigurationError> {
    let mut meta = Metadata::new(app.name.clone(), app.help_keyword.clone());
    meta.description = app.description.clone();
    meta.single_command_mode = app.single_command_mode;
    meta.help_on_incorrect_arguments = app.help_on_incorrect_arguments;
    meta.default_command = app.default_command.clone();
    meta.commands.insert(app.help_keyword.clone(), None);

    let assignments = register_groups(&mut meta, groups)?;

    for decl in commands {
        register_command(&mut meta, &assignments, *decl)?;
    }

    for name in meta.groups.keys() {
        if meta.commands.contains_key(name) {
            return Err(ConfigurationError::CommandGroupCollision { name: name.clone() });
        }
    }

    warn_unmatched_members(&meta, &assignments);

    if meta.single_command_mode {
        single_command_default(&mut meta)?;
    }

    if let Some(name) = &meta.default_command {
        if !meta.is_command(name) {
            return Err(ConfigurationError::UnknownDefaultCommand { name: name.clone() });
        }
    }

    tracing::debug!(
        app = %meta.name,
        commands = meta.command_specs().count(),
        groups = meta.groups.len(),
        global_options = meta.global_options.len(),
        "built metadata"
    );
    Ok(meta)
}

/// A single-command tool has exactly one command, and that command is the
/// default.
fn single_command_default(meta: &mut Metadata) -> Result<(), ConfigurationError> {
    let names: Vec<String> = meta.command_specs().map(|c| c.name.clone()).collect();
    let [command] = names.as_slice() else {
        return Err(ConfigurationError::SingleCommandCount { found: names.len() });
    };
    match &meta.default_command {
        Some(name) if name != command => Err(ConfigurationError::SingleCommandDefault {
            name: name.clone(),
            command: command.clone(),
        }),
        _ => {
            meta.default_command = Some(command.clone());
            Ok(())
        }
    }
}

fn warn_unmatched_members(meta: &Metadata, assignments: &IndexMap<String, String>) {
    for (member, group) in assignments {
        if !meta.is_command(member) {
            tracing::warn!(
                command = %member,
                group = %group,
                "group member is not a declared command, ignoring"
            );
        }
    }
}

/// Registers explicit groups and returns command → group assignments.
fn register_groups(
    meta: &mut Metadata,
    groups: &[GroupDef],
) -> Result<IndexMap<String, String>, ConfigurationError> {
    let mut assignments = IndexMap::new();
    for def in groups {
        if def.name.trim().is_empty() {
            return Err(ConfigurationError::EmptyGroupName);
        }
        if meta.single_command_mode {
            return Err(ConfigurationError::GroupInSingleCommandMode {
                group: def.name.clone(),
            });
        }

        let spec = meta
            .groups
            .entry(def.name.clone())
            .or_insert_with(|| GroupSpec {
                name: def.name.clone(),
                ..Default::default()
            });
        if !def.description.is_empty() {
            spec.description = def.description.clone();
        }

        for member in &def.members {
            if let Some(previous) = assignments.insert(member.clone(), def.name.clone()) {
                if previous != def.name {
                    tracing::warn!(
                        command = %member,
                        previous = %previous,
                        group = %def.name,
                        "command assigned to more than one group, last assignment wins"
                    );
                }
            }
        }
    }
    Ok(assignments)
}

fn register_command(
    meta: &mut Metadata,
    assignments: &IndexMap<String, String>,
    decl: &dyn Declaration,
) -> Result<(), ConfigurationError> {
    let mut spec = decl.spec().clone();
    let name = spec.name.clone();

    if name.trim().is_empty() {
        tracing::warn!(type_name = %spec.type_name, "skipping command declaration without a name");
        return Ok(());
    }
    if meta.is_help_keyword(&name) {
        return Err(ConfigurationError::ReservedCommandName { name });
    }
    if meta.commands.contains_key(&name) {
        return Err(ConfigurationError::DuplicateCommand { name });
    }

    let group = resolve_group(&name, spec.group.as_deref(), assignments.get(&name));
    if let Some(group) = &group {
        if group.trim().is_empty() {
            return Err(ConfigurationError::EmptyGroupName);
        }
        if meta.single_command_mode {
            return Err(ConfigurationError::GroupInSingleCommandMode {
                group: group.clone(),
            });
        }
        let members = &mut meta
            .groups
            .entry(group.clone())
            .or_insert_with(|| GroupSpec {
                name: group.clone(),
                ..Default::default()
            })
            .commands;
        if !members.contains(&name) {
            members.push(name.clone());
        }
    }
    spec.group = group;

    for declared in decl.declared_options() {
        let option = declared.spec;
        if option.aliases.is_empty() {
            return Err(ConfigurationError::OptionWithoutAlias {
                command: name.clone(),
            });
        }
        if let Some(scope) = declared.unknown_scope {
            return Err(ConfigurationError::UnknownScope {
                command: name.clone(),
                option: option.canonical().to_string(),
                scope: scope.to_string(),
            });
        }

        let table = match option.scope {
            OptionScope::Global => &mut meta.global_options,
            OptionScope::Command => meta.command_options.entry(name.clone()).or_default(),
            OptionScope::Group => {
                if meta.single_command_mode {
                    return Err(ConfigurationError::GroupOptionInSingleCommandMode {
                        command: name.clone(),
                        option: option.canonical().to_string(),
                    });
                }
                let Some(group) = &spec.group else {
                    return Err(ConfigurationError::GroupOptionOutsideGroup {
                        command: name.clone(),
                        option: option.canonical().to_string(),
                    });
                };
                meta.group_options.entry(group.clone()).or_default()
            }
        };
        insert_aliases(table, option, &name);
    }

    let mut arguments: Vec<_> = decl.declared_arguments().into_iter().cloned().collect();
    if arguments.iter().filter(|a| a.is_catch_all()).count() > 1 {
        return Err(ConfigurationError::MultipleCatchAll { command: name });
    }
    arguments.sort_by_key(|a| a.sort_key());

    meta.command_options.entry(name.clone()).or_default();
    meta.command_arguments.insert(name.clone(), arguments);
    meta.commands.insert(name, Some(spec));
    Ok(())
}

/// An explicit assignment wins over the group named on the declaration.
fn resolve_group(command: &str, declared: Option<&str>, assigned: Option<&String>) -> Option<String> {
    match (declared, assigned) {
        (Some(declared), Some(assigned)) => {
            if declared != assigned {
                tracing::warn!(
                    command,
                    declared,
                    assigned = %assigned,
                    "explicit group assignment overrides the declared group"
                );
            }
            Some(assigned.clone())
        }
        (None, Some(assigned)) => Some(assigned.clone()),
        (Some(declared), None) => Some(declared.to_string()),
        (None, None) => None,
    }
}

fn insert_aliases(table: &mut OptionTable, spec: &OptionSpec, command: &str) {
    for alias in &spec.aliases {
        if let Some(previous) = table.insert(alias.clone(), spec.clone()) {
            if previous != *spec {
                tracing::warn!(
                    command,
                    alias = %alias,
                    scope = %spec.scope,
                    "duplicate option alias, last registration wins"
                );
            }
        }
    }
}
