//! Plain-text help built from `Metadata` and a `ParseResult`.
//!
//! The layout is not part of any contract; tools that need the facts should
//! read `Metadata` directly.

use scopeargs_metadata::{ArgumentSpec, Metadata, OptionSpec, OptionTable, distinct_options};

use crate::binder::argument_label;
use crate::parser::{ParseResult, SEPARATOR};

const DEFAULT_VALUE_NAME: &str = "option-arg";
/// Arity above which value placeholders collapse into `<name>...`.
const MAX_LISTED_VALUES: usize = 3;

/// A help signal produced by a parse, with the scan attached.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HelpRequest {
    pub result: ParseResult,
}

impl HelpRequest {
    pub fn group(&self) -> Option<&str> {
        self.result.group.as_deref()
    }

    pub fn command(&self) -> Option<&str> {
        self.result.command.as_deref()
    }
}

/// Render help for whatever the parse selected: a command, a group, or the
/// whole application.
pub fn render(meta: &Metadata, result: &ParseResult) -> String {
    let group = result.group.as_deref().filter(|g| meta.is_group(g));
    let command = result.command.as_deref();
    let known = command.filter(|c| meta.is_command(c));

    let mut out = String::new();
    if meta.description.trim().is_empty() {
        out.push_str(&meta.name);
    } else {
        out.push_str(&format!("{}: {}", meta.name, meta.description.trim()));
    }
    out.push('\n');

    if let Some(unknown) = command.filter(|_| known.is_none()) {
        out.push_str(&format!("\nUnknown command: {unknown}\n"));
    }

    out.push_str(&format!("\nUsage: {}\n", usage(meta, group, known)));

    if let Some(spec) = known.and_then(|c| meta.command(c)) {
        if !spec.description.trim().is_empty() {
            out.push('\n');
            out.push_str(spec.description.trim_end());
            out.push('\n');
        }
    } else if let Some(spec) = group.and_then(|g| meta.group(g)) {
        if !spec.description.trim().is_empty() {
            out.push('\n');
            out.push_str(spec.description.trim_end());
            out.push('\n');
        }
    }

    let mut options: Vec<&OptionSpec> = visible(&meta.global_options);
    if let Some(table) = group.and_then(|g| meta.group_options(g)) {
        options.extend(visible(table));
    }
    if let Some(table) = known.and_then(|c| meta.command_options(c)) {
        options.extend(visible(table));
    }
    section(
        &mut out,
        "Available options:",
        options.iter().map(|o| (option_left(o), option_help(o))).collect(),
    );

    match known {
        Some(command) => section(
            &mut out,
            "Available arguments:",
            meta.arguments(command)
                .iter()
                .map(|a| (format!("<{}>", argument_label(a)), argument_help(a)))
                .collect(),
        ),
        None => section(&mut out, "Available commands:", command_rows(meta, group)),
    }

    out
}

fn visible(table: &OptionTable) -> Vec<&OptionSpec> {
    distinct_options(table)
        .into_iter()
        .filter(|o| !o.hidden)
        .collect()
}

fn command_rows(meta: &Metadata, group: Option<&str>) -> Vec<(String, String)> {
    let mut rows: Vec<(String, String)> = Vec::new();
    match group.and_then(|g| meta.group(g)) {
        Some(spec) => {
            for name in &spec.commands {
                if let Some(cmd) = meta.command(name).filter(|c| !c.hidden) {
                    rows.push((cmd.name.clone(), cmd.description.trim().to_string()));
                }
            }
        }
        None => {
            for cmd in meta.command_specs().filter(|c| !c.hidden && c.group.is_none()) {
                rows.push((cmd.name.clone(), cmd.description.trim().to_string()));
            }
            for spec in meta.groups.values() {
                rows.push((spec.name.clone(), spec.description.trim().to_string()));
            }
        }
    }
    rows
}

fn usage(meta: &Metadata, group: Option<&str>, command: Option<&str>) -> String {
    let mut parts: Vec<String> = vec![meta.name.clone()];
    parts.extend(visible(&meta.global_options).into_iter().map(option_usage));

    if let Some(group) = group {
        parts.push(group.to_string());
        if let Some(table) = meta.group_options(group) {
            parts.extend(visible(table).into_iter().map(option_usage));
        }
    }

    let Some(command) = command else {
        if !meta.single_command_mode {
            parts.push("<command>".to_string());
        }
        parts.push("[<args>]".to_string());
        return parts.join(" ");
    };

    parts.push(command.to_string());
    if let Some(table) = meta.command_options(command) {
        parts.extend(visible(table).into_iter().map(option_usage));
    }

    let arguments = meta.arguments(command);
    if !arguments.is_empty() {
        parts.push(format!("[{SEPARATOR}]"));
        for arg in arguments {
            let label = format!("<{}>", argument_label(arg));
            parts.push(match arg {
                ArgumentSpec::Fixed(a) if a.required => label,
                ArgumentSpec::Fixed(_) => format!("[{label}]"),
                ArgumentSpec::CatchAll(_) => format!("[{label}...]"),
            });
        }
    }
    parts.join(" ")
}

fn value_names(spec: &OptionSpec) -> String {
    let name = if spec.title.trim().is_empty() {
        DEFAULT_VALUE_NAME
    } else {
        spec.title.trim()
    };
    if spec.arity > MAX_LISTED_VALUES {
        return format!("<{name}>...");
    }
    vec![format!("<{name}>"); spec.arity].join(" ")
}

fn option_usage(spec: &OptionSpec) -> String {
    let names = if spec.aliases.len() > 1 {
        format!("({})", spec.aliases.join(" | "))
    } else {
        spec.canonical().to_string()
    };
    let body = if spec.is_flag() {
        names
    } else {
        format!("{names} {}", value_names(spec))
    };
    if spec.required { body } else { format!("[{body}]") }
}

fn option_left(spec: &OptionSpec) -> String {
    let names = spec.aliases.join(", ");
    if spec.is_flag() {
        names
    } else {
        format!("{names} {}", value_names(spec))
    }
}

fn option_help(spec: &OptionSpec) -> String {
    let mut parts: Vec<String> = Vec::new();
    if !spec.description.trim().is_empty() {
        parts.push(spec.description.trim().to_string());
    }
    if spec.required {
        parts.push("Required.".to_string());
    }
    if spec.arity > 1 {
        parts.push(format!("Takes {} values.", spec.arity));
    }
    if !spec.allowed_values.is_empty() {
        parts.push(format!("Allowed values: {}.", spec.allowed_values.join(", ")));
    }
    parts.join(" ")
}

fn argument_help(spec: &ArgumentSpec) -> String {
    let mut out = spec.description().trim().to_string();
    if let ArgumentSpec::Fixed(a) = spec {
        if a.required {
            if !out.is_empty() {
                out.push(' ');
            }
            out.push_str("Required.");
        }
    }
    out
}

fn section(out: &mut String, title: &str, rows: Vec<(String, String)>) {
    if rows.is_empty() {
        return;
    }
    out.push_str(&format!("\n{title}\n"));
    let width = rows.iter().map(|(l, _)| l.len()).max().unwrap_or(0);
    for (left, help) in rows {
        if help.is_empty() {
            out.push_str(&format!("  {left}\n"));
        } else {
            out.push_str(&format!("  {left:width$}  {help}\n"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::declare::{argument, command, group, option};
    use crate::extract::{AppConfig, extract};

    #[derive(Debug, Default)]
    struct Cmd {
        v: Option<String>,
        rest: Vec<String>,
    }

    fn meta() -> Metadata {
        let add = command::<Cmd>("remote-add")
            .description("Add a remote")
            .option(
                option(["-g1", "--global1"]).global().description("A global"),
                |c, v: String| c.v = Some(v),
            )
            .option(option(["-c2"]).arity(2).title("pair").required(), |c, v: String| {
                c.v = Some(v)
            })
            .option(option(["--secret"]).hidden().flag(), |c, v: String| c.v = Some(v))
            .argument(0, argument().title("name").required(), |c, v: String| c.v = Some(v))
            .arguments(argument(), |c, v: Vec<String>| c.rest = v);
        let status = command::<Cmd>("status").description("Show status");
        let app = AppConfig {
            name: "git".to_string(),
            description: "the stupid content tracker".to_string(),
            ..Default::default()
        };
        extract(
            &app,
            &[&add, &status],
            &[group("remote").description("Manage remotes").member("remote-add")],
        )
        .unwrap()
    }

    #[test]
    fn app_help_lists_commands_and_groups() {
        let text = render(&meta(), &ParseResult::default());
        assert!(text.starts_with("git: the stupid content tracker\n"));
        assert!(text.contains("Usage: git [(-g1 | --global1) <option-arg>] <command> [<args>]"));
        assert!(text.contains("Available commands:"));
        assert!(text.contains("status"));
        assert!(text.contains("remote"));
        assert!(!text.contains("remote-add"));
    }

    #[test]
    fn command_help_shows_options_and_arguments() {
        let result = ParseResult {
            group: Some("remote".to_string()),
            command: Some("remote-add".to_string()),
            help_requested: true,
            ..Default::default()
        };
        let text = render(&meta(), &result);
        assert!(text.contains("remote-add -c2 <pair> <pair>"));
        assert!(text.contains("[--] <name> [<arguments>...]"));
        assert!(text.contains("Add a remote"));
        assert!(text.contains("-g1, --global1 <option-arg>"));
        assert!(text.contains("Required. Takes 2 values."));
        assert!(text.contains("Available arguments:"));
        assert!(!text.contains("--secret"));
    }

    #[test]
    fn group_help_lists_members() {
        let result = ParseResult {
            group: Some("remote".to_string()),
            help_requested: true,
            ..Default::default()
        };
        let text = render(&meta(), &result);
        assert!(text.contains("Manage remotes"));
        assert!(text.contains("remote-add  Add a remote"));
        assert!(!text.contains("status"));
    }

    #[test]
    fn large_arity_collapses_placeholders() {
        let wide = command::<Cmd>("wide")
            .option(option(["-z"]).arity(usize::MAX), |c, v: String| c.v = Some(v))
            .option(option(["-q"]).arity(3).title("n"), |c, v: String| c.v = Some(v));
        let meta = extract(&AppConfig::default(), &[&wide], &[]).unwrap();
        let result = ParseResult {
            command: Some("wide".to_string()),
            help_requested: true,
            ..Default::default()
        };
        let text = render(&meta, &result);
        assert!(text.contains("[-z <option-arg>...]"));
        assert!(text.contains("[-q <n> <n> <n>]"));
    }

    #[test]
    fn unknown_command_is_called_out() {
        let result = ParseResult {
            command: Some("bogus".to_string()),
            help_requested: true,
            ..Default::default()
        };
        let text = render(&meta(), &result);
        assert!(text.contains("Unknown command: bogus"));
        assert!(text.contains("Available commands:"));
    }
}
