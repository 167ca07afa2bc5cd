//! Commands declared in JSON, bound into an ordered field → value map.

use std::any::Any;

use indexmap::IndexMap;
use scopeargs_argparse::declare::DEFAULT_ARITY;
use scopeargs_argparse::{
    ArgumentDef, CommandDef, ConfigurationError, FieldContext, Outline, OutlineBuilder, RawValue,
    argument, group, option,
};
use serde::Serialize;
use serde_json::{Number, Value};

use crate::manifest::{ArgumentManifest, CommandManifest, Manifest, OptionManifest, ValueKind};

/// Instance type of every declared command.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DynamicCommand {
    pub command: String,
    pub values: IndexMap<String, Value>,
    #[serde(skip)]
    kinds: IndexMap<String, ValueKind>,
}

impl DynamicCommand {
    fn new(command: String, kinds: IndexMap<String, ValueKind>) -> Self {
        Self {
            command,
            values: IndexMap::new(),
            kinds,
        }
    }

    fn kind_of(&self, field: &str) -> ValueKind {
        self.kinds.get(field).copied().unwrap_or_default()
    }
}

/// A converted value, tagged with the field it belongs to.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldValue {
    pub field: String,
    pub value: Value,
}

/// Compile a declaration file into an `Outline`.
pub fn build_outline(manifest: &Manifest) -> Result<Outline<DynamicCommand>, ConfigurationError> {
    let mut builder = OutlineBuilder::<DynamicCommand>::new(manifest.name.clone())
        .description(manifest.description.clone())
        .single_command_mode(manifest.single_command)
        .with_converter::<FieldValue, _>(convert_field);

    if let Some(keyword) = &manifest.help_keyword {
        builder = builder.help_keyword(keyword.clone());
    }
    if let Some(enabled) = manifest.help_on_incorrect_arguments {
        builder = builder.help_on_incorrect_arguments(enabled);
    }
    if let Some(name) = &manifest.default_command {
        builder = builder.default_command(name.clone());
    }

    for g in &manifest.groups {
        let mut def = group(g.name.clone()).description(g.description.clone());
        for member in &g.commands {
            def = def.member(member.clone());
        }
        builder = builder.group(def);
    }

    for cmd in &manifest.commands {
        builder = builder.command(command_def(cmd));
    }

    builder.build()
}

fn command_def(cmd: &CommandManifest) -> CommandDef<DynamicCommand> {
    let mut kinds = IndexMap::new();
    for opt in &cmd.options {
        if let Some(name) = opt.names.first() {
            kinds.insert(name.clone(), opt.kind);
        }
    }
    for (index, arg) in cmd.arguments.iter().enumerate() {
        kinds.insert(argument_field(arg, index), arg.kind);
    }

    let name = cmd.name.clone();
    let mut def = CommandDef::with_constructor(cmd.name.clone(), move || {
        DynamicCommand::new(name.clone(), kinds.clone())
    })
    .description(cmd.description.clone());

    if let Some(g) = &cmd.group {
        def = def.group(g.clone());
    }
    if cmd.hidden {
        def = def.hidden();
    }

    for opt in &cmd.options {
        def = def.option_converted(option_def(opt), store);
    }

    for (index, arg) in cmd.arguments.iter().enumerate() {
        let spec = argument_def(arg);
        def = if arg.catch_all {
            def.arguments_converted(spec, store)
        } else {
            def.argument_converted(arg.order.unwrap_or(index), spec, store)
        };
    }
    def
}

fn store(command: &mut DynamicCommand, value: FieldValue) {
    command.values.insert(value.field, value.value);
}

fn option_def(opt: &OptionManifest) -> scopeargs_argparse::OptionDef {
    let default_arity = match opt.kind {
        ValueKind::Boolean => 0,
        _ => DEFAULT_ARITY,
    };
    let mut def = option(opt.names.clone())
        .arity(opt.arity.unwrap_or(default_arity))
        .allowed_values(opt.allowed_values.clone())
        .title(opt.title.clone())
        .description(opt.description.clone());
    if let Some(scope) = &opt.scope {
        def = def.scope_named(scope);
    }
    if opt.required {
        def = def.required();
    }
    if opt.hidden {
        def = def.hidden();
    }
    def
}

fn argument_def(arg: &ArgumentManifest) -> ArgumentDef {
    let mut def = argument()
        .title(arg.title.clone())
        .description(arg.description.clone());
    if arg.required {
        def = def.required();
    }
    def
}

/// Field name the binder reports for a positional slot.
fn argument_field(arg: &ArgumentManifest, index: usize) -> String {
    if !arg.title.is_empty() {
        arg.title.clone()
    } else if arg.catch_all {
        "arguments".to_string()
    } else {
        format!("arg{}", arg.order.unwrap_or(index))
    }
}

fn convert_field(ctx: &FieldContext<'_>, instance: &dyn Any, raw: &RawValue) -> Result<FieldValue, String> {
    let kind = instance
        .downcast_ref::<DynamicCommand>()
        .map(|c| c.kind_of(ctx.field))
        .unwrap_or_default();

    let value = match raw {
        RawValue::Absent => Value::Null,
        RawValue::Flag => match kind {
            ValueKind::Boolean => Value::Bool(true),
            _ => return Err("expected a value".to_string()),
        },
        RawValue::Scalar(s) => typed(kind, s)?,
        RawValue::Sequence(items) => Value::Array(
            items
                .iter()
                .map(|s| typed(kind, s))
                .collect::<Result<Vec<_>, _>>()?,
        ),
    };

    Ok(FieldValue {
        field: ctx.field.to_string(),
        value,
    })
}

fn typed(kind: ValueKind, s: &str) -> Result<Value, String> {
    match kind {
        ValueKind::String => Ok(Value::String(s.to_string())),
        ValueKind::Integer => s
            .parse::<i64>()
            .map(Value::from)
            .map_err(|e| format!("invalid integer: {e}")),
        ValueKind::Number => {
            let n: f64 = s.parse().map_err(|e| format!("invalid number: {e}"))?;
            Number::from_f64(n)
                .map(Value::Number)
                .ok_or_else(|| format!("number out of range: {s}"))
        }
        ValueKind::Boolean => s
            .parse::<bool>()
            .map(Value::Bool)
            .map_err(|e| format!("invalid boolean: {e}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::sample_manifest;
    use scopeargs_argparse::{Outcome, OutlineError};
    use serde_json::json;

    fn argv(s: &str) -> Vec<String> {
        s.split_whitespace().map(str::to_string).collect()
    }

    fn bound(outline: &Outline<DynamicCommand>, input: &str) -> DynamicCommand {
        match outline.parse(&argv(input)) {
            Ok(Outcome::Command(c)) => c,
            other => panic!("expected a bound command, got {other:?}"),
        }
    }

    #[test]
    fn sample_binds_typed_values() {
        let outline = build_outline(&sample_manifest("git")).unwrap();

        let status = bound(&outline, "-v status -d 3");
        assert_eq!(status.command, "status");
        assert_eq!(status.values["-v"], json!(true));
        assert_eq!(status.values["-d"], json!(3));

        let add = bound(&outline, "remote -t main remote-add --fetch origin https://example.com/repo");
        assert_eq!(add.command, "remote-add");
        assert_eq!(add.values["-t"], json!("main"));
        assert_eq!(add.values["-f"], json!(true));
        assert_eq!(add.values["name"], json!("origin"));
        assert_eq!(add.values["url"], json!("https://example.com/repo"));

        let paths = bound(&outline, "add a.txt b.txt");
        assert_eq!(paths.values["paths"], json!(["a.txt", "b.txt"]));
    }

    #[test]
    fn conversion_failures_are_reported() {
        let outline = build_outline(&sample_manifest("git")).unwrap();
        let (outcome, report) = outline.parse_reported(&argv("status -d deep")).unwrap();
        let Outcome::Command(status) = outcome else {
            panic!("expected status");
        };
        assert!(!status.values.contains_key("-d"));
        assert_eq!(report.conversion_errors.len(), 1);
        assert!(report.conversion_errors[0].message.contains("invalid integer"));
    }

    #[test]
    fn disallowed_values_are_reported() {
        let outline = build_outline(&sample_manifest("git")).unwrap();
        let (_, report) = outline
            .parse_reported(&argv("remote-add -m both origin url"))
            .unwrap();
        assert_eq!(report.disallowed_values.len(), 1);
        assert_eq!(report.disallowed_values[0].value, "both");
    }

    #[test]
    fn missing_required_argument_fails() {
        let outline = build_outline(&sample_manifest("git")).unwrap();
        let err = outline.parse(&argv("remote-add origin")).unwrap_err();
        assert!(matches!(err, OutlineError::Bind(_)));
    }

    #[test]
    fn unknown_scope_is_rejected() {
        let mut manifest = sample_manifest("git");
        manifest.commands[0].options[0].scope = Some("session".to_string());
        let err = build_outline(&manifest).unwrap_err();
        assert!(matches!(err, ConfigurationError::UnknownScope { .. }));
    }

    #[test]
    fn single_command_declaration_defaults_to_its_command() {
        let manifest = Manifest {
            name: "ping".to_string(),
            single_command: true,
            commands: vec![CommandManifest {
                name: "ping".to_string(),
                ..Default::default()
            }],
            ..Default::default()
        };
        let outline = build_outline(&manifest).unwrap();
        let Ok(Outcome::Command(ping)) = outline.parse(&[]) else {
            panic!("expected the single command");
        };
        assert_eq!(ping.command, "ping");

        let mut two = manifest.clone();
        two.commands.push(CommandManifest {
            name: "pong".to_string(),
            ..Default::default()
        });
        let err = build_outline(&two).unwrap_err();
        assert_eq!(err, ConfigurationError::SingleCommandCount { found: 2 });
    }

    #[test]
    fn argument_fields_follow_titles_or_positions() {
        let titled = ArgumentManifest {
            title: "src".to_string(),
            ..Default::default()
        };
        assert_eq!(argument_field(&titled, 0), "src");
        assert_eq!(argument_field(&ArgumentManifest::default(), 2), "arg2");
        let rest = ArgumentManifest {
            catch_all: true,
            ..Default::default()
        };
        assert_eq!(argument_field(&rest, 0), "arguments");
    }

    #[test]
    fn typed_conversion() {
        assert_eq!(typed(ValueKind::Number, "2.5"), Ok(json!(2.5)));
        assert!(typed(ValueKind::Boolean, "yes").is_err());
        assert_eq!(typed(ValueKind::String, "x"), Ok(json!("x")));
    }
}
