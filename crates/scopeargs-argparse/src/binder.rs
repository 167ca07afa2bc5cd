//! Populates a command instance from a `ParseResult`.
//!
//! Three passes run in a fixed order: options, fixed arguments (ascending
//! order), then the catch-all argument.

use scopeargs_metadata::{ArgumentSpec, OptionSpec};

use crate::convert::{ConverterRegistry, FieldContext, FieldKind};
use crate::declare::{CommandDef, Setter};
use crate::error::{BindError, ConversionError};
use crate::parser::ParseResult;
use crate::raw::RawValue;

/// What happens when a value cannot be converted to its field type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConversionPolicy {
    /// Leave the field at its constructed value and record the failure.
    #[default]
    KeepDefault,
    /// Fail the whole bind.
    Abort,
}

/// A value given for an option outside its allowed list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisallowedValue {
    pub command: String,
    pub option: String,
    pub value: String,
    pub allowed: Vec<String>,
}

/// Non-fatal findings of one bind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BindReport {
    pub conversion_errors: Vec<ConversionError>,
    pub disallowed_values: Vec<DisallowedValue>,
}

impl BindReport {
    pub fn is_clean(&self) -> bool {
        self.conversion_errors.is_empty() && self.disallowed_values.is_empty()
    }
}

/// Shared, read-only inputs of a bind.
#[derive(Debug, Clone, Copy)]
pub struct Binder<'a> {
    pub registry: &'a ConverterRegistry,
    pub policy: ConversionPolicy,
}

impl<'a> Binder<'a> {
    pub fn new(registry: &'a ConverterRegistry, policy: ConversionPolicy) -> Self {
        Self { registry, policy }
    }

    /// Bind `result` into `instance` using the fields declared on `def`.
    pub fn bind<T: 'static>(
        &self,
        def: &CommandDef<T>,
        instance: &mut T,
        result: &ParseResult,
    ) -> Result<BindReport, BindError> {
        let command = def.name();
        let mut report = BindReport::default();

        for field in &def.options {
            self.bind_option(command, &field.spec, &field.setter, instance, result, &mut report)?;
        }

        let mut fixed: Vec<_> = def.arguments.iter().collect();
        fixed.sort_by_key(|a| a.spec.sort_key());

        let mut max_order: Option<usize> = None;
        for field in &fixed {
            let ArgumentSpec::Fixed(arg) = &field.spec else {
                continue;
            };
            let Some(token) = result.arguments.get(arg.order) else {
                if arg.required {
                    return Err(BindError::RequiredArgumentMissing {
                        command: command.to_string(),
                        order: arg.order,
                        title: argument_label(&field.spec),
                    });
                }
                continue;
            };
            max_order = Some(max_order.map_or(arg.order, |m| m.max(arg.order)));

            let label = argument_label(&field.spec);
            let ctx = FieldContext {
                command,
                field: &label,
                kind: FieldKind::Argument,
            };
            let raw = RawValue::Scalar(token.clone());
            self.apply(&ctx, &field.setter, instance, &raw, &mut report)?;
        }

        if let Some(field) = fixed.iter().find(|a| a.spec.is_catch_all()) {
            let start = max_order.map_or(0, |m| m + 1);
            let rest = result.arguments.get(start..).unwrap_or_default();
            let raw = if rest.is_empty() {
                RawValue::Absent
            } else {
                RawValue::Sequence(rest.to_vec())
            };
            let label = argument_label(&field.spec);
            let ctx = FieldContext {
                command,
                field: &label,
                kind: FieldKind::CatchAll,
            };
            self.apply(&ctx, &field.setter, instance, &raw, &mut report)?;
        }

        tracing::debug!(
            command,
            conversion_errors = report.conversion_errors.len(),
            disallowed_values = report.disallowed_values.len(),
            "bound command"
        );
        Ok(report)
    }

    fn bind_option<T: 'static>(
        &self,
        command: &str,
        spec: &OptionSpec,
        setter: &Setter<T>,
        instance: &mut T,
        result: &ParseResult,
        report: &mut BindReport,
    ) -> Result<(), BindError> {
        let gathered = gather(spec, result);
        if spec.required && gathered.is_none() {
            return Err(BindError::RequiredOptionMissing {
                option: spec.canonical().to_string(),
            });
        }

        for value in gathered.iter().flatten() {
            if !spec.allows(value) {
                tracing::warn!(
                    command,
                    option = spec.canonical(),
                    value = value.as_str(),
                    allowed = ?spec.allowed_values,
                    "value is not one of the allowed values"
                );
                report.disallowed_values.push(DisallowedValue {
                    command: command.to_string(),
                    option: spec.canonical().to_string(),
                    value: value.clone(),
                    allowed: spec.allowed_values.clone(),
                });
            }
        }

        let ctx = FieldContext {
            command,
            field: spec.canonical(),
            kind: FieldKind::Option,
        };
        self.apply(&ctx, setter, instance, &RawValue::from_values(gathered), report)
    }

    fn apply<T>(
        &self,
        ctx: &FieldContext<'_>,
        setter: &Setter<T>,
        instance: &mut T,
        raw: &RawValue,
        report: &mut BindReport,
    ) -> Result<(), BindError> {
        if raw.is_absent() {
            return Ok(());
        }
        let Err(message) = setter(instance, ctx, self.registry, raw) else {
            return Ok(());
        };

        let err = ConversionError {
            command: ctx.command.to_string(),
            field: ctx.field.to_string(),
            value: raw.to_string(),
            message,
        };
        match self.policy {
            ConversionPolicy::Abort => Err(err.into()),
            ConversionPolicy::KeepDefault => {
                tracing::warn!(error = %err, "conversion failed, keeping default");
                report.conversion_errors.push(err);
                Ok(())
            }
        }
    }
}

/// Values for `spec` across all of its aliases, in encounter order.
/// `None` when the option never appeared.
fn gather(spec: &OptionSpec, result: &ParseResult) -> Option<Vec<String>> {
    let mut gathered: Option<Vec<String>> = None;
    for alias in &spec.aliases {
        if let Some(values) = result.values(spec.scope, alias) {
            gathered.get_or_insert_with(Vec::new).extend_from_slice(values);
        }
    }
    gathered
}

/// Display name for a positional slot: its title, or `argN` / `arguments`.
pub fn argument_label(spec: &ArgumentSpec) -> String {
    match spec {
        _ if !spec.title().is_empty() => spec.title().to_string(),
        ArgumentSpec::Fixed(arg) => format!("arg{}", arg.order),
        ArgumentSpec::CatchAll(_) => "arguments".to_string(),
    }
}
