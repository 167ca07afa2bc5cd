//! Explicit registration API.
//!
//! A command is declared with `command::<T>(name)` and one call per field. Each
//! call records an immutable spec and captures a setter for the field, so the
//! binder never has to inspect `T` at runtime.

use std::any::type_name;

use scopeargs_metadata::{ArgumentSpec, CatchAllArgument, CommandSpec, FixedArgument, OptionScope, OptionSpec};

use crate::convert::{ConverterRegistry, FieldContext};
use crate::factory::TypeHandle;
use crate::raw::{FromRaw, RawValue};

/// Arity an option gets unless `.arity()` or `.flag()` says otherwise.
pub const DEFAULT_ARITY: usize = 1;

pub(crate) type Setter<T> = Box<
    dyn Fn(&mut T, &FieldContext<'_>, &ConverterRegistry, &RawValue) -> Result<(), String>
        + Send
        + Sync,
>;

fn setter<T, F>(f: F) -> Setter<T>
where
    F: Fn(&mut T, &FieldContext<'_>, &ConverterRegistry, &RawValue) -> Result<(), String>
        + Send
        + Sync
        + 'static,
{
    Box::new(f)
}

fn typed_setter<T, V, F>(set: F) -> Setter<T>
where
    T: 'static,
    V: FromRaw + 'static,
    F: Fn(&mut T, V) + Send + Sync + 'static,
{
    setter(move |instance: &mut T, ctx, registry, raw| {
        let value = match registry.convert::<V>(ctx, &*instance, raw) {
            Some(converted) => converted?,
            None => V::from_raw(raw)?,
        };
        set(instance, value);
        Ok(())
    })
}

fn converted_setter<T, V, F>(set: F) -> Setter<T>
where
    T: 'static,
    V: 'static,
    F: Fn(&mut T, V) + Send + Sync + 'static,
{
    setter(move |instance: &mut T, ctx, registry, raw| {
        let value = registry
            .convert::<V>(ctx, &*instance, raw)
            .unwrap_or_else(|| Err(format!("no converter registered for {}", type_name::<V>())))?;
        set(instance, value);
        Ok(())
    })
}

/// Builder for an option declaration.
#[derive(Debug, Clone)]
pub struct OptionDef {
    spec: OptionSpec,
    unknown_scope: Option<String>,
}

/// Start an option declaration. The first alias is the canonical one.
pub fn option<I, S>(aliases: I) -> OptionDef
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    OptionDef {
        spec: OptionSpec {
            scope: OptionScope::Command,
            aliases: aliases.into_iter().map(Into::into).collect(),
            arity: DEFAULT_ARITY,
            required: false,
            allowed_values: Vec::new(),
            hidden: false,
            title: String::new(),
            description: String::new(),
        },
        unknown_scope: None,
    }
}

impl OptionDef {
    pub fn scope(mut self, scope: OptionScope) -> Self {
        self.spec.scope = scope;
        self.unknown_scope = None;
        self
    }

    /// Scope given as text. Unknown names are rejected when metadata is built.
    pub fn scope_named(mut self, scope: &str) -> Self {
        match scope.parse::<OptionScope>() {
            Ok(scope) => return self.scope(scope),
            Err(_) => self.unknown_scope = Some(scope.to_string()),
        }
        self
    }

    pub fn global(self) -> Self {
        self.scope(OptionScope::Global)
    }

    pub fn group_scoped(self) -> Self {
        self.scope(OptionScope::Group)
    }

    pub fn arity(mut self, arity: usize) -> Self {
        self.spec.arity = arity;
        self
    }

    /// Presence-only option (arity 0).
    pub fn flag(self) -> Self {
        self.arity(0)
    }

    pub fn required(mut self) -> Self {
        self.spec.required = true;
        self
    }

    pub fn allowed_values<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.spec.allowed_values = values.into_iter().map(Into::into).collect();
        self
    }

    pub fn hidden(mut self) -> Self {
        self.spec.hidden = true;
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.spec.title = title.into();
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.spec.description = description.into();
        self
    }

    pub fn spec(&self) -> &OptionSpec {
        &self.spec
    }
}

/// Builder for a positional argument declaration.
#[derive(Debug, Clone, Default)]
pub struct ArgumentDef {
    required: bool,
    title: String,
    description: String,
}

pub fn argument() -> ArgumentDef {
    ArgumentDef::default()
}

impl ArgumentDef {
    /// Only meaningful for fixed arguments.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    fn fixed(self, order: usize) -> ArgumentSpec {
        ArgumentSpec::Fixed(FixedArgument {
            order,
            required: self.required,
            title: self.title,
            description: self.description,
        })
    }

    fn catch_all(self) -> ArgumentSpec {
        ArgumentSpec::CatchAll(CatchAllArgument {
            title: self.title,
            description: self.description,
        })
    }
}

pub(crate) struct OptionField<T> {
    pub(crate) spec: OptionSpec,
    pub(crate) unknown_scope: Option<String>,
    pub(crate) setter: Setter<T>,
}

pub(crate) struct ArgumentField<T> {
    pub(crate) spec: ArgumentSpec,
    pub(crate) setter: Setter<T>,
}

/// A declared command binding into `T`.
pub struct CommandDef<T> {
    spec: CommandSpec,
    handle: TypeHandle,
    pub(crate) options: Vec<OptionField<T>>,
    pub(crate) arguments: Vec<ArgumentField<T>>,
}

impl<T> std::fmt::Debug for CommandDef<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandDef")
            .field("spec", &self.spec)
            .field("options", &self.options.iter().map(|o| &o.spec).collect::<Vec<_>>())
            .field("arguments", &self.arguments.iter().map(|a| &a.spec).collect::<Vec<_>>())
            .finish()
    }
}

/// Declare a command constructed with `T::default()`.
///
/// ```rust,ignore
/// use scopeargs_argparse::{argument, command, option};
///
/// #[derive(Default)]
/// struct RemoteAdd { name: Option<String>, url: Option<String>, fetch: bool }
///
/// let def = command::<RemoteAdd>("remote-add")
///     .group("remote")
///     .description("Add a remote")
///     .option(option(["-f", "--fetch"]).flag(), |c, v: bool| c.fetch = v)
///     .argument(0, argument().title("name").required(), |c, v: String| c.name = Some(v))
///     .argument(1, argument().title("url").required(), |c, v: String| c.url = Some(v));
/// ```
pub fn command<T: Default + 'static>(name: impl Into<String>) -> CommandDef<T> {
    CommandDef::new(name)
}

impl<T: 'static> CommandDef<T> {
    pub fn new(name: impl Into<String>) -> Self
    where
        T: Default,
    {
        Self::with_constructor(name, T::default)
    }

    pub fn with_constructor<F>(name: impl Into<String>, construct: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self {
            spec: CommandSpec {
                name: name.into(),
                type_name: type_name::<T>().to_string(),
                ..Default::default()
            },
            handle: TypeHandle::with_constructor(construct),
            options: Vec::new(),
            arguments: Vec::new(),
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.spec.description = description.into();
        self
    }

    /// Declaration-level group. An explicit `GroupDef` membership wins over this.
    pub fn group(mut self, group: impl Into<String>) -> Self {
        self.spec.group = Some(group.into());
        self
    }

    pub fn hidden(mut self) -> Self {
        self.spec.hidden = true;
        self
    }

    /// Replace the constructor used by the default factory.
    pub fn factory<F>(mut self, construct: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.handle = TypeHandle::with_constructor(construct);
        self
    }

    pub fn option<V, F>(self, def: OptionDef, set: F) -> Self
    where
        V: FromRaw + 'static,
        F: Fn(&mut T, V) + Send + Sync + 'static,
    {
        self.push_option(def, typed_setter(set))
    }

    /// Like `option`, for field types that rely on a registered converter.
    pub fn option_converted<V, F>(self, def: OptionDef, set: F) -> Self
    where
        V: 'static,
        F: Fn(&mut T, V) + Send + Sync + 'static,
    {
        self.push_option(def, converted_setter(set))
    }

    /// Fixed positional argument at `order` (zero-based).
    pub fn argument<V, F>(mut self, order: usize, def: ArgumentDef, set: F) -> Self
    where
        V: FromRaw + 'static,
        F: Fn(&mut T, V) + Send + Sync + 'static,
    {
        self.arguments.push(ArgumentField {
            spec: def.fixed(order),
            setter: typed_setter(set),
        });
        self
    }

    pub fn argument_converted<V, F>(mut self, order: usize, def: ArgumentDef, set: F) -> Self
    where
        V: 'static,
        F: Fn(&mut T, V) + Send + Sync + 'static,
    {
        self.arguments.push(ArgumentField {
            spec: def.fixed(order),
            setter: converted_setter(set),
        });
        self
    }

    /// Catch-all receiving every positional token no fixed argument claimed.
    pub fn arguments<V, F>(mut self, def: ArgumentDef, set: F) -> Self
    where
        V: FromRaw + 'static,
        F: Fn(&mut T, V) + Send + Sync + 'static,
    {
        self.arguments.push(ArgumentField {
            spec: def.catch_all(),
            setter: typed_setter(set),
        });
        self
    }

    pub fn arguments_converted<V, F>(mut self, def: ArgumentDef, set: F) -> Self
    where
        V: 'static,
        F: Fn(&mut T, V) + Send + Sync + 'static,
    {
        self.arguments.push(ArgumentField {
            spec: def.catch_all(),
            setter: converted_setter(set),
        });
        self
    }

    fn push_option(mut self, def: OptionDef, setter: Setter<T>) -> Self {
        self.options.push(OptionField {
            spec: def.spec,
            unknown_scope: def.unknown_scope,
            setter,
        });
        self
    }
}

impl<T> CommandDef<T> {
    pub fn name(&self) -> &str {
        &self.spec.name
    }

    pub fn handle(&self) -> &TypeHandle {
        &self.handle
    }
}

/// One option as seen by the metadata extractor.
#[derive(Debug, Clone, Copy)]
pub struct DeclaredOption<'a> {
    pub spec: &'a OptionSpec,
    /// Set when the scope was given as text that names no known scope.
    pub unknown_scope: Option<&'a str>,
}

/// Read-only view of a command declaration, independent of its instance type.
pub trait Declaration {
    fn spec(&self) -> &CommandSpec;
    fn declared_options(&self) -> Vec<DeclaredOption<'_>>;
    fn declared_arguments(&self) -> Vec<&ArgumentSpec>;
}

impl<T> Declaration for CommandDef<T> {
    fn spec(&self) -> &CommandSpec {
        &self.spec
    }

    fn declared_options(&self) -> Vec<DeclaredOption<'_>> {
        self.options
            .iter()
            .map(|o| DeclaredOption {
                spec: &o.spec,
                unknown_scope: o.unknown_scope.as_deref(),
            })
            .collect()
    }

    fn declared_arguments(&self) -> Vec<&ArgumentSpec> {
        self.arguments.iter().map(|a| &a.spec).collect()
    }
}

/// Explicit group assignment made at the application level.
#[derive(Debug, Clone, Default)]
pub struct GroupDef {
    pub(crate) name: String,
    pub(crate) description: String,
    pub(crate) members: Vec<String>,
}

pub fn group(name: impl Into<String>) -> GroupDef {
    GroupDef {
        name: name.into(),
        ..Default::default()
    }
}

impl GroupDef {
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Assign a command (by name) to this group.
    pub fn member(mut self, command: impl Into<String>) -> Self {
        let command = command.into();
        if !self.members.contains(&command) {
            self.members.push(command);
        }
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn has_member(&self, command: &str) -> bool {
        self.members.iter().any(|m| m == command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default)]
    struct Sample {
        name: Option<String>,
        verbose: bool,
    }

    #[test]
    fn option_defaults_to_command_scope_and_arity_one() {
        let def = option(["-n", "--name"]);
        assert_eq!(def.spec().scope, OptionScope::Command);
        assert_eq!(def.spec().arity, DEFAULT_ARITY);
        assert_eq!(def.spec().canonical(), "-n");
        assert!(option(["-v"]).flag().spec().is_flag());
    }

    #[test]
    fn scope_named_records_unknown_text() {
        let known = option(["-g"]).scope_named("Global");
        assert_eq!(known.spec().scope, OptionScope::Global);
        assert!(known.unknown_scope.is_none());

        let unknown = option(["-g"]).scope_named("session");
        assert_eq!(unknown.unknown_scope.as_deref(), Some("session"));
    }

    #[test]
    fn command_def_records_fields_in_order() {
        let def = command::<Sample>("sample")
            .description("a sample")
            .group("things")
            .option(option(["-v"]).flag(), |c, v: bool| c.verbose = v)
            .argument(0, argument().title("name"), |c, v: String| c.name = Some(v));

        assert_eq!(def.name(), "sample");
        assert_eq!(def.spec().group.as_deref(), Some("things"));
        assert!(def.spec().type_name.ends_with("Sample"));
        assert_eq!(def.declared_options().len(), 1);
        assert!(matches!(
            def.declared_arguments()[0],
            ArgumentSpec::Fixed(FixedArgument { order: 0, .. })
        ));
    }

    #[test]
    fn setter_falls_back_to_from_raw() {
        let def = command::<Sample>("sample")
            .option(option(["-n"]), |c, v: String| c.name = Some(v));
        let registry = ConverterRegistry::new();
        let ctx = FieldContext {
            command: "sample",
            field: "-n",
            kind: crate::convert::FieldKind::Option,
        };
        let mut instance = Sample::default();
        (def.options[0].setter)(&mut instance, &ctx, &registry, &RawValue::Scalar("x".into()))
            .unwrap();
        assert_eq!(instance.name.as_deref(), Some("x"));
    }

    #[test]
    fn group_def_deduplicates_members() {
        let g = group("remote").member("remote-add").member("remote-add");
        assert_eq!(g.members.len(), 1);
        assert!(g.has_member("remote-add"));
    }
}
