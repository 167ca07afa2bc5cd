use std::any::{Any, TypeId, type_name};
use std::collections::HashMap;
use std::fmt;

use crate::raw::RawValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Option,
    Argument,
    CatchAll,
}

/// What a converter is being asked to fill.
#[derive(Debug, Clone, Copy)]
pub struct FieldContext<'a> {
    pub command: &'a str,
    /// Canonical alias for options, title (or `argN`/`arguments`) for positionals.
    pub field: &'a str,
    pub kind: FieldKind,
}

type ErasedConverter = Box<
    dyn Fn(&FieldContext<'_>, &dyn Any, &RawValue) -> Result<Box<dyn Any>, String> + Send + Sync,
>;

fn erase<F>(f: F) -> ErasedConverter
where
    F: Fn(&FieldContext<'_>, &dyn Any, &RawValue) -> Result<Box<dyn Any>, String>
        + Send
        + Sync
        + 'static,
{
    Box::new(f)
}

struct Entry {
    type_name: &'static str,
    convert: ErasedConverter,
}

/// Target type → conversion function.
///
/// Owned by an `Outline` and handed to the binder; it is filled before the
/// first parse and only read afterwards.
#[derive(Default)]
pub struct ConverterRegistry {
    converters: HashMap<TypeId, Entry>,
}

impl fmt::Debug for ConverterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.converters.values().map(|e| e.type_name).collect();
        names.sort_unstable();
        f.debug_struct("ConverterRegistry")
            .field("types", &names)
            .finish()
    }
}

impl ConverterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the conversion for `V`. A later registration for the same type
    /// replaces the earlier one.
    pub fn register<V, F>(&mut self, convert: F)
    where
        V: 'static,
        F: Fn(&FieldContext<'_>, &dyn Any, &RawValue) -> Result<V, String> + Send + Sync + 'static,
    {
        let entry = Entry {
            type_name: type_name::<V>(),
            convert: erase(move |ctx, instance, raw| {
                convert(ctx, instance, raw).map(|v| Box::new(v) as Box<dyn Any>)
            }),
        };
        if self.converters.insert(TypeId::of::<V>(), entry).is_some() {
            tracing::debug!(target_type = type_name::<V>(), "replaced type converter");
        }
    }

    pub fn contains<V: 'static>(&self) -> bool {
        self.converters.contains_key(&TypeId::of::<V>())
    }

    pub fn len(&self) -> usize {
        self.converters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.converters.is_empty()
    }

    /// Run the converter for `V`, or `None` when no converter is registered.
    pub fn convert<V: 'static>(
        &self,
        ctx: &FieldContext<'_>,
        instance: &dyn Any,
        raw: &RawValue,
    ) -> Option<Result<V, String>> {
        let entry = self.converters.get(&TypeId::of::<V>())?;
        let converted = (entry.convert)(ctx, instance, raw).and_then(|boxed| {
            boxed
                .downcast::<V>()
                .map(|v| *v)
                .map_err(|_| format!("converter did not produce a {}", type_name::<V>()))
        });
        Some(converted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> FieldContext<'static> {
        FieldContext {
            command: "cmd",
            field: "-x",
            kind: FieldKind::Option,
        }
    }

    #[derive(Debug, PartialEq)]
    struct Upper(String);

    #[test]
    fn unregistered_type_yields_none() {
        let registry = ConverterRegistry::new();
        let out = registry.convert::<Upper>(&ctx(), &(), &RawValue::Flag);
        assert!(out.is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn later_registration_replaces_earlier() {
        let mut registry = ConverterRegistry::new();
        registry.register::<Upper, _>(|_, _, _| Ok(Upper("first".to_string())));
        registry.register::<Upper, _>(|_, _, raw| Ok(Upper(raw.to_string().to_uppercase())));
        assert_eq!(registry.len(), 1);
        assert!(registry.contains::<Upper>());

        let raw = RawValue::Scalar("abc".to_string());
        let out = registry.convert::<Upper>(&ctx(), &(), &raw);
        assert_eq!(out, Some(Ok(Upper("ABC".to_string()))));
    }

    #[test]
    fn converter_sees_instance_and_context() {
        let mut registry = ConverterRegistry::new();
        registry.register::<String, _>(|ctx, instance, raw| {
            let prefix = instance
                .downcast_ref::<&str>()
                .copied()
                .unwrap_or("none");
            Ok(format!("{prefix}:{}:{raw}", ctx.field))
        });
        let instance: &str = "cmd-instance";
        let out = registry.convert::<String>(&ctx(), &instance, &RawValue::Scalar("v".to_string()));
        assert_eq!(out, Some(Ok("cmd-instance:-x:v".to_string())));
    }
}
