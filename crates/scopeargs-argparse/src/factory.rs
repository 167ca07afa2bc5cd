use std::any::{Any, TypeId, type_name};
use std::fmt;
use std::sync::Arc;

type Constructor = Arc<dyn Fn() -> Box<dyn Any> + Send + Sync>;

/// Identifies the Rust type behind a command, plus its registered constructor.
#[derive(Clone)]
pub struct TypeHandle {
    id: TypeId,
    name: &'static str,
    construct: Constructor,
}

impl fmt::Debug for TypeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeHandle").field("name", &self.name).finish()
    }
}

impl TypeHandle {
    /// Handle that constructs with `T::default()`.
    pub fn of<T: Default + 'static>() -> Self {
        Self::with_constructor(T::default)
    }

    pub fn with_constructor<T, F>(construct: F) -> Self
    where
        T: 'static,
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
            construct: Arc::new(move || Box::new(construct()) as Box<dyn Any>),
        }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is<T: 'static>(&self) -> bool {
        self.id == TypeId::of::<T>()
    }

    /// Run the registered constructor.
    pub fn construct(&self) -> Box<dyn Any> {
        (self.construct)()
    }
}

/// Creates command instances. Substitute this to inject dependencies.
pub trait CommandFactory: Send + Sync {
    fn create_instance(&self, handle: &TypeHandle) -> Box<dyn Any>;
}

/// Uses the constructor captured when the command was declared.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultCommandFactory;

impl CommandFactory for DefaultCommandFactory {
    fn create_instance(&self, handle: &TypeHandle) -> Box<dyn Any> {
        handle.construct()
    }
}
