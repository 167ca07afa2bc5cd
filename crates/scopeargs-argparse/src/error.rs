use thiserror::Error;

/// Fatal problems found while compiling declarations into `Metadata`.
///
/// Any of these aborts the build; no partial metadata is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error("command '{command}': group option '{option}' but the command is not part of any group")]
    GroupOptionOutsideGroup { command: String, option: String },

    #[error("command '{command}': group option '{option}' specified in single-command mode")]
    GroupOptionInSingleCommandMode { command: String, option: String },

    #[error("command '{command}': option '{option}' has unknown scope '{scope}'")]
    UnknownScope {
        command: String,
        option: String,
        scope: String,
    },

    #[error("command '{command}': option declared without any alias")]
    OptionWithoutAlias { command: String },

    #[error("command '{command}': more than one catch-all argument")]
    MultipleCatchAll { command: String },

    #[error("duplicate command name '{name}'")]
    DuplicateCommand { name: String },

    #[error("command name '{name}' is reserved for the help keyword")]
    ReservedCommandName { name: String },

    #[error("'{name}' is used both as a group and as a command name")]
    CommandGroupCollision { name: String },

    #[error("group '{group}' cannot be declared in single-command mode")]
    GroupInSingleCommandMode { group: String },

    #[error("group name cannot be empty")]
    EmptyGroupName,

    #[error("default command '{name}' is not a declared command")]
    UnknownDefaultCommand { name: String },

    #[error("single-command mode needs exactly one command, found {found}")]
    SingleCommandCount { found: usize },

    #[error("default command '{name}' differs from the single command '{command}'")]
    SingleCommandDefault { name: String, command: String },
}

/// Failures of the scoped token scan.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("unrecognized argument '{argument}' at position {position}")]
    InvalidArgument { argument: String, position: usize },

    #[error("option '{option}' expects {expected} value(s) but only {found} remain")]
    ArityUnderflow {
        option: String,
        expected: usize,
        found: usize,
    },
}

/// A raw value that could not be turned into the field's type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot convert '{value}' for '{field}' of command '{command}': {message}")]
pub struct ConversionError {
    pub command: String,
    pub field: String,
    pub value: String,
    pub message: String,
}

/// Failures while populating a command instance.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BindError {
    #[error("missing required option: {option}")]
    RequiredOptionMissing { option: String },

    #[error("command '{command}': missing required argument <{title}> at position {order}")]
    RequiredArgumentMissing {
        command: String,
        order: usize,
        title: String,
    },

    #[error(transparent)]
    Conversion(#[from] ConversionError),

    #[error("command factory returned an instance of the wrong type for '{command}' (expected {expected})")]
    FactoryMismatch { command: String, expected: String },
}

/// Everything `Outline::parse` can fail with.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OutlineError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Bind(#[from] BindError),

    #[error("command not specified")]
    MissingCommand,
}
