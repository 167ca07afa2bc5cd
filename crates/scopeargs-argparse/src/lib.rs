//! Scoped argument parsing for multi-command tools.
//!
//! Commands are declared explicitly, compiled once into `Metadata`, and argv
//! is then scanned through global, group and command scopes before the values
//! are bound onto a fresh command instance.
//!
//! ```rust,ignore
//! use scopeargs_argparse::{Outcome, Outline, argument, command, option};
//!
//! #[derive(Debug, Default)]
//! struct Add { verbose: bool, paths: Vec<String> }
//!
//! let outline = Outline::<Add>::builder("git")
//!     .command(
//!         command::<Add>("add")
//!             .option(option(["-v", "--verbose"]).global().flag(), |c, v: bool| c.verbose = v)
//!             .arguments(argument().title("paths"), |c, v: Vec<String>| c.paths = v),
//!     )
//!     .build()?;
//!
//! match outline.parse(&argv)? {
//!     Outcome::Command(add) => run(add),
//!     Outcome::Help(request) => print!("{}", outline.help(&request)),
//!     Outcome::NoCommand => print!("{}", outline.usage()),
//! }
//! ```

pub mod binder;
pub mod convert;
pub mod cursor;
pub mod declare;
pub mod error;
pub mod extract;
pub mod factory;
pub mod help;
pub mod outline;
pub mod parser;
pub mod raw;

pub use binder::{BindReport, Binder, ConversionPolicy, DisallowedValue};
pub use convert::{ConverterRegistry, FieldContext, FieldKind};
pub use cursor::TokenCursor;
pub use declare::{
    ArgumentDef, CommandDef, Declaration, GroupDef, OptionDef, argument, command, group, option,
};
pub use error::{BindError, ConfigurationError, ConversionError, OutlineError, ParseError};
pub use extract::{AppConfig, extract};
pub use factory::{CommandFactory, DefaultCommandFactory, TypeHandle};
pub use help::HelpRequest;
pub use outline::{Outcome, Outline, OutlineBuilder};
pub use parser::{ParseResult, parse};
pub use raw::{FromRaw, RawValue};

pub use scopeargs_metadata as metadata;
