//! The scoped token scan.
//!
//! argv is consumed strictly left to right, without backtracking, through the
//! phases global options → group → group options → command (or help) →
//! command options → arguments.

use indexmap::IndexMap;
use scopeargs_metadata::{Metadata, OptionScope, OptionTable};

use crate::cursor::TokenCursor;
use crate::error::ParseError;

/// Explicit separator forcing the rest of argv to be positional.
pub const SEPARATOR: &str = "--";

/// Canonical alias → values, in encounter order.
///
/// A flag that appeared is present with an empty list.
pub type OptionValues = IndexMap<String, Vec<String>>;

/// What one `parse` call carved out of argv.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseResult {
    pub group: Option<String>,
    pub command: Option<String>,
    pub help_requested: bool,
    pub global_options: OptionValues,
    pub group_options: OptionValues,
    pub command_options: OptionValues,
    /// Leftover positional tokens, in order.
    pub arguments: Vec<String>,
}

impl ParseResult {
    pub fn options(&self, scope: OptionScope) -> &OptionValues {
        match scope {
            OptionScope::Global => &self.global_options,
            OptionScope::Group => &self.group_options,
            OptionScope::Command => &self.command_options,
        }
    }

    /// Values stored under `alias` in `scope`. `None` when the option never appeared.
    pub fn values(&self, scope: OptionScope, alias: &str) -> Option<&[String]> {
        self.options(scope).get(alias).map(Vec::as_slice)
    }

    pub fn is_present(&self, scope: OptionScope, alias: &str) -> bool {
        self.options(scope).contains_key(alias)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    GlobalOptions,
    Group,
    GroupOptions,
    CommandOrHelp,
    CommandOptions,
    Arguments,
    Done,
}

struct ScopedParser<'m, 'a> {
    metadata: &'m Metadata,
    cursor: TokenCursor<'a>,
    result: ParseResult,
}

/// Scan `argv` against `metadata`.
///
/// An unrecognized token where a command is expected becomes a help request
/// when `metadata.help_on_incorrect_arguments` is set, and an
/// `InvalidArgument` error otherwise.
pub fn parse(metadata: &Metadata, argv: &[String]) -> Result<ParseResult, ParseError> {
    let mut parser = ScopedParser {
        metadata,
        cursor: TokenCursor::new(argv),
        result: ParseResult::default(),
    };

    let mut phase = Phase::GlobalOptions;
    while phase != Phase::Done {
        tracing::trace!(?phase, position = parser.cursor.position(), "parse phase");
        phase = match phase {
            Phase::GlobalOptions => parser.global_options()?,
            Phase::Group => parser.group(),
            Phase::GroupOptions => parser.group_options()?,
            Phase::CommandOrHelp => parser.command_or_help()?,
            Phase::CommandOptions => parser.command_options()?,
            Phase::Arguments => parser.arguments(),
            Phase::Done => Phase::Done,
        };
    }

    tracing::debug!(
        group = ?parser.result.group,
        command = ?parser.result.command,
        help = parser.result.help_requested,
        arguments = parser.result.arguments.len(),
        "parsed arguments"
    );
    Ok(parser.result)
}

impl<'m, 'a> ScopedParser<'m, 'a> {
    fn global_options(&mut self) -> Result<Phase, ParseError> {
        let metadata = self.metadata;
        consume_options(
            &mut self.cursor,
            &metadata.global_options,
            &mut self.result.global_options,
            false,
        )?;
        Ok(Phase::Group)
    }

    fn group(&mut self) -> Phase {
        match self.cursor.peek() {
            Some(token) if self.metadata.is_group(token) => {
                self.cursor.advance();
                self.result.group = Some(token.to_string());
                Phase::GroupOptions
            }
            _ => Phase::CommandOrHelp,
        }
    }

    fn group_options(&mut self) -> Result<Phase, ParseError> {
        let metadata = self.metadata;
        let table = self
            .result
            .group
            .as_deref()
            .and_then(|g| metadata.group_options(g));
        if let Some(table) = table {
            consume_options(&mut self.cursor, table, &mut self.result.group_options, false)?;
        }
        Ok(Phase::CommandOrHelp)
    }

    fn command_or_help(&mut self) -> Result<Phase, ParseError> {
        let Some(token) = self.cursor.peek() else {
            // Default-command resolution belongs to the caller.
            return Ok(Phase::Done);
        };

        if self.metadata.is_help_keyword(token) {
            self.cursor.advance();
            self.result.help_requested = true;
            self.help_target();
            return Ok(Phase::Arguments);
        }

        if self.metadata.is_command(token) {
            self.cursor.advance();
            self.result.command = Some(token.to_string());
            return Ok(Phase::CommandOptions);
        }

        if self.metadata.help_on_incorrect_arguments {
            tracing::debug!(token, "unrecognized command, falling back to help");
            self.result.help_requested = true;
            return Ok(Phase::Done);
        }

        Err(ParseError::InvalidArgument {
            argument: token.to_string(),
            position: self.cursor.position(),
        })
    }

    /// After the help keyword: an optional group, then an optional command.
    /// The command token is recorded even when it names nothing.
    fn help_target(&mut self) {
        let Some(token) = self.cursor.advance() else {
            return;
        };
        if !self.metadata.is_group(token) {
            self.result.command = Some(token.to_string());
            return;
        }
        self.result.group = Some(token.to_string());
        if let Some(command) = self.cursor.advance() {
            self.result.command = Some(command.to_string());
        }
    }

    fn command_options(&mut self) -> Result<Phase, ParseError> {
        let metadata = self.metadata;
        let table = self
            .result
            .command
            .as_deref()
            .and_then(|c| metadata.command_options(c));
        let empty = OptionTable::new();
        consume_options(
            &mut self.cursor,
            table.unwrap_or(&empty),
            &mut self.result.command_options,
            true,
        )?;
        Ok(Phase::Arguments)
    }

    fn arguments(&mut self) -> Phase {
        while let Some(token) = self.cursor.advance() {
            self.result.arguments.push(token.to_string());
        }
        Phase::Done
    }
}

/// Greedy alias loop shared by every option phase.
///
/// Each recognized alias is followed by exactly `arity` value tokens, taken
/// verbatim even if they look like options.
fn consume_options(
    cursor: &mut TokenCursor<'_>,
    table: &OptionTable,
    store: &mut OptionValues,
    stop_at_separator: bool,
) -> Result<(), ParseError> {
    while let Some(token) = cursor.peek() {
        if stop_at_separator && token == SEPARATOR {
            cursor.advance();
            break;
        }
        let Some(spec) = table.get(token) else {
            break;
        };
        cursor.advance();

        let canonical = spec.canonical().to_string();
        if cursor.remaining() < spec.arity {
            return Err(ParseError::ArityUnderflow {
                option: canonical,
                expected: spec.arity,
                found: cursor.remaining(),
            });
        }

        let values = store.entry(canonical).or_default();
        for _ in 0..spec.arity {
            if let Some(value) = cursor.advance() {
                values.push(value.to_string());
            }
        }
    }
    Ok(())
}
