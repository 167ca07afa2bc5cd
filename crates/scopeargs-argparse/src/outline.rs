//! Application facade: build once, parse many times.

use std::any::Any;
use std::sync::Arc;

use indexmap::IndexMap;
use scopeargs_metadata::Metadata;

use crate::binder::{BindReport, Binder, ConversionPolicy};
use crate::convert::{ConverterRegistry, FieldContext};
use crate::declare::{CommandDef, Declaration, GroupDef, group};
use crate::error::{BindError, ConfigurationError, OutlineError};
use crate::extract::{AppConfig, extract};
use crate::factory::{CommandFactory, DefaultCommandFactory, TypeHandle};
use crate::help::{self, HelpRequest};
use crate::parser::{self, ParseResult};
use crate::raw::RawValue;

/// What a successful parse produced.
#[derive(Debug)]
pub enum Outcome<C> {
    Command(C),
    Help(HelpRequest),
    /// argv was empty and no default command is registered.
    NoCommand,
}

impl<C> Outcome<C> {
    pub fn into_command(self) -> Option<C> {
        match self {
            Self::Command(c) => Some(c),
            _ => None,
        }
    }

    pub fn is_help(&self) -> bool {
        matches!(self, Self::Help(_))
    }
}

/// A command declaration with its instance type erased behind the
/// application's command type `C`.
trait ErasedCommand<C>: Send + Sync {
    fn declaration(&self) -> &dyn Declaration;
    fn handle(&self) -> &TypeHandle;
    fn finish(&self, instance: Box<dyn Any>) -> Result<C, BindError>;
    fn bind(
        &self,
        instance: Box<dyn Any>,
        result: &ParseResult,
        binder: &Binder<'_>,
    ) -> Result<(C, BindReport), BindError>;
}

impl<T, C> ErasedCommand<C> for CommandDef<T>
where
    T: Into<C> + 'static,
{
    fn declaration(&self) -> &dyn Declaration {
        self
    }

    fn handle(&self) -> &TypeHandle {
        CommandDef::handle(self)
    }

    fn finish(&self, instance: Box<dyn Any>) -> Result<C, BindError> {
        downcast::<T>(self.name(), instance).map(|t| (*t).into())
    }

    fn bind(
        &self,
        instance: Box<dyn Any>,
        result: &ParseResult,
        binder: &Binder<'_>,
    ) -> Result<(C, BindReport), BindError> {
        let mut instance = downcast::<T>(self.name(), instance)?;
        let report = binder.bind(self, &mut instance, result)?;
        Ok(((*instance).into(), report))
    }
}

fn downcast<T: 'static>(command: &str, instance: Box<dyn Any>) -> Result<Box<T>, BindError> {
    instance
        .downcast::<T>()
        .map_err(|_| BindError::FactoryMismatch {
            command: command.to_string(),
            expected: std::any::type_name::<T>().to_string(),
        })
}

/// Collects the application definition. `build` compiles it into an `Outline`.
pub struct OutlineBuilder<C> {
    app: AppConfig,
    commands: Vec<Box<dyn ErasedCommand<C>>>,
    groups: Vec<GroupDef>,
    registry: ConverterRegistry,
    factory: Arc<dyn CommandFactory>,
    policy: ConversionPolicy,
}

impl<C: 'static> OutlineBuilder<C> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            app: AppConfig {
                name: name.into(),
                ..Default::default()
            },
            commands: Vec::new(),
            groups: Vec::new(),
            registry: ConverterRegistry::new(),
            factory: Arc::new(DefaultCommandFactory),
            policy: ConversionPolicy::default(),
        }
    }

    /// Single-command tool: `def` is also the default command. Groups, group
    /// options and further commands are rejected at build time.
    pub fn single<T: Into<C> + 'static>(name: impl Into<String>, def: CommandDef<T>) -> Self {
        let default = def.name().to_string();
        Self::new(name)
            .single_command_mode(true)
            .default_command(default)
            .command(def)
    }

    pub fn single_command_mode(mut self, enabled: bool) -> Self {
        self.app.single_command_mode = enabled;
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.app.description = description.into();
        self
    }

    pub fn help_keyword(mut self, keyword: impl Into<String>) -> Self {
        self.app.help_keyword = keyword.into();
        self
    }

    /// Whether an unrecognized command token turns into a help request
    /// instead of an error. On by default.
    pub fn help_on_incorrect_arguments(mut self, enabled: bool) -> Self {
        self.app.help_on_incorrect_arguments = enabled;
        self
    }

    /// Command returned (unbound) when argv is empty.
    pub fn default_command(mut self, name: impl Into<String>) -> Self {
        self.app.default_command = Some(name.into());
        self
    }

    pub fn command<T: Into<C> + 'static>(mut self, def: CommandDef<T>) -> Self {
        self.commands.push(Box::new(def));
        self
    }

    /// Register `def` and assign it to `group_name`, overriding any group
    /// named on the declaration itself.
    pub fn command_in<T: Into<C> + 'static>(
        mut self,
        group_name: impl Into<String>,
        def: CommandDef<T>,
    ) -> Self {
        self.groups.push(group(group_name).member(def.name()));
        self.command(def)
    }

    pub fn group(mut self, def: GroupDef) -> Self {
        self.groups.push(def);
        self
    }

    /// Register a converter for `V`, replacing any earlier one.
    pub fn with_converter<V, F>(mut self, convert: F) -> Self
    where
        V: 'static,
        F: Fn(&FieldContext<'_>, &dyn Any, &RawValue) -> Result<V, String> + Send + Sync + 'static,
    {
        self.registry.register::<V, F>(convert);
        self
    }

    pub fn command_factory(mut self, factory: impl CommandFactory + 'static) -> Self {
        self.factory = Arc::new(factory);
        self
    }

    pub fn conversion_policy(mut self, policy: ConversionPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn build(self) -> Result<Outline<C>, ConfigurationError> {
        let declarations: Vec<&dyn Declaration> =
            self.commands.iter().map(|c| c.declaration()).collect();
        let metadata = extract(&self.app, &declarations, &self.groups)?;

        let mut commands = IndexMap::new();
        for def in self.commands {
            let name = def.declaration().spec().name.clone();
            if metadata.is_command(&name) {
                commands.insert(name, def);
            }
        }

        Ok(Outline {
            metadata,
            commands,
            registry: self.registry,
            factory: self.factory,
            policy: self.policy,
        })
    }
}

/// A compiled application definition.
///
/// Read-only after `build`, so one instance can serve concurrent parses.
pub struct Outline<C> {
    metadata: Metadata,
    commands: IndexMap<String, Box<dyn ErasedCommand<C>>>,
    registry: ConverterRegistry,
    factory: Arc<dyn CommandFactory>,
    policy: ConversionPolicy,
}

impl<C> std::fmt::Debug for Outline<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Outline")
            .field("name", &self.metadata.name)
            .field("commands", &self.commands.keys().collect::<Vec<_>>())
            .field("registry", &self.registry)
            .field("policy", &self.policy)
            .finish()
    }
}

impl<C: 'static> Outline<C> {
    pub fn builder(name: impl Into<String>) -> OutlineBuilder<C> {
        OutlineBuilder::new(name)
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn parse(&self, argv: &[String]) -> Result<Outcome<C>, OutlineError> {
        self.parse_reported(argv).map(|(outcome, _)| outcome)
    }

    /// Like `parse`, also returning the non-fatal findings of the bind.
    pub fn parse_reported(&self, argv: &[String]) -> Result<(Outcome<C>, BindReport), OutlineError> {
        if argv.is_empty() {
            return self.default_outcome().map(|o| (o, BindReport::default()));
        }

        let result = parser::parse(&self.metadata, argv)?;
        if result.help_requested {
            return Ok((Outcome::Help(HelpRequest { result }), BindReport::default()));
        }

        let Some(def) = result.command.as_deref().and_then(|c| self.commands.get(c)) else {
            return Err(OutlineError::MissingCommand);
        };

        let instance = self.factory.create_instance(def.handle());
        let binder = Binder::new(&self.registry, self.policy);
        let (command, report) = def.bind(instance, &result, &binder)?;
        Ok((Outcome::Command(command), report))
    }

    /// Run only the scoped scan.
    pub fn parse_result(&self, argv: &[String]) -> Result<ParseResult, OutlineError> {
        Ok(parser::parse(&self.metadata, argv)?)
    }

    pub fn help(&self, request: &HelpRequest) -> String {
        help::render(&self.metadata, &request.result)
    }

    /// Help for the whole application.
    pub fn usage(&self) -> String {
        help::render(&self.metadata, &ParseResult::default())
    }

    fn default_outcome(&self) -> Result<Outcome<C>, OutlineError> {
        let Some(def) = self
            .metadata
            .default_command
            .as_deref()
            .and_then(|name| self.commands.get(name))
        else {
            return Ok(Outcome::NoCommand);
        };
        tracing::debug!(command = %def.declaration().spec().name, "empty argv, using default command");
        let instance = self.factory.create_instance(def.handle());
        Ok(Outcome::Command(def.finish(instance)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::declare::{argument, command, option};
    use crate::error::ParseError;

    #[derive(Debug, Default, PartialEq)]
    struct RemoteAdd {
        g1: Option<String>,
        g2: Vec<String>,
        gr1: Option<String>,
        gr2: Vec<String>,
        c1: Option<String>,
        c2: Vec<String>,
        force: bool,
        a1: Option<String>,
        a2: Option<String>,
        a3: Vec<String>,
    }

    #[derive(Debug, Default, PartialEq)]
    struct Status {
        verbose: bool,
        depth: u32,
    }

    #[derive(Debug, PartialEq)]
    enum Git {
        RemoteAdd(RemoteAdd),
        Status(Status),
    }

    impl From<RemoteAdd> for Git {
        fn from(c: RemoteAdd) -> Self {
            Git::RemoteAdd(c)
        }
    }

    impl From<Status> for Git {
        fn from(c: Status) -> Self {
            Git::Status(c)
        }
    }

    fn argv(s: &str) -> Vec<String> {
        s.split_whitespace().map(str::to_string).collect()
    }

    fn remote_add() -> CommandDef<RemoteAdd> {
        command::<RemoteAdd>("remote-add")
            .description("Add a remote")
            .option(option(["-g1", "--global1"]).global(), |c, v: String| c.g1 = Some(v))
            .option(option(["-g2"]).global().arity(2), |c, v: Vec<String>| c.g2 = v)
            .option(option(["-gr1"]).group_scoped(), |c, v: String| c.gr1 = Some(v))
            .option(option(["-gr2"]).group_scoped().arity(2), |c, v: Vec<String>| c.gr2 = v)
            .option(option(["-c1"]), |c, v: String| c.c1 = Some(v))
            .option(option(["-c2"]).arity(2), |c, v: Vec<String>| c.c2 = v)
            .option(option(["-f", "--force"]).flag(), |c, v: bool| c.force = v)
            .argument(0, argument().title("a1"), |c, v: String| c.a1 = Some(v))
            .argument(1, argument().title("a2"), |c, v: String| c.a2 = Some(v))
            .arguments(argument().title("a3"), |c, v: Vec<String>| c.a3 = v)
    }

    fn status() -> CommandDef<Status> {
        command::<Status>("status")
            .option(option(["-g1", "--global1"]).global(), |_, _: String| {})
            .option(option(["-v", "--verbose"]).flag(), |c, v: bool| c.verbose = v)
            .option(option(["-d", "--depth"]), |c, v: u32| c.depth = v)
    }

    fn git() -> OutlineBuilder<Git> {
        Outline::builder("git")
            .description("the stupid content tracker")
            .command_in("remote", remote_add())
            .command(status())
    }

    fn bound(outline: &Outline<Git>, input: &str) -> Git {
        match outline.parse(&argv(input)) {
            Ok(Outcome::Command(c)) => c,
            other => panic!("expected a bound command, got {other:?}"),
        }
    }

    #[test]
    fn binds_every_scope_end_to_end() {
        let outline = git().build().unwrap();
        let Git::RemoteAdd(c) = bound(
            &outline,
            "-g1 op1 -g2 op2 op3 remote -gr1 op4 -gr2 op5 op6 remote-add -c1 op7 -c2 op8 op9 arg1 arg2 arg3 arg4",
        ) else {
            panic!("expected remote-add");
        };
        assert_eq!(c.g1.as_deref(), Some("op1"));
        assert_eq!(c.g2, argv("op2 op3"));
        assert_eq!(c.gr1.as_deref(), Some("op4"));
        assert_eq!(c.gr2, argv("op5 op6"));
        assert_eq!(c.c1.as_deref(), Some("op7"));
        assert_eq!(c.c2, argv("op8 op9"));
        assert_eq!(c.a1.as_deref(), Some("arg1"));
        assert_eq!(c.a2.as_deref(), Some("arg2"));
        assert_eq!(c.a3, argv("arg3 arg4"));
        assert!(!c.force);
    }

    #[test]
    fn aliases_bind_the_same_field() {
        let outline = git().build().unwrap();
        for input in ["-g1 X status", "--global1 X status"] {
            let result = outline.parse_result(&argv(input)).unwrap();
            assert_eq!(result.global_options["-g1"], argv("X"));
        }
        let Git::Status(s) = bound(&outline, "status --verbose --depth 3") else {
            panic!("expected status");
        };
        assert_eq!(s, Status { verbose: true, depth: 3 });
    }

    #[test]
    fn flag_leaves_next_token_alone() {
        let outline = git().build().unwrap();
        let Git::RemoteAdd(c) = bound(&outline, "remote remote-add -f origin") else {
            panic!("expected remote-add");
        };
        assert!(c.force);
        assert_eq!(c.a1.as_deref(), Some("origin"));
    }

    #[test]
    fn help_forms_attach_the_scan() {
        let outline = git().build().unwrap();

        let Ok(Outcome::Help(req)) = outline.parse(&argv("help")) else {
            panic!("expected help");
        };
        assert_eq!((req.group(), req.command()), (None, None));

        let Ok(Outcome::Help(req)) = outline.parse(&argv("help remote remote-add")) else {
            panic!("expected help");
        };
        assert_eq!(req.group(), Some("remote"));
        assert_eq!(req.command(), Some("remote-add"));
        assert!(outline.help(&req).contains("Add a remote"));

        let Ok(Outcome::Help(req)) = outline.parse(&argv("help bogus")) else {
            panic!("expected help");
        };
        assert_eq!(req.command(), Some("bogus"));
    }

    #[test]
    fn unrecognized_token_recovers_or_fails() {
        let outline = git().build().unwrap();
        assert!(outline.parse(&argv("sangupta")).unwrap().is_help());

        let strict = git().help_on_incorrect_arguments(false).build().unwrap();
        let err = strict.parse(&argv("sangupta")).unwrap_err();
        assert_eq!(
            err,
            OutlineError::Parse(ParseError::InvalidArgument {
                argument: "sangupta".to_string(),
                position: 0,
            })
        );
    }

    #[test]
    fn empty_argv_uses_default_command_unbound() {
        let outline = git().build().unwrap();
        assert!(matches!(outline.parse(&[]), Ok(Outcome::NoCommand)));

        let outline = git().default_command("status").build().unwrap();
        let Ok(Outcome::Command(Git::Status(s))) = outline.parse(&[]) else {
            panic!("expected the default command");
        };
        assert_eq!(s, Status::default());
    }

    #[test]
    fn options_without_command_are_an_error() {
        let outline = git().build().unwrap();
        let err = outline.parse(&argv("-g1 x")).unwrap_err();
        assert_eq!(err, OutlineError::MissingCommand);
    }

    #[test]
    fn group_option_in_single_command_tool_fails_at_build() {
        let tool = command::<Status>("tool")
            .option(option(["-x"]).group_scoped(), |c, v: u32| c.depth = v);
        let err = OutlineBuilder::<Git>::single("tool", tool).build().unwrap_err();
        assert!(matches!(err, ConfigurationError::GroupOptionInSingleCommandMode { .. }));
    }

    #[test]
    fn single_command_tool_parses() {
        let outline = OutlineBuilder::<Git>::single("status", status()).build().unwrap();
        assert!(outline.metadata().single_command_mode);
        let Git::Status(s) = bound(&outline, "status -v") else {
            panic!("expected status");
        };
        assert!(s.verbose);

        let Ok(Outcome::Command(Git::Status(s))) = outline.parse(&[]) else {
            panic!("expected the single command");
        };
        assert_eq!(s, Status::default());
    }

    #[test]
    fn single_command_tool_rejects_more_commands() {
        let err = OutlineBuilder::<Git>::single("status", status())
            .command(command::<Status>("info"))
            .build()
            .unwrap_err();
        assert_eq!(err, ConfigurationError::SingleCommandCount { found: 2 });

        let err = OutlineBuilder::<Git>::single("status", status())
            .default_command("remote-add")
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigurationError::SingleCommandDefault { .. }));
    }

    #[test]
    fn building_twice_is_structurally_equal() {
        let a = git().build().unwrap();
        let b = git().build().unwrap();
        assert_eq!(a.metadata(), b.metadata());
    }

    #[test]
    fn custom_factory_injects_instances() {
        struct Seeded;
        impl CommandFactory for Seeded {
            fn create_instance(&self, handle: &TypeHandle) -> Box<dyn Any> {
                if handle.is::<Status>() {
                    return Box::new(Status { verbose: false, depth: 9 });
                }
                handle.construct()
            }
        }
        let outline = git().command_factory(Seeded).build().unwrap();
        let Git::Status(s) = bound(&outline, "status -v") else {
            panic!("expected status");
        };
        assert_eq!(s, Status { verbose: true, depth: 9 });
    }

    #[test]
    fn factory_returning_wrong_type_is_reported() {
        struct Broken;
        impl CommandFactory for Broken {
            fn create_instance(&self, _: &TypeHandle) -> Box<dyn Any> {
                Box::new(0u8)
            }
        }
        let outline = git().command_factory(Broken).build().unwrap();
        let err = outline.parse(&argv("status")).unwrap_err();
        assert!(matches!(
            err,
            OutlineError::Bind(BindError::FactoryMismatch { ref command, .. }) if command == "status"
        ));
    }

    #[test]
    fn converters_and_policy_apply_to_binding() {
        let outline = git()
            .with_converter::<u32, _>(|_, _, raw| match raw.to_string().as_str() {
                "deep" => Ok(99),
                other => other.parse().map_err(|e: std::num::ParseIntError| e.to_string()),
            })
            .build()
            .unwrap();
        let Git::Status(s) = bound(&outline, "status -d deep") else {
            panic!("expected status");
        };
        assert_eq!(s.depth, 99);

        let (outcome, report) = outline.parse_reported(&argv("status -d shallow")).unwrap();
        assert!(matches!(outcome, Outcome::Command(Git::Status(Status { depth: 0, .. }))));
        assert_eq!(report.conversion_errors.len(), 1);

        let strict = git().conversion_policy(ConversionPolicy::Abort).build().unwrap();
        let err = strict.parse(&argv("status -d shallow")).unwrap_err();
        assert!(matches!(err, OutlineError::Bind(BindError::Conversion(_))));
    }

    #[test]
    fn outline_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Outline<Git>>();

        let outline = Arc::new(git().build().unwrap());
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let outline = Arc::clone(&outline);
                std::thread::spawn(move || {
                    let input = format!("status -d {i}");
                    outline.parse_result(&argv(&input)).map(|r| r.command_options["-d"].clone())
                })
            })
            .collect();
        for (i, h) in handles.into_iter().enumerate() {
            assert_eq!(h.join().unwrap().unwrap(), vec![i.to_string()]);
        }
    }
}
