//! Entry point: parse, bind, run, and report.
//!
//! The [`Dispatcher`] is the only place where errors become messages and
//! exit codes:
//!
//! | outcome                      | stream | exit code                     |
//! |------------------------------|--------|-------------------------------|
//! | action succeeded             | -      | 0, or the action's own code   |
//! | help requested               | out    | 0                             |
//! | parse error                  | err    | `usage_exit_code` (2)         |
//! | schema or bind error         | err    | `defect_exit_code` (70)       |
//! | action failed                | err    | the error's code (default 1)  |

use std::env;
use std::ffi::OsString;
use std::io::{self, Write};
use std::process::ExitCode;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::binder::bind;
use crate::command::CommandDef;
use crate::config::DispatchConfig;
use crate::error::{ParseError, ParseFailure, SchemaError};
use crate::grammar::Grammar;
use crate::help::{render_help, render_usage};
use crate::parser::{Invocation, ParseOutcome, parse};

/// Runs invocations against one validated grammar.
///
/// The grammar is shared behind an [`Arc`], so a dispatcher can be cloned
/// cheaply and used from several threads.
///
/// # Examples
///
/// ```
/// use std::io::Write;
///
/// use argcommand_core::*;
///
/// struct Hello;
///
/// impl FromAttributes for Hello {
///     fn from_attributes(_: &mut Attributes) -> Result<Self, BindError> {
///         Ok(Hello)
///     }
/// }
///
/// impl Run for Hello {
///     fn run(&mut self, ctx: &mut Context<'_>) -> Result<Status, ActionError> {
///         writeln!(ctx.out(), "hello")?;
///         Ok(Status::Success)
///     }
/// }
///
/// let def = CommandDef::new("app").with_subcommand(CommandDef::new("hello").with_action::<Hello>());
/// let dispatcher = Dispatcher::new(&def).unwrap();
///
/// let (mut out, mut err) = (Vec::new(), Vec::new());
/// assert_eq!(dispatcher.dispatch(&["hello"], &mut out, &mut err), 0);
/// assert_eq!(out, b"hello\n");
///
/// assert_eq!(dispatcher.dispatch(&["bye"], &mut out, &mut err), 2);
/// ```
#[derive(Debug, Clone)]
pub struct Dispatcher {
    grammar: Arc<Grammar>,
    config: DispatchConfig,
}

impl Dispatcher {
    /// Builds the grammar for `def` with the default configuration.
    ///
    /// # Errors
    ///
    /// Returns the [`SchemaError`] found while building the grammar.
    pub fn new(def: &CommandDef) -> Result<Self, SchemaError> {
        Self::with_config(def, DispatchConfig::default())
    }

    /// Builds the grammar for `def`, installing the configured help flags.
    ///
    /// # Errors
    ///
    /// Returns the [`SchemaError`] found while building the grammar.
    pub fn with_config(def: &CommandDef, config: DispatchConfig) -> Result<Self, SchemaError> {
        let grammar = Grammar::build_with(def, &config.grammar_options())?;
        Ok(Self::from_grammar(Arc::new(grammar), config))
    }

    /// Reuses an already built grammar.
    ///
    /// The grammar keeps the help flags it was built with; those in `config`
    /// are not applied.
    pub fn from_grammar(grammar: Arc<Grammar>, config: DispatchConfig) -> Self {
        Self { grammar, config }
    }

    /// The grammar invocations are parsed against.
    pub fn grammar(&self) -> &Arc<Grammar> {
        &self.grammar
    }

    /// The active configuration.
    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// Name shown in usage lines and diagnostics.
    pub fn program_name(&self) -> &str {
        self.config
            .program_name
            .as_deref()
            .unwrap_or_else(|| self.grammar.root().name())
    }

    /// Runs one invocation and returns the process exit code.
    ///
    /// `args` excludes the program name. Help goes to `out`, diagnostics to
    /// `err`; the action writes to `out`.
    pub fn dispatch<S: AsRef<str>>(
        &self,
        args: &[S],
        out: &mut dyn Write,
        err: &mut dyn Write,
    ) -> i32 {
        let program = self.program_name();
        let code = match parse(&self.grammar, args) {
            Ok(ParseOutcome::Invocation(invocation)) => self.invoke(invocation, out, err),
            Ok(ParseOutcome::Help(path)) => {
                debug!(path = %path.join(" "), "help requested");
                let help = render_help(&self.grammar, &path, program);
                if let Err(e) = out.write_all(help.as_bytes()).and_then(|()| out.flush()) {
                    warn!(error = %e, "failed to write help");
                }
                0
            }
            Err(failure) => self.usage_error(&failure, err),
        };
        debug!(code, "dispatch finished");
        code
    }

    /// Like [`dispatch`](Self::dispatch), for raw OS arguments.
    ///
    /// A token that is not valid UTF-8 is a usage error naming its position;
    /// it is never rewritten.
    pub fn dispatch_os<I>(&self, args: I, out: &mut dyn Write, err: &mut dyn Write) -> i32
    where
        I: IntoIterator,
        I::Item: Into<OsString>,
    {
        match utf8_args(args) {
            Ok(args) => self.dispatch(&args, out, err),
            Err(error) => {
                let failure = ParseFailure {
                    level: vec![self.grammar.root().name().to_string()],
                    error,
                };
                self.usage_error(&failure, err)
            }
        }
    }

    fn usage_error(&self, failure: &ParseFailure, err: &mut dyn Write) -> i32 {
        let program = self.program_name();
        debug!(level = %failure.level.join(" "), error = %failure.error, "parse failed");
        let usage = render_usage(&self.grammar, &failure.level, program);
        report(err, &format!("{usage}\n{program}: error: {failure}"));
        self.config.usage_exit_code
    }

    fn invoke(&self, invocation: Invocation, out: &mut dyn Write, err: &mut dyn Write) -> i32 {
        let program = self.program_name();
        let command = match bind(&self.grammar, invocation) {
            Ok(command) => command,
            Err(e) => {
                report(err, &format!("{program}: error: {e}"));
                return self.config.defect_exit_code;
            }
        };

        let result = command.run(&self.grammar, out);
        if let Err(e) = out.flush() {
            warn!(error = %e, "failed to flush command output");
        }
        match result {
            Ok(status) => status.code(),
            Err(e) => {
                report(err, &format!("{program}: error: {e}"));
                e.code()
            }
        }
    }
}

/// Builds the grammar for `def` and runs one invocation.
///
/// Schema errors are reported on `err` and mapped to the defect exit code.
pub fn dispatch<S: AsRef<str>>(
    def: &CommandDef,
    config: DispatchConfig,
    args: &[S],
    out: &mut dyn Write,
    err: &mut dyn Write,
) -> i32 {
    match build(def, config, err) {
        Ok(dispatcher) => dispatcher.dispatch(args, out, err),
        Err(code) => code,
    }
}

/// Runs `def` against the process arguments with the default configuration.
pub fn execute(def: &CommandDef) -> ExitCode {
    execute_with(def, DispatchConfig::default())
}

/// Runs `def` against the process arguments, writing to stdout and stderr.
pub fn execute_with(def: &CommandDef, config: DispatchConfig) -> ExitCode {
    let mut out = io::stdout().lock();
    let mut err = io::stderr().lock();
    let code = match build(def, config, &mut err) {
        Ok(dispatcher) => dispatcher.dispatch_os(env::args_os().skip(1), &mut out, &mut err),
        Err(code) => code,
    };
    ExitCode::from(u8::try_from(code).unwrap_or(1))
}

/// Builds a dispatcher, reporting a schema error as the defect exit code.
fn build(def: &CommandDef, config: DispatchConfig, err: &mut dyn Write) -> Result<Dispatcher, i32> {
    let program = config
        .program_name
        .clone()
        .unwrap_or_else(|| def.name.clone());
    let defect_exit_code = config.defect_exit_code;
    Dispatcher::with_config(def, config).map_err(|e| {
        report(err, &format!("{program}: error: {e}"));
        defect_exit_code
    })
}

fn utf8_args<I>(args: I) -> Result<Vec<String>, ParseError>
where
    I: IntoIterator,
    I::Item: Into<OsString>,
{
    args.into_iter()
        .enumerate()
        .map(|(index, arg)| {
            let arg: OsString = arg.into();
            arg.into_string().map_err(|raw| ParseError::InvalidEncoding {
                position: index + 1,
                lossy: raw.to_string_lossy().into_owned(),
            })
        })
        .collect()
}

fn report(err: &mut dyn Write, message: &str) {
    if let Err(e) = writeln!(err, "{message}").and_then(|()| err.flush()) {
        warn!(error = %e, "failed to write diagnostic");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::argument::{Argument, Arity};
    use crate::attributes::Attributes;
    use crate::command::{Context, FromAttributes, Run, Status};
    use crate::config::{DEFECT_EXIT_CODE, USAGE_EXIT_CODE};
    use crate::error::{ActionError, BindError};
    use crate::value::ValueType;

    struct Root {
        quiet: bool,
    }

    impl FromAttributes for Root {
        fn from_attributes(attrs: &mut Attributes) -> Result<Self, BindError> {
            Ok(Self {
                quiet: attrs.take("quiet")?,
            })
        }
    }

    struct Say {
        what: String,
        times: i64,
    }

    impl FromAttributes for Say {
        fn from_attributes(attrs: &mut Attributes) -> Result<Self, BindError> {
            Ok(Self {
                what: attrs.take("what")?,
                times: attrs.take("times")?,
            })
        }
    }

    impl Run for Say {
        fn run(&mut self, ctx: &mut Context<'_>) -> Result<Status, ActionError> {
            if ctx.parent::<Root>().is_some_and(|root| root.quiet) {
                return Ok(Status::Success);
            }
            let count = usize::try_from(self.times).unwrap_or(0);
            writeln!(ctx.out(), "{}", self.what.repeat(count))?;
            Ok(Status::Success)
        }
    }

    struct Fail {
        code: i32,
    }

    impl FromAttributes for Fail {
        fn from_attributes(attrs: &mut Attributes) -> Result<Self, BindError> {
            Ok(Self {
                code: attrs.take("code")?,
            })
        }
    }

    impl Run for Fail {
        fn run(&mut self, _ctx: &mut Context<'_>) -> Result<Status, ActionError> {
            match self.code {
                0 => Ok(Status::Code(4)),
                code => Err(ActionError::new("it broke").with_code(code)),
            }
        }
    }

    struct Mistyped;

    impl FromAttributes for Mistyped {
        fn from_attributes(attrs: &mut Attributes) -> Result<Self, BindError> {
            let _: i64 = attrs.take("name")?;
            Ok(Mistyped)
        }
    }

    impl Run for Mistyped {
        fn run(&mut self, _ctx: &mut Context<'_>) -> Result<Status, ActionError> {
            Ok(Status::Success)
        }
    }

    fn app() -> CommandDef {
        CommandDef::new("app")
            .with_arg(Argument::switch("quiet", &["-q", "--quiet"]))
            .with_state::<Root>()
            .with_subcommand(
                CommandDef::new("say")
                    .with_summary("Prints a message to the screen")
                    .with_arg(
                        Argument::positional("what")
                            .with_metavar("WORD")
                            .with_default("Something"),
                    )
                    .with_arg(
                        Argument::option("times", &["--times", "-t"])
                            .with_type(ValueType::Int)
                            .with_default(1)
                            .with_metavar("T"),
                    )
                    .with_action::<Say>(),
            )
            .with_subcommand(
                CommandDef::new("fail")
                    .with_arg(
                        Argument::option("code", &["--code"])
                            .with_type(ValueType::Int)
                            .with_default(1),
                    )
                    .with_action::<Fail>(),
            )
            .with_subcommand(
                CommandDef::new("mistyped")
                    .with_arg(Argument::positional("name").with_arity(Arity::ZeroOrOne))
                    .with_action::<Mistyped>(),
            )
    }

    fn run(config: DispatchConfig, args: &[&str]) -> (i32, String, String) {
        let (mut out, mut err) = (Vec::new(), Vec::new());
        let code = dispatch(&app(), config, args, &mut out, &mut err);
        (
            code,
            String::from_utf8(out).unwrap(),
            String::from_utf8(err).unwrap(),
        )
    }

    #[test]
    fn test_success() {
        let (code, out, err) = run(DispatchConfig::default(), &["say", "--times", "3", "hi"]);
        assert_eq!(code, 0);
        assert_eq!(out, "hihihi\n");
        assert!(err.is_empty());
    }

    #[test]
    fn test_ancestor_state_reaches_leaf() {
        let (code, out, _) = run(DispatchConfig::default(), &["-q", "say", "hi"]);
        assert_eq!(code, 0);
        assert!(out.is_empty());
    }

    #[test]
    fn test_unknown_command_is_usage_error() {
        let (code, out, err) = run(DispatchConfig::default(), &["frobnicate"]);
        assert_eq!(code, USAGE_EXIT_CODE);
        assert!(out.is_empty());
        assert_eq!(
            err,
            "usage: app [-h] [-q] <command> ...\n\
             app: error: unknown command 'frobnicate' (choose from 'say', 'fail', 'mistyped')\n"
        );
    }

    #[test]
    fn test_parse_error_shows_deepest_usage() {
        let (code, _, err) = run(DispatchConfig::default(), &["say", "--times", "x"]);
        assert_eq!(code, USAGE_EXIT_CODE);
        assert!(err.starts_with("usage: app say [-h] [--times T] [WORD]\n"));
        assert!(err.contains("app: error: argument --times/-t: invalid int value: 'x'"));
    }

    #[test]
    fn test_help_goes_to_out() {
        let (code, out, err) = run(DispatchConfig::default(), &["say", "--help"]);
        assert_eq!(code, 0);
        assert!(out.starts_with("usage: app say [-h] [--times T] [WORD]\n"));
        assert!(out.contains("Prints a message to the screen"));
        assert!(err.is_empty());
    }

    #[test]
    fn test_action_error_code() {
        let (code, out, err) = run(DispatchConfig::default(), &["fail", "--code", "9"]);
        assert_eq!(code, 9);
        assert!(out.is_empty());
        assert_eq!(err, "app: error: it broke\n");
    }

    #[test]
    fn test_action_status_code() {
        let (code, _, err) = run(DispatchConfig::default(), &["fail", "--code", "0"]);
        assert_eq!(code, 4);
        assert!(err.is_empty());
    }

    #[test]
    fn test_bind_error_is_defect() {
        let (code, _, err) = run(DispatchConfig::default(), &["mistyped", "bob"]);
        assert_eq!(code, DEFECT_EXIT_CODE);
        assert_eq!(
            err,
            "app: error: attribute `name` is a string, expected int\n"
        );
    }

    #[test]
    fn test_schema_error_is_defect() {
        let def = CommandDef::new("broken").with_subcommand(CommandDef::new("leaf"));
        let (mut out, mut err) = (Vec::new(), Vec::new());
        let code = dispatch(&def, DispatchConfig::default(), &["leaf"], &mut out, &mut err);

        assert_eq!(code, DEFECT_EXIT_CODE);
        assert!(out.is_empty());
        let err = String::from_utf8(err).unwrap();
        assert!(err.starts_with("broken: error: invalid command definition at `broken leaf`"));
        assert!(!err.contains("usage:"));
    }

    #[test]
    fn test_configured_help_flag_must_be_a_flag() {
        let config: DispatchConfig = serde_yaml::from_str("help_flags: [say]\n").unwrap();
        let (code, out, err) = run(config, &["say", "hi"]);

        assert_eq!(code, DEFECT_EXIT_CODE);
        assert!(out.is_empty());
        assert_eq!(
            err,
            "app: error: invalid command definition at `app`: invalid flag format: say\n"
        );
    }

    #[test]
    fn test_dispatch_os_accepts_utf8() {
        let dispatcher = Dispatcher::new(&app()).unwrap();
        let (mut out, mut err) = (Vec::new(), Vec::new());
        let args = vec![OsString::from("say"), OsString::from("héllo")];

        assert_eq!(dispatcher.dispatch_os(args, &mut out, &mut err), 0);
        assert_eq!(out, "héllo\n".as_bytes());
    }

    #[cfg(unix)]
    #[test]
    fn test_dispatch_os_rejects_invalid_utf8() {
        use std::os::unix::ffi::OsStringExt;

        let dispatcher = Dispatcher::new(&app()).unwrap();
        let (mut out, mut err) = (Vec::new(), Vec::new());
        let args = vec![
            OsString::from("say"),
            OsString::from_vec(vec![b'f', 0xff, b'o']),
        ];

        assert_eq!(dispatcher.dispatch_os(args, &mut out, &mut err), USAGE_EXIT_CODE);
        assert!(out.is_empty());
        let err = String::from_utf8(err).unwrap();
        assert!(err.starts_with("usage: app [-h] [-q] <command> ...\n"));
        assert!(err.contains("app: error: argument 2 is not valid UTF-8: 'f\u{fffd}o'"));
    }

    #[test]
    fn test_config_overrides() {
        let config = DispatchConfig {
            program_name: Some("demo".to_string()),
            help_flags: vec!["--usage".to_string()],
            usage_exit_code: 64,
            defect_exit_code: 99,
        };
        let (code, out, _) = run(config.clone(), &["--usage"]);
        assert_eq!(code, 0);
        assert!(out.starts_with("usage: demo [--usage] [-q] <command> ...\n"));

        let (code, _, err) = run(config, &["-h"]);
        assert_eq!(code, 64);
        assert!(err.contains("demo: error: unrecognized option '-h'"));
    }

    #[test]
    fn test_dispatcher_is_reusable() {
        let dispatcher = Dispatcher::new(&app()).unwrap();
        let shared = Dispatcher::from_grammar(Arc::clone(dispatcher.grammar()), DispatchConfig::default());

        for d in [&dispatcher, &shared] {
            let (mut out, mut err) = (Vec::new(), Vec::new());
            assert_eq!(d.dispatch(&["say"], &mut out, &mut err), 0);
            assert_eq!(out, b"Something\n");
        }
        assert_eq!(dispatcher.program_name(), "app");
    }
}
