//! Error types for the command framework.
//!
//! Errors fall into three groups:
//!
//! - declaration defects found before any input is seen ([`SchemaError`]) or
//!   while instantiating commands ([`BindError`]);
//! - user input errors found while parsing ([`ParseError`], wrapped with the
//!   level reached in [`ParseFailure`]);
//! - failures raised by an action body ([`ActionError`]).
//!
//! The dispatcher is the only place that turns these into messages and exit
//! codes.

use thiserror::Error;

/// A defect in a command definition, found while building the grammar.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid command definition at `{path}`: {kind}")]
pub struct SchemaError {
    /// Space-separated command path of the offending level.
    pub path: String,
    /// What is wrong with it.
    pub kind: SchemaErrorKind,
}

impl SchemaError {
    pub(crate) fn new(path: &[String], kind: SchemaErrorKind) -> Self {
        Self {
            path: path.join(" "),
            kind,
        }
    }
}

/// The specific problem behind a [`SchemaError`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaErrorKind {
    /// Command name is empty, contains whitespace, or starts with `-`.
    #[error("invalid command name: {0:?}")]
    InvalidCommandName(String),
    /// Two subcommands of the same level share a name.
    #[error("duplicate subcommand: {0}")]
    DuplicateSubcommand(String),
    /// An argument has an empty attribute name.
    #[error("argument name cannot be empty")]
    EmptyArgumentName,
    /// Two arguments of the same level bind the same attribute.
    #[error("duplicate attribute: {0}")]
    DuplicateAttribute(String),
    /// An argument reuses an attribute name bound by an ancestor level.
    #[error("attribute `{0}` is already bound by an ancestor command")]
    ShadowedAttribute(String),
    /// A positional argument declares flag aliases.
    #[error("positional argument `{0}` cannot declare flags")]
    PositionalWithFlags(String),
    /// An option or switch declares no flag alias.
    #[error("argument `{0}` must declare at least one flag")]
    MissingFlag(String),
    /// A flag alias is not of the form `-x` or `--name`.
    #[error("invalid flag format: {0}")]
    InvalidFlag(String),
    /// Two arguments of the same level share a flag alias.
    #[error("duplicate flag: {0}")]
    DuplicateFlag(String),
    /// A flag alias collides with a help flag.
    #[error("flag {0} is reserved for help")]
    ReservedFlag(String),
    /// A multi-token positional is followed by another positional.
    #[error("variadic positional `{0}` must be the last positional argument")]
    VariadicNotTrailing(String),
    /// An option with an optional value declares nothing to bind when the
    /// value is omitted.
    #[error("option `{0}` takes an optional value but declares no const value")]
    MissingConst(String),
    /// A multi-token argument declares a non-list default.
    #[error("default for variadic argument `{0}` must be a list")]
    DefaultNotList(String),
    /// A leaf command has nothing to run.
    #[error("leaf command has no action")]
    MissingAction,
    /// A command with subcommands also declares an action.
    #[error("command with subcommands cannot declare an action")]
    ActionOnBranch,
}

/// A user input error found while parsing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// A token was rejected by the argument's value type.
    #[error("argument {argument}: {reason}")]
    Coercion {
        /// Display label of the argument (`FILE`, `-t/--times`).
        argument: String,
        /// Token as supplied.
        raw_value: String,
        /// Why it was rejected.
        reason: String,
    },
    /// A required argument received no token and has no default.
    #[error("the following argument is required: {argument}")]
    MissingArgument {
        /// Display label of the argument.
        argument: String,
    },
    /// A value-taking flag was not followed by a value.
    #[error("argument {flag}: expected a value")]
    MissingValue {
        /// Display label of the flagged argument.
        flag: String,
    },
    /// Input ended at a level that still needs a subcommand.
    #[error("a command is required after `{level_path}`")]
    MissingSubcommand {
        /// Space-separated path of the level.
        level_path: String,
    },
    /// A token at a branching level names no subcommand.
    #[error("unknown command '{token}' (choose from '{}')", .available.join("', '"))]
    UnknownCommand {
        /// The offending token.
        token: String,
        /// Subcommand names of the level, in declaration order.
        available: Vec<String>,
    },
    /// A flag-like token matches no flag of the level.
    #[error("unrecognized option '{flag}'")]
    UnknownOption {
        /// The offending token.
        flag: String,
        /// Flags declared at the level.
        available: Vec<String>,
    },
    /// Tokens left over at a leaf with nothing left to fill.
    #[error("unrecognized arguments: {}", .tokens.join(" "))]
    UnexpectedArgument {
        /// The remaining tokens, in order.
        tokens: Vec<String>,
    },
    /// A command-line token is not valid UTF-8.
    #[error("argument {position} is not valid UTF-8: '{lossy}'")]
    InvalidEncoding {
        /// One-based position of the token, program name excluded.
        position: usize,
        /// The token with invalid sequences replaced.
        lossy: String,
    },
}

/// A [`ParseError`] together with the deepest command level reached.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{error}")]
pub struct ParseFailure {
    /// Command path (root first) of the level that was being parsed.
    pub level: Vec<String>,
    /// The underlying error.
    pub error: ParseError,
}

/// A mismatch between parsed attributes and the command type reading them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BindError {
    /// The command type read an attribute that was never bound.
    #[error("attribute `{name}` was not bound")]
    MissingAttribute {
        /// Attribute name.
        name: String,
    },
    /// The bound value has the wrong shape for the field.
    #[error("attribute `{name}` is a {found}, expected {expected}")]
    TypeMismatch {
        /// Attribute name.
        name: String,
        /// Type the field wanted.
        expected: &'static str,
        /// Type that was bound.
        found: &'static str,
    },
    /// The invocation names a command the grammar does not contain.
    #[error("no command `{0}` in grammar")]
    UnknownCommand(String),
    /// The selected leaf has no action.
    #[error("command `{0}` has no action")]
    MissingAction(String),
    /// Application-specific rejection while constructing a command.
    #[error("{0}")]
    Invalid(String),
}

/// A failure raised inside an action body.
///
/// Carries the exit code the process should end with.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct ActionError {
    code: i32,
    message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl ActionError {
    /// Exit code used when an action does not choose one.
    pub const DEFAULT_CODE: i32 = 1;

    /// Creates an error with the default exit code.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            code: Self::DEFAULT_CODE,
            message: message.into(),
            source: None,
        }
    }

    /// Overrides the exit code.
    pub fn with_code(mut self, code: i32) -> Self {
        self.code = code;
        self
    }

    /// Exit code the process should end with.
    pub fn code(&self) -> i32 {
        self.code
    }
}

impl From<std::io::Error> for ActionError {
    fn from(err: std::io::Error) -> Self {
        Self {
            code: Self::DEFAULT_CODE,
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}

impl From<serde_json::Error> for ActionError {
    fn from(err: serde_json::Error) -> Self {
        Self {
            code: Self::DEFAULT_CODE,
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}

/// Errors loading or saving a [`DispatchConfig`](crate::DispatchConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File I/O failure.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// YAML parsing or serialization failure.
    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),
}

/// Any error the framework can produce.
///
/// Every specific error converts into it with `?`, so code driving the
/// stages by hand can return a single [`Result`].
///
/// # Examples
///
/// ```
/// use argcommand_core::error::{Error, Result};
/// use argcommand_core::{CommandDef, Grammar, ParseOutcome, parse};
///
/// fn selected(def: &CommandDef, args: &[&str]) -> Result<Vec<String>> {
///     let grammar = Grammar::build(def)?;
///     match parse(&grammar, args)? {
///         ParseOutcome::Invocation(invocation) => {
///             Ok(invocation.path().into_iter().map(String::from).collect())
///         }
///         ParseOutcome::Help(path) => Ok(path),
///     }
/// }
///
/// let err = selected(&CommandDef::new("-app"), &[]).unwrap_err();
/// assert!(matches!(err, Error::Schema(_)));
/// assert_eq!(
///     err.to_string(),
///     "invalid command definition at `-app`: invalid command name: \"-app\""
/// );
/// ```
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid command definition.
    #[error(transparent)]
    Schema(#[from] SchemaError),
    /// Invalid user input.
    #[error(transparent)]
    Parse(#[from] ParseFailure),
    /// Attribute/field mismatch.
    #[error(transparent)]
    Bind(#[from] BindError),
    /// Action failure.
    #[error(transparent)]
    Action(#[from] ActionError),
    /// Configuration failure.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Convenience alias for results with [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
