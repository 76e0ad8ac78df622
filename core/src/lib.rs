//! Declarative command-line framework.
//!
//! Applications describe their command tree as data and get parsing, value
//! coercion, help text, and dispatch for free:
//!
//! - [`Argument`]: one positional, option, or switch with its flags, value
//!   type, arity, default, and help.
//! - [`CommandDef`]: a command with its arguments, nested subcommands, and
//!   the Rust type instantiated when it is selected.
//! - [`Grammar`]: the validated, immutable form of a `CommandDef` tree.
//!   Building it reports every structural defect as a [`SchemaError`] before
//!   any user input is read.
//! - [`parse`]: turns an argument vector into an [`Invocation`], the
//!   selected command path and each level's coerced [`Attributes`].
//! - [`bind`]: instantiates each level's type through [`FromAttributes`].
//! - [`Dispatcher`]: runs the leaf's [`Run`] action and maps every outcome
//!   to a message and exit code.
//!
//! # Example
//!
//! ```
//! use std::io::Write;
//!
//! use argcommand_core::*;
//!
//! struct Say {
//!     what: String,
//!     times: i64,
//! }
//!
//! impl FromAttributes for Say {
//!     fn from_attributes(attrs: &mut Attributes) -> Result<Self, BindError> {
//!         Ok(Self {
//!             what: attrs.take("what")?,
//!             times: attrs.take("times")?,
//!         })
//!     }
//! }
//!
//! impl Run for Say {
//!     fn run(&mut self, ctx: &mut Context<'_>) -> Result<Status, ActionError> {
//!         let times = usize::try_from(self.times).unwrap_or(0);
//!         writeln!(ctx.out(), "{}", self.what.repeat(times))?;
//!         Ok(Status::Success)
//!     }
//! }
//!
//! let app = CommandDef::new("app").with_subcommand(
//!     CommandDef::new("say")
//!         .with_summary("Prints a message to the screen")
//!         .with_arg(Argument::positional("what").with_metavar("WORD").with_default("Something"))
//!         .with_arg(
//!             Argument::option("times", &["--times", "-t"])
//!                 .with_type(ValueType::Int)
//!                 .with_default(1)
//!                 .with_metavar("T"),
//!         )
//!         .with_action::<Say>(),
//! );
//!
//! let dispatcher = Dispatcher::new(&app).unwrap();
//! let (mut out, mut err) = (Vec::new(), Vec::new());
//! assert_eq!(dispatcher.dispatch(&["say", "-t", "2", "hi"], &mut out, &mut err), 0);
//! assert_eq!(out, b"hihi\n");
//! ```

mod argument;
mod attributes;
mod binder;
mod command;
mod config;
mod dispatch;
pub mod error;
mod grammar;
mod help;
mod parser;
mod value;

pub use argument::{ArgKind, Argument, Arity};
pub use attributes::Attributes;
pub use binder::{BoundCommand, Instance, bind};
pub use command::{CommandDef, Context, FromAttributes, Run, Status};
pub use config::{DEFECT_EXIT_CODE, DispatchConfig, USAGE_EXIT_CODE};
pub use dispatch::{Dispatcher, dispatch, execute, execute_with};
pub use error::{
    ActionError, BindError, ConfigError, Error, ParseError, ParseFailure, SchemaError,
    SchemaErrorKind,
};
pub use grammar::{DEFAULT_HELP_FLAGS, Grammar, GrammarNode, GrammarOptions};
pub use help::{render_help, render_usage};
pub use parser::{Invocation, LevelBinding, ParseOutcome, parse};
pub use value::{CustomType, FromValue, InputFile, Value, ValueType};
