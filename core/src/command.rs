//! Command definitions and the traits command types implement.
//!
//! A [`CommandDef`] is the declarative node an application writes: its
//! arguments, nested subcommands, and the Rust type instantiated when the
//! command is selected. Leaf commands register an action type
//! ([`CommandDef::with_action`]); intermediate commands may register a
//! state-only type ([`CommandDef::with_state`]) whose fields the leaf reads
//! through [`Context::parent`].
//!
//! # Example
//!
//! ```
//! use std::io::Write;
//!
//! use argcommand_core::*;
//!
//! struct Greet {
//!     name: String,
//! }
//!
//! impl FromAttributes for Greet {
//!     fn from_attributes(attrs: &mut Attributes) -> Result<Self, BindError> {
//!         Ok(Self { name: attrs.take("name")? })
//!     }
//! }
//!
//! impl Run for Greet {
//!     fn run(&mut self, ctx: &mut Context<'_>) -> Result<Status, ActionError> {
//!         writeln!(ctx.out(), "hello {}", self.name)?;
//!         Ok(Status::Success)
//!     }
//! }
//!
//! let app = CommandDef::new("app").with_subcommand(
//!     CommandDef::new("greet")
//!         .with_summary("Says hello")
//!         .with_arg(Argument::positional("name"))
//!         .with_action::<Greet>(),
//! );
//! assert_eq!(app.subcommand_names(), vec!["greet"]);
//! ```

use std::any::Any;
use std::fmt;
use std::io::Write;

use serde::{Serialize, Serializer};

use crate::argument::Argument;
use crate::attributes::Attributes;
use crate::binder::Instance;
use crate::error::{ActionError, BindError};
use crate::grammar::Grammar;

/// Constructs a command instance from its level's bound attributes.
pub trait FromAttributes: Sized + 'static {
    /// Takes this command's fields out of `attrs`.
    ///
    /// # Errors
    ///
    /// Returns a [`BindError`] when an attribute is missing or mistyped.
    fn from_attributes(attrs: &mut Attributes) -> Result<Self, BindError>;
}

/// The action of a leaf command.
pub trait Run {
    /// Runs the command.
    ///
    /// # Errors
    ///
    /// Returns an [`ActionError`] carrying the process exit code.
    fn run(&mut self, ctx: &mut Context<'_>) -> Result<Status, ActionError>;
}

/// Outcome of a successful action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Status {
    /// Exit with code 0.
    #[default]
    Success,
    /// Exit with the given code.
    Code(i32),
}

impl Status {
    /// Process exit code for this status.
    pub fn code(self) -> i32 {
        match self {
            Status::Success => 0,
            Status::Code(code) => code,
        }
    }
}

/// Everything an action can reach while it runs.
pub struct Context<'a> {
    grammar: &'a Grammar,
    path: &'a [String],
    ancestors: &'a [Instance],
    out: &'a mut dyn Write,
}

impl<'a> Context<'a> {
    pub(crate) fn new(
        grammar: &'a Grammar,
        path: &'a [String],
        ancestors: &'a [Instance],
        out: &'a mut dyn Write,
    ) -> Self {
        Self {
            grammar,
            path,
            ancestors,
            out,
        }
    }

    /// Command path from the root to the running leaf.
    pub fn path(&self) -> &[String] {
        self.path
    }

    /// Grammar the invocation was parsed against.
    pub fn grammar(&self) -> &Grammar {
        self.grammar
    }

    /// Nearest ancestor instance of type `T`.
    pub fn parent<T: 'static>(&self) -> Option<&T> {
        self.ancestors
            .iter()
            .rev()
            .find_map(|instance| instance.downcast_ref::<T>())
    }

    /// Output stream for the action.
    pub fn out(&mut self) -> &mut (dyn Write + 'a) {
        &mut *self.out
    }
}

pub(crate) type BindFn = fn(&mut Attributes) -> Result<Box<dyn Any>, BindError>;
pub(crate) type RunFn = fn(&mut (dyn Any + 'static), &mut Context<'_>) -> Result<Status, ActionError>;

/// Type registered on a command level.
#[derive(Clone, Copy)]
pub(crate) enum Binding {
    None,
    State {
        type_name: &'static str,
        bind: BindFn,
    },
    Action {
        type_name: &'static str,
        bind: BindFn,
        run: RunFn,
    },
}

impl Binding {
    fn kind(&self) -> &'static str {
        match self {
            Binding::None => "none",
            Binding::State { .. } => "state",
            Binding::Action { .. } => "action",
        }
    }

    fn type_name(&self) -> Option<&'static str> {
        match self {
            Binding::None => None,
            Binding::State { type_name, .. } | Binding::Action { type_name, .. } => Some(*type_name),
        }
    }

    pub(crate) fn has_action(&self) -> bool {
        matches!(self, Binding::Action { .. })
    }
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.type_name() {
            Some(type_name) => write!(f, "{}({type_name})", self.kind()),
            None => f.write_str(self.kind()),
        }
    }
}

impl PartialEq for Binding {
    fn eq(&self, other: &Self) -> bool {
        self.kind() == other.kind() && self.type_name() == other.type_name()
    }
}

impl Serialize for Binding {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.kind())
    }
}

fn bind_erased<T: FromAttributes>(attrs: &mut Attributes) -> Result<Box<dyn Any>, BindError> {
    Ok(Box::new(T::from_attributes(attrs)?))
}

fn run_erased<T: FromAttributes + Run>(
    instance: &mut (dyn Any + 'static),
    ctx: &mut Context<'_>,
) -> Result<Status, ActionError> {
    match instance.downcast_mut::<T>() {
        Some(command) => command.run(ctx),
        None => Err(ActionError::new(format!(
            "instance is not a {}",
            std::any::type_name::<T>()
        ))),
    }
}

/// Declarative definition of a command and its subcommands.
#[derive(Debug, Clone)]
pub struct CommandDef {
    /// Command name, matched against the token that selects it.
    pub name: String,
    /// One-line description shown in help.
    pub summary: Option<String>,
    /// Arguments in declaration order.
    pub arguments: Vec<Argument>,
    /// Nested subcommands in declaration order.
    pub subcommands: Vec<CommandDef>,
    pub(crate) binding: Binding,
}

impl CommandDef {
    /// Creates a command with no arguments, subcommands, or action.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            summary: None,
            arguments: Vec::new(),
            subcommands: Vec::new(),
            binding: Binding::None,
        }
    }

    /// Adds a summary.
    pub fn with_summary(mut self, summary: &str) -> Self {
        self.summary = Some(summary.to_string());
        self
    }

    /// Adds an argument.
    pub fn with_arg(mut self, arg: Argument) -> Self {
        self.arguments.push(arg);
        self
    }

    /// Adds a nested subcommand.
    pub fn with_subcommand(mut self, sub: CommandDef) -> Self {
        self.subcommands.push(sub);
        self
    }

    /// Registers `T` as the action run when this command is selected.
    pub fn with_action<T: FromAttributes + Run>(mut self) -> Self {
        self.binding = Binding::Action {
            type_name: std::any::type_name::<T>(),
            bind: bind_erased::<T>,
            run: run_erased::<T>,
        };
        self
    }

    /// Registers `T` as state instantiated when the invocation passes through
    /// this command. Its action, if any, is never run.
    pub fn with_state<T: FromAttributes>(mut self) -> Self {
        self.binding = Binding::State {
            type_name: std::any::type_name::<T>(),
            bind: bind_erased::<T>,
        };
        self
    }

    /// Whether an action type is registered.
    pub fn has_action(&self) -> bool {
        self.binding.has_action()
    }

    /// Finds a direct subcommand by name.
    pub fn find_subcommand(&self, name: &str) -> Option<&CommandDef> {
        self.subcommands.iter().find(|s| s.name == name)
    }

    /// Gets all direct subcommand names.
    pub fn subcommand_names(&self) -> Vec<&str> {
        self.subcommands.iter().map(|s| s.name.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Noop;

    impl FromAttributes for Noop {
        fn from_attributes(_attrs: &mut Attributes) -> Result<Self, BindError> {
            Ok(Noop)
        }
    }

    impl Run for Noop {
        fn run(&mut self, _ctx: &mut Context<'_>) -> Result<Status, ActionError> {
            Ok(Status::Code(3))
        }
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(Status::Success.code(), 0);
        assert_eq!(Status::Code(3).code(), 3);
    }

    #[test]
    fn test_bindings_compare_by_kind_and_type() {
        let a = CommandDef::new("a").with_action::<Noop>();
        let b = CommandDef::new("b").with_action::<Noop>();
        let c = CommandDef::new("c").with_state::<Noop>();

        assert!(a.has_action());
        assert!(!c.has_action());
        assert_eq!(a.binding, b.binding);
        assert_ne!(a.binding, c.binding);
        assert_ne!(c.binding, Binding::None);
    }

    #[test]
    fn test_find_subcommand() {
        let def = CommandDef::new("app")
            .with_subcommand(CommandDef::new("say"))
            .with_subcommand(CommandDef::new("firstline"));

        assert!(def.find_subcommand("say").is_some());
        assert!(def.find_subcommand("frobnicate").is_none());
        assert_eq!(def.subcommand_names(), vec!["say", "firstline"]);
    }
}
