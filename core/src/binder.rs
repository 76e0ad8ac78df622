//! Command instantiation.
//!
//! [`bind`] turns a parsed [`Invocation`] into live command objects: one per
//! traversed level that registered a type, each built from that level's own
//! attributes. Only the leaf's action is run; ancestors are kept so the leaf
//! can read shared state through [`Context::parent`].

use std::any::Any;
use std::fmt;
use std::io::Write;

use tracing::{debug, trace};

use crate::command::{Binding, Context, RunFn, Status};
use crate::error::{ActionError, BindError};
use crate::grammar::{Grammar, GrammarNode};
use crate::parser::Invocation;

/// An instantiated command level.
pub struct Instance {
    name: String,
    object: Option<Box<dyn Any>>,
}

impl Instance {
    /// Command name of the level.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the level registered a type.
    pub fn is_bound(&self) -> bool {
        self.object.is_some()
    }

    /// Borrows the instance as `T`, if that is its type.
    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        self.object.as_deref().and_then(|o| o.downcast_ref::<T>())
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("name", &self.name)
            .field("bound", &self.is_bound())
            .finish()
    }
}

/// A selected leaf command with every level instantiated, ready to run.
pub struct BoundCommand {
    path: Vec<String>,
    ancestors: Vec<Instance>,
    leaf: Box<dyn Any>,
    run: RunFn,
}

impl BoundCommand {
    /// Command path from the root to the leaf.
    pub fn path(&self) -> &[String] {
        &self.path
    }

    /// Instances of the levels above the leaf, root first.
    pub fn ancestors(&self) -> &[Instance] {
        &self.ancestors
    }

    /// Borrows the leaf instance as `T`, if that is its type.
    pub fn leaf<T: 'static>(&self) -> Option<&T> {
        self.leaf.downcast_ref::<T>()
    }

    /// Runs the leaf action, writing its output to `out`.
    ///
    /// The instances are dropped when the action returns.
    ///
    /// # Errors
    ///
    /// Returns whatever [`ActionError`] the action raised.
    pub fn run(self, grammar: &Grammar, out: &mut dyn Write) -> Result<Status, ActionError> {
        let BoundCommand {
            path,
            ancestors,
            mut leaf,
            run,
        } = self;
        debug!(path = %path.join(" "), "running command action");
        let mut ctx = Context::new(grammar, &path, &ancestors, out);
        run(leaf.as_mut(), &mut ctx)
    }
}

impl fmt::Debug for BoundCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundCommand")
            .field("path", &self.path)
            .field("ancestors", &self.ancestors)
            .finish_non_exhaustive()
    }
}

/// Instantiates every level of `invocation` against `grammar`.
///
/// # Errors
///
/// Returns a [`BindError`] when a command type rejects its attributes, or
/// when the invocation does not match the grammar.
pub fn bind(grammar: &Grammar, invocation: Invocation) -> Result<BoundCommand, BindError> {
    let mut levels = invocation.into_levels().into_iter();
    let Some(first) = levels.next() else {
        return Err(BindError::UnknownCommand(String::new()));
    };
    if first.name != grammar.root().name() {
        return Err(BindError::UnknownCommand(first.name));
    }

    let mut node: &GrammarNode = grammar.root();
    let mut path = vec![first.name.clone()];
    let mut ancestors: Vec<Instance> = Vec::new();
    let mut current = first;

    loop {
        let mut attributes = current.attributes;
        match levels.next() {
            Some(next) => {
                let object = match node.binding {
                    Binding::None => None,
                    Binding::State { bind, .. } | Binding::Action { bind, .. } => {
                        Some(bind(&mut attributes)?)
                    }
                };
                trace!(command = %current.name, bound = object.is_some(), "instantiated level");
                ancestors.push(Instance {
                    name: current.name,
                    object,
                });

                node = node
                    .find_subcommand(&next.name)
                    .ok_or_else(|| BindError::UnknownCommand(next.name.clone()))?;
                path.push(next.name.clone());
                current = next;
            }
            None => {
                let Binding::Action { bind, run, .. } = node.binding else {
                    return Err(BindError::MissingAction(path.join(" ")));
                };
                let leaf = bind(&mut attributes)?;
                debug!(path = %path.join(" "), "bound command");
                return Ok(BoundCommand {
                    path,
                    ancestors,
                    leaf,
                    run,
                });
            }
        }
    }
}
