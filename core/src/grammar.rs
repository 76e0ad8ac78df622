//! Grammar construction and build-time validation.
//!
//! [`Grammar::build`] walks a [`CommandDef`] tree once, checks its structural
//! invariants, and produces an immutable grammar tree the parser runs
//! against. Every defect is reported as a [`SchemaError`] naming the command
//! path where it was found, before any user input is looked at.
//!
//! Checks performed per level:
//!
//! - command names are non-empty, contain no whitespace, and do not start
//!   with `-`; subcommand names are unique;
//! - attribute names are non-empty, unique within the level, and not bound by
//!   an ancestor level;
//! - positionals declare no flags; options and switches declare at least one
//!   well-formed flag (`-x` or `--name`), unique within the level and not a
//!   help flag;
//! - at most one multi-token positional, and it is the last positional;
//! - leaves have an action; commands with subcommands do not.
//!
//! # Examples
//!
//! ```
//! use argcommand_core::*;
//!
//! // A variadic positional must come last.
//! let def = CommandDef::new("copy")
//!     .with_arg(Argument::positional("sources").with_arity(Arity::OneOrMore))
//!     .with_arg(Argument::positional("dest"));
//!
//! let err = Grammar::build(&def).unwrap_err();
//! assert_eq!(err.path, "copy");
//! assert_eq!(
//!     err.kind,
//!     SchemaErrorKind::VariadicNotTrailing("sources".to_string())
//! );
//! ```

use std::collections::HashSet;

use serde::Serialize;
use tracing::debug;

use crate::argument::{ArgKind, Argument, Arity};
use crate::command::{Binding, CommandDef};
use crate::error::{SchemaError, SchemaErrorKind};
use crate::value::Value;

/// Flags that request help when no other set is configured.
pub const DEFAULT_HELP_FLAGS: &[&str] = &["-h", "--help"];

/// Options applied while building a grammar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrammarOptions {
    /// Flags that request help at any level. Empty disables help flags.
    pub help_flags: Vec<String>,
}

impl Default for GrammarOptions {
    fn default() -> Self {
        Self {
            help_flags: DEFAULT_HELP_FLAGS.iter().map(|f| (*f).to_string()).collect(),
        }
    }
}

/// One validated command level.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GrammarNode {
    pub(crate) name: String,
    pub(crate) path: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) summary: Option<String>,
    pub(crate) arguments: Vec<Argument>,
    pub(crate) subcommands: Vec<GrammarNode>,
    pub(crate) binding: Binding,
}

impl GrammarNode {
    /// Command name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Command path from the root, this level included.
    pub fn path(&self) -> &[String] {
        &self.path
    }

    /// One-line description.
    pub fn summary(&self) -> Option<&str> {
        self.summary.as_deref()
    }

    /// All arguments in declaration order.
    pub fn arguments(&self) -> &[Argument] {
        &self.arguments
    }

    /// Positional arguments in declaration order.
    pub fn positionals(&self) -> impl Iterator<Item = &Argument> {
        self.arguments.iter().filter(|a| a.is_positional())
    }

    /// Options and switches in declaration order.
    pub fn options(&self) -> impl Iterator<Item = &Argument> {
        self.arguments.iter().filter(|a| !a.is_positional())
    }

    /// Nested levels in declaration order.
    pub fn subcommands(&self) -> &[GrammarNode] {
        &self.subcommands
    }

    /// Whether this level has no subcommands.
    pub fn is_leaf(&self) -> bool {
        self.subcommands.is_empty()
    }

    /// Finds a direct subcommand by name.
    pub fn find_subcommand(&self, name: &str) -> Option<&GrammarNode> {
        self.subcommands.iter().find(|s| s.name == name)
    }

    /// Finds the option or switch declaring `flag`.
    pub fn find_option(&self, flag: &str) -> Option<&Argument> {
        self.options().find(|a| a.matches(flag))
    }

    /// Gets all direct subcommand names.
    pub fn subcommand_names(&self) -> Vec<String> {
        self.subcommands.iter().map(|s| s.name.clone()).collect()
    }

    /// Every flag alias declared at this level.
    pub fn flag_names(&self) -> Vec<String> {
        self.options().flat_map(|a| a.flags.iter().cloned()).collect()
    }
}

/// Immutable grammar tree built from a [`CommandDef`].
///
/// Grammars are never mutated after [`build`](Grammar::build), so one
/// instance can serve any number of invocations, from any thread.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Grammar {
    root: GrammarNode,
    help_flags: Vec<String>,
}

impl Grammar {
    /// Builds a grammar with the default help flags.
    ///
    /// # Errors
    ///
    /// Returns the first [`SchemaError`] found, depth-first in declaration
    /// order.
    pub fn build(def: &CommandDef) -> Result<Self, SchemaError> {
        Self::build_with(def, &GrammarOptions::default())
    }

    /// Builds a grammar with explicit options.
    ///
    /// # Errors
    ///
    /// Returns the first [`SchemaError`] found, depth-first in declaration
    /// order.
    pub fn build_with(def: &CommandDef, options: &GrammarOptions) -> Result<Self, SchemaError> {
        validate_help_flags(def, &options.help_flags)?;
        let mut builder = Builder {
            help_flags: &options.help_flags,
            path: Vec::new(),
            inherited: HashSet::new(),
        };
        let root = builder.node(def)?;
        debug!(command = %root.name, "built command grammar");
        Ok(Self {
            root,
            help_flags: options.help_flags.clone(),
        })
    }

    /// Root level.
    pub fn root(&self) -> &GrammarNode {
        &self.root
    }

    /// Flags that request help.
    pub fn help_flags(&self) -> &[String] {
        &self.help_flags
    }

    /// Whether `token` requests help.
    pub fn is_help_flag(&self, token: &str) -> bool {
        self.help_flags.iter().any(|f| f == token)
    }

    /// Looks up a level by its full path, root name first.
    pub fn node(&self, path: &[String]) -> Option<&GrammarNode> {
        let (first, rest) = path.split_first()?;
        if *first != self.root.name {
            return None;
        }
        rest.iter()
            .try_fold(&self.root, |node, name| node.find_subcommand(name))
    }

    /// Serializes the grammar as indented JSON.
    ///
    /// # Errors
    ///
    /// Returns the serializer error, which only happens for non-finite float
    /// defaults.
    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

struct Builder<'o> {
    help_flags: &'o [String],
    path: Vec<String>,
    inherited: HashSet<String>,
}

impl Builder<'_> {
    fn fail(&self, kind: SchemaErrorKind) -> SchemaError {
        SchemaError::new(&self.path, kind)
    }

    fn node(&mut self, def: &CommandDef) -> Result<GrammarNode, SchemaError> {
        let name = def.name.as_str();
        self.path.push(name.to_string());
        let result = self.node_inner(def);
        self.path.pop();
        result
    }

    fn node_inner(&mut self, def: &CommandDef) -> Result<GrammarNode, SchemaError> {
        if !is_valid_command_name(&def.name) {
            return Err(self.fail(SchemaErrorKind::InvalidCommandName(def.name.clone())));
        }

        let own_names = self.validate_arguments(&def.arguments)?;

        if def.subcommands.is_empty() {
            if !def.binding.has_action() {
                return Err(self.fail(SchemaErrorKind::MissingAction));
            }
        } else if def.binding.has_action() {
            return Err(self.fail(SchemaErrorKind::ActionOnBranch));
        }

        let mut seen: HashSet<&str> = HashSet::new();
        for sub in &def.subcommands {
            if !seen.insert(sub.name.as_str()) {
                return Err(self.fail(SchemaErrorKind::DuplicateSubcommand(sub.name.clone())));
            }
        }

        self.inherited.extend(own_names.iter().cloned());
        let subcommands: Result<Vec<_>, _> =
            def.subcommands.iter().map(|sub| self.node(sub)).collect();
        for name in &own_names {
            self.inherited.remove(name);
        }

        debug!(
            path = %self.path.join(" "),
            arguments = def.arguments.len(),
            subcommands = def.subcommands.len(),
            "validated command level"
        );

        Ok(GrammarNode {
            name: def.name.clone(),
            path: self.path.clone(),
            summary: def.summary.clone(),
            arguments: def.arguments.clone(),
            subcommands: subcommands?,
            binding: def.binding,
        })
    }

    /// Validates one level's arguments and returns their attribute names.
    fn validate_arguments(&self, arguments: &[Argument]) -> Result<Vec<String>, SchemaError> {
        let mut names: Vec<String> = Vec::new();
        let mut flags: HashSet<&str> = HashSet::new();
        let mut variadic: Option<&str> = None;

        for arg in arguments {
            if arg.name.trim().is_empty() {
                return Err(self.fail(SchemaErrorKind::EmptyArgumentName));
            }
            if names.contains(&arg.name) {
                return Err(self.fail(SchemaErrorKind::DuplicateAttribute(arg.name.clone())));
            }
            if self.inherited.contains(&arg.name) {
                return Err(self.fail(SchemaErrorKind::ShadowedAttribute(arg.name.clone())));
            }
            names.push(arg.name.clone());

            match arg.kind {
                ArgKind::Positional => {
                    if !arg.flags.is_empty() {
                        return Err(
                            self.fail(SchemaErrorKind::PositionalWithFlags(arg.name.clone()))
                        );
                    }
                    if let Some(previous) = variadic {
                        return Err(self.fail(SchemaErrorKind::VariadicNotTrailing(
                            previous.to_string(),
                        )));
                    }
                    if arg.arity.is_variadic() {
                        variadic = Some(arg.name.as_str());
                    }
                }
                ArgKind::Option | ArgKind::Switch => {
                    if arg.flags.is_empty() {
                        return Err(self.fail(SchemaErrorKind::MissingFlag(arg.name.clone())));
                    }
                    for flag in &arg.flags {
                        if !is_valid_flag(flag) {
                            return Err(self.fail(SchemaErrorKind::InvalidFlag(flag.clone())));
                        }
                        if self.help_flags.contains(flag) {
                            return Err(self.fail(SchemaErrorKind::ReservedFlag(flag.clone())));
                        }
                        if !flags.insert(flag.as_str()) {
                            return Err(self.fail(SchemaErrorKind::DuplicateFlag(flag.clone())));
                        }
                    }
                    if arg.kind == ArgKind::Option
                        && arg.arity == Arity::ZeroOrOne
                        && arg.const_value.is_none()
                    {
                        return Err(self.fail(SchemaErrorKind::MissingConst(arg.name.clone())));
                    }
                }
            }

            let collects_list = arg.kind != ArgKind::Switch && arg.arity.is_variadic();
            if collects_list && arg.default.as_ref().is_some_and(|d| !matches!(d, Value::List(_)))
            {
                return Err(self.fail(SchemaErrorKind::DefaultNotList(arg.name.clone())));
            }
        }

        Ok(names)
    }
}

/// Checks that every help flag is a well-formed `-x` or `--name` flag,
/// listed once.
fn validate_help_flags(def: &CommandDef, help_flags: &[String]) -> Result<(), SchemaError> {
    let root = [def.name.clone()];
    let mut seen: HashSet<&str> = HashSet::new();
    for flag in help_flags {
        if !is_valid_flag(flag) {
            return Err(SchemaError::new(&root, SchemaErrorKind::InvalidFlag(flag.clone())));
        }
        if !seen.insert(flag.as_str()) {
            return Err(SchemaError::new(&root, SchemaErrorKind::DuplicateFlag(flag.clone())));
        }
    }
    Ok(())
}

fn is_valid_command_name(name: &str) -> bool {
    !name.is_empty() && !name.starts_with('-') && !name.chars().any(char::is_whitespace)
}

fn is_valid_flag(flag: &str) -> bool {
    if let Some(long) = flag.strip_prefix("--") {
        long.len() >= 2 && !long.starts_with('-') && !long.contains('=')
    } else if let Some(short) = flag.strip_prefix('-') {
        let mut chars = short.chars();
        matches!((chars.next(), chars.next()), (Some(c), None) if c != '-')
    } else {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::Attributes;
    use crate::command::{Context, FromAttributes, Run, Status};
    use crate::error::{ActionError, BindError};
    use crate::value::ValueType;

    struct Leaf;

    impl FromAttributes for Leaf {
        fn from_attributes(_attrs: &mut Attributes) -> Result<Self, BindError> {
            Ok(Leaf)
        }
    }

    impl Run for Leaf {
        fn run(&mut self, _ctx: &mut Context<'_>) -> Result<Status, ActionError> {
            Ok(Status::Success)
        }
    }

    fn leaf(name: &str) -> CommandDef {
        CommandDef::new(name).with_action::<Leaf>()
    }

    fn demo() -> CommandDef {
        CommandDef::new("app")
            .with_subcommand(
                leaf("say")
                    .with_arg(Argument::positional("what").with_default("Something"))
                    .with_arg(
                        Argument::option("times", &["--times", "-t"])
                            .with_type(ValueType::Int)
                            .with_default(1),
                    ),
            )
            .with_subcommand(
                leaf("firstline").with_arg(
                    Argument::positional("files")
                        .with_metavar("FILE")
                        .with_arity(Arity::OneOrMore),
                ),
            )
    }

    fn build_err(def: &CommandDef) -> SchemaError {
        Grammar::build(def).unwrap_err()
    }

    #[test]
    fn test_build_accepts_valid_tree() {
        let grammar = Grammar::build(&demo()).unwrap();
        assert_eq!(grammar.root().name(), "app");
        assert_eq!(grammar.root().subcommand_names(), vec!["say", "firstline"]);
        assert_eq!(
            grammar.root().find_subcommand("say").unwrap().path(),
            &["app".to_string(), "say".to_string()]
        );
    }

    #[test]
    fn test_build_is_idempotent() {
        let def = demo();
        let first = Grammar::build(&def).unwrap();
        let second = Grammar::build(&def).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.to_json_pretty().unwrap(), second.to_json_pretty().unwrap());
    }

    #[test]
    fn test_node_lookup_by_path() {
        let grammar = Grammar::build(&demo()).unwrap();
        let path = vec!["app".to_string(), "firstline".to_string()];
        assert_eq!(grammar.node(&path).unwrap().name(), "firstline");
        assert!(grammar.node(&["other".to_string()]).is_none());
        assert!(grammar.node(&[]).is_none());
    }

    #[test]
    fn test_rejects_non_trailing_variadic() {
        let def = CommandDef::new("app").with_subcommand(
            leaf("copy")
                .with_arg(Argument::positional("sources").with_arity(Arity::OneOrMore))
                .with_arg(Argument::positional("dest")),
        );
        let err = build_err(&def);
        assert_eq!(err.path, "app copy");
        assert_eq!(
            err.kind,
            SchemaErrorKind::VariadicNotTrailing("sources".to_string())
        );
    }

    #[test]
    fn test_rejects_two_variadics() {
        let def = leaf("copy")
            .with_arg(Argument::positional("a").with_arity(Arity::ZeroOrMore))
            .with_arg(Argument::positional("b").with_arity(Arity::OneOrMore));
        assert_eq!(
            build_err(&def).kind,
            SchemaErrorKind::VariadicNotTrailing("a".to_string())
        );
    }

    #[test]
    fn test_rejects_duplicate_flag() {
        let def = leaf("say")
            .with_arg(Argument::option("times", &["-t"]))
            .with_arg(Argument::switch("terse", &["-t"]));
        assert_eq!(
            build_err(&def).kind,
            SchemaErrorKind::DuplicateFlag("-t".to_string())
        );
    }

    #[test]
    fn test_rejects_bad_flag_format() {
        for flag in ["t", "-tt", "---x", "--x", "--a=b"] {
            let def = leaf("say").with_arg(Argument::switch("x", &[flag]));
            assert_eq!(
                build_err(&def).kind,
                SchemaErrorKind::InvalidFlag(flag.to_string()),
                "flag {flag} should be rejected"
            );
        }
    }

    #[test]
    fn test_rejects_help_flag_redeclaration() {
        let def = leaf("say").with_arg(Argument::switch("host", &["-h"]));
        assert_eq!(
            build_err(&def).kind,
            SchemaErrorKind::ReservedFlag("-h".to_string())
        );

        let options = GrammarOptions {
            help_flags: vec!["--help".to_string()],
        };
        assert!(Grammar::build_with(&def, &options).is_ok());
    }

    #[test]
    fn test_rejects_invalid_help_flag() {
        let build = |flags: &[&str]| {
            let options = GrammarOptions {
                help_flags: flags.iter().map(|f| (*f).to_string()).collect(),
            };
            Grammar::build_with(&demo(), &options)
        };

        let err = build(&["say"]).unwrap_err();
        assert_eq!(err.path, "app");
        assert_eq!(err.kind, SchemaErrorKind::InvalidFlag("say".to_string()));
        assert_eq!(
            build(&["-h", ""]).unwrap_err().kind,
            SchemaErrorKind::InvalidFlag(String::new())
        );
        assert_eq!(
            build(&["-h", "-h"]).unwrap_err().kind,
            SchemaErrorKind::DuplicateFlag("-h".to_string())
        );
        assert!(build(&[]).is_ok());
        assert!(build(&["-?", "--usage"]).is_ok());
    }

    #[test]
    fn test_rejects_missing_action_on_leaf() {
        let def = CommandDef::new("app").with_subcommand(CommandDef::new("say"));
        let err = build_err(&def);
        assert_eq!(err.path, "app say");
        assert_eq!(err.kind, SchemaErrorKind::MissingAction);
    }

    #[test]
    fn test_rejects_action_on_branch() {
        let def = leaf("app").with_subcommand(leaf("say"));
        let err = build_err(&def);
        assert_eq!(err.path, "app");
        assert_eq!(err.kind, SchemaErrorKind::ActionOnBranch);
    }

    #[test]
    fn test_rejects_duplicate_subcommand() {
        let def = CommandDef::new("app")
            .with_subcommand(leaf("say"))
            .with_subcommand(leaf("say"));
        assert_eq!(
            build_err(&def).kind,
            SchemaErrorKind::DuplicateSubcommand("say".to_string())
        );
    }

    #[test]
    fn test_rejects_shadowed_attribute() {
        let def = CommandDef::new("app")
            .with_arg(Argument::switch("verbose", &["-v"]))
            .with_subcommand(
                CommandDef::new("remote")
                    .with_subcommand(leaf("add").with_arg(Argument::positional("verbose"))),
            );
        let err = build_err(&def);
        assert_eq!(err.path, "app remote add");
        assert_eq!(
            err.kind,
            SchemaErrorKind::ShadowedAttribute("verbose".to_string())
        );
    }

    #[test]
    fn test_sibling_levels_may_reuse_attribute_names() {
        let def = CommandDef::new("app")
            .with_subcommand(leaf("a").with_arg(Argument::positional("name")))
            .with_subcommand(leaf("b").with_arg(Argument::positional("name")));
        assert!(Grammar::build(&def).is_ok());
    }

    #[test]
    fn test_rejects_flags_on_positional_and_flagless_option() {
        let mut positional = Argument::positional("what");
        positional.flags.push("--what".to_string());
        assert_eq!(
            build_err(&leaf("say").with_arg(positional)).kind,
            SchemaErrorKind::PositionalWithFlags("what".to_string())
        );

        assert_eq!(
            build_err(&leaf("say").with_arg(Argument::option("times", &[]))).kind,
            SchemaErrorKind::MissingFlag("times".to_string())
        );
    }

    #[test]
    fn test_rejects_optional_value_without_const() {
        let def = leaf("say").with_arg(
            Argument::option("color", &["--color"]).with_arity(Arity::ZeroOrOne),
        );
        assert_eq!(
            build_err(&def).kind,
            SchemaErrorKind::MissingConst("color".to_string())
        );
    }

    #[test]
    fn test_rejects_scalar_default_on_variadic() {
        let def = leaf("cat").with_arg(
            Argument::positional("files")
                .with_arity(Arity::ZeroOrMore)
                .with_default("a.txt"),
        );
        assert_eq!(
            build_err(&def).kind,
            SchemaErrorKind::DefaultNotList("files".to_string())
        );
    }

    #[test]
    fn test_rejects_invalid_command_names() {
        for name in ["", "-x", "two words"] {
            let err = build_err(&leaf(name));
            assert_eq!(
                err.kind,
                SchemaErrorKind::InvalidCommandName(name.to_string())
            );
        }
    }
}
