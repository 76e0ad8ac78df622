//! Argument vector parsing and coercion.
//!
//! [`parse`] walks the token vector left to right against a [`Grammar`],
//! one command level at a time:
//!
//! - a token naming one of the level's flags is consumed together with its
//!   value token(s); `--name=value` and `-nVALUE` forms are accepted;
//! - a token naming a subcommand ends the level and descends into it;
//! - any other token fills the next positional, in declaration order;
//! - `--` makes every later token of the level positional;
//! - a help flag stops parsing and asks for that level's help.
//!
//! Each token is coerced as soon as it is consumed. When input runs out the
//! level's defaults are applied and its required arguments checked.
//!
//! # Examples
//!
//! ```
//! use argcommand_core::*;
//! # struct Say;
//! # impl FromAttributes for Say {
//! #     fn from_attributes(_: &mut Attributes) -> Result<Self, BindError> { Ok(Say) }
//! # }
//! # impl Run for Say {
//! #     fn run(&mut self, _: &mut Context<'_>) -> Result<Status, ActionError> { Ok(Status::Success) }
//! # }
//!
//! let def = CommandDef::new("app").with_subcommand(
//!     CommandDef::new("say")
//!         .with_arg(Argument::positional("what").with_default("Something"))
//!         .with_arg(
//!             Argument::option("times", &["--times", "-t"])
//!                 .with_type(ValueType::Int)
//!                 .with_default(1),
//!         )
//!         .with_action::<Say>(),
//! );
//! let grammar = Grammar::build(&def).unwrap();
//!
//! let ParseOutcome::Invocation(invocation) = parse(&grammar, &["say", "-t", "3", "hi"]).unwrap()
//! else {
//!     panic!("expected an invocation");
//! };
//! assert_eq!(invocation.path(), vec!["app", "say"]);
//! assert_eq!(invocation.get("what"), Some(&Value::from("hi")));
//! assert_eq!(invocation.get("times"), Some(&Value::Int(3)));
//! ```

use serde::Serialize;
use tracing::{debug, trace};

use crate::argument::{ArgKind, Argument, Arity};
use crate::attributes::Attributes;
use crate::error::{ParseError, ParseFailure};
use crate::grammar::{Grammar, GrammarNode};
use crate::value::Value;

/// Attributes bound at one command level.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LevelBinding {
    /// Command name of the level.
    pub name: String,
    /// Values bound by the level's own arguments.
    pub attributes: Attributes,
}

/// Result of a successful parse: the selected path and every level's
/// attributes, root first.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Invocation {
    levels: Vec<LevelBinding>,
}

impl Invocation {
    /// Command names from the root to the selected leaf.
    pub fn path(&self) -> Vec<&str> {
        self.levels.iter().map(|l| l.name.as_str()).collect()
    }

    /// Per-level bindings, root first.
    pub fn levels(&self) -> &[LevelBinding] {
        &self.levels
    }

    /// Bindings of the selected leaf.
    pub fn leaf(&self) -> Option<&LevelBinding> {
        self.levels.last()
    }

    /// Looks up an attribute on any level.
    ///
    /// Attribute names never collide across a path, so at most one level
    /// binds `name`.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.levels.iter().find_map(|l| l.attributes.get(name))
    }

    /// Consumes the invocation, returning its levels.
    pub fn into_levels(self) -> Vec<LevelBinding> {
        self.levels
    }
}

/// What the parser produced.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseOutcome {
    /// A fully bound invocation of a leaf command.
    Invocation(Invocation),
    /// A help flag was given; holds the path of the level it was given at.
    Help(Vec<String>),
}

/// Parses `args` (program name excluded) against `grammar`.
///
/// # Errors
///
/// Returns a [`ParseFailure`] carrying the [`ParseError`] and the path of the
/// level being parsed when it occurred.
pub fn parse<S: AsRef<str>>(grammar: &Grammar, args: &[S]) -> Result<ParseOutcome, ParseFailure> {
    let tokens: Vec<&str> = args.iter().map(AsRef::as_ref).collect();
    debug!(tokens = tokens.len(), "parsing argument vector");
    Parser {
        grammar,
        tokens: &tokens,
        pos: 0,
        path: Vec::new(),
    }
    .run()
}

enum LevelEnd<'g> {
    Descend(&'g GrammarNode, Attributes),
    Finished(Attributes),
    Help,
}

struct Parser<'g, 't> {
    grammar: &'g Grammar,
    tokens: &'t [&'t str],
    pos: usize,
    path: Vec<String>,
}

impl<'g, 't> Parser<'g, 't> {
    fn run(mut self) -> Result<ParseOutcome, ParseFailure> {
        let mut node = self.grammar.root();
        let mut levels = Vec::new();

        loop {
            self.path.push(node.name.clone());
            let end = self.level(node).map_err(|error| ParseFailure {
                level: self.path.clone(),
                error,
            })?;

            match end {
                LevelEnd::Descend(child, attributes) => {
                    trace!(from = %node.name, to = %child.name, "descending into subcommand");
                    levels.push(LevelBinding {
                        name: node.name.clone(),
                        attributes,
                    });
                    node = child;
                }
                LevelEnd::Finished(attributes) => {
                    levels.push(LevelBinding {
                        name: node.name.clone(),
                        attributes,
                    });
                    debug!(path = %self.path.join(" "), "selected command");
                    return Ok(ParseOutcome::Invocation(Invocation { levels }));
                }
                LevelEnd::Help => {
                    debug!(path = %self.path.join(" "), "help requested");
                    return Ok(ParseOutcome::Help(self.path));
                }
            }
        }
    }

    fn next(&mut self) -> Option<&'t str> {
        let token = self.tokens.get(self.pos).copied();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn peek(&self) -> Option<&'t str> {
        self.tokens.get(self.pos).copied()
    }

    /// Consumes the next token if it can be a value.
    fn next_value(&mut self) -> Option<&'t str> {
        match self.peek() {
            Some(token) if !looks_like_flag(token) => self.next(),
            _ => None,
        }
    }

    fn rest_from(&self, start: usize) -> Vec<String> {
        self.tokens[start..].iter().map(|t| (*t).to_string()).collect()
    }

    fn level(&mut self, node: &'g GrammarNode) -> Result<LevelEnd<'g>, ParseError> {
        let mut state = LevelState::new(node);
        let mut positional_only = false;

        while let Some(token) = self.next() {
            if !positional_only {
                if token == "--" {
                    positional_only = true;
                    continue;
                }
                if self.grammar.is_help_flag(token) {
                    return Ok(LevelEnd::Help);
                }
                if looks_like_flag(token) {
                    self.flag(node, token, &mut state)?;
                    continue;
                }
                if let Some(child) = node.find_subcommand(token) {
                    return Ok(LevelEnd::Descend(child, state.finish()?));
                }
            }

            if state.accept_positional(token)? {
                continue;
            }

            // After `--` a command name is still a positional choice, taken
            // once the level's own positionals are filled.
            if positional_only {
                if let Some(child) = node.find_subcommand(token) {
                    return Ok(LevelEnd::Descend(child, state.finish()?));
                }
            }

            if !node.is_leaf() {
                return Err(ParseError::UnknownCommand {
                    token: token.to_string(),
                    available: node.subcommand_names(),
                });
            }
            return Err(ParseError::UnexpectedArgument {
                tokens: self.rest_from(self.pos - 1),
            });
        }

        let attributes = state.finish()?;
        if !node.is_leaf() {
            return Err(ParseError::MissingSubcommand {
                level_path: self.path.join(" "),
            });
        }
        Ok(LevelEnd::Finished(attributes))
    }

    fn flag(
        &mut self,
        node: &'g GrammarNode,
        token: &str,
        state: &mut LevelState<'g>,
    ) -> Result<(), ParseError> {
        let (flag, inline) = split_inline_value(node, token);
        let Some(arg) = node.find_option(flag) else {
            return Err(ParseError::UnknownOption {
                flag: flag.to_string(),
                available: node.flag_names(),
            });
        };
        trace!(flag, argument = %arg.name, "matched flag");

        let value = match arg.kind {
            ArgKind::Switch => {
                if let Some(raw) = inline {
                    return Err(ParseError::Coercion {
                        argument: arg.label(),
                        raw_value: raw.to_string(),
                        reason: "ignored explicit argument".to_string(),
                    });
                }
                Value::Bool(true)
            }
            ArgKind::Option => self.option_value(node, arg, inline)?,
            ArgKind::Positional => unreachable!("find_option never returns positionals"),
        };
        state.values.insert(&arg.name, value);
        Ok(())
    }

    fn option_value(
        &mut self,
        node: &GrammarNode,
        arg: &Argument,
        inline: Option<&str>,
    ) -> Result<Value, ParseError> {
        let missing = || ParseError::MissingValue { flag: arg.label() };

        match arg.arity {
            Arity::ExactlyOne => {
                let raw = match inline {
                    Some(raw) => raw,
                    None => self.next_value().ok_or_else(missing)?,
                };
                arg.coerce(raw)
            }
            Arity::ZeroOrOne => match inline.or_else(|| self.next_value()) {
                Some(raw) => arg.coerce(raw),
                None => arg.const_value.clone().ok_or_else(missing),
            },
            Arity::OneOrMore | Arity::ZeroOrMore => {
                let mut items = Vec::new();
                if let Some(raw) = inline {
                    items.push(arg.coerce(raw)?);
                }
                while let Some(token) = self.peek() {
                    if looks_like_flag(token) || node.find_subcommand(token).is_some() {
                        break;
                    }
                    self.pos += 1;
                    items.push(arg.coerce(token)?);
                }
                if items.is_empty() && arg.arity == Arity::OneOrMore {
                    return Err(missing());
                }
                Ok(Value::List(items))
            }
        }
    }
}

/// Positional cursor and bound values for the level being parsed.
struct LevelState<'g> {
    node: &'g GrammarNode,
    positionals: Vec<&'g Argument>,
    cursor: usize,
    pending: Vec<Value>,
    values: Attributes,
}

impl<'g> LevelState<'g> {
    fn new(node: &'g GrammarNode) -> Self {
        Self {
            node,
            positionals: node.positionals().collect(),
            cursor: 0,
            pending: Vec::new(),
            values: Attributes::new(),
        }
    }

    /// Binds `token` to the next open positional; `false` if none is left.
    fn accept_positional(&mut self, token: &str) -> Result<bool, ParseError> {
        let Some(arg) = self.positionals.get(self.cursor).copied() else {
            return Ok(false);
        };
        let value = arg.coerce(token)?;
        if arg.arity.is_variadic() {
            self.pending.push(value);
        } else {
            self.values.insert(&arg.name, value);
            self.cursor += 1;
        }
        Ok(true)
    }

    /// Applies defaults and checks required arguments.
    fn finish(mut self) -> Result<Attributes, ParseError> {
        if let Some(arg) = self.positionals.get(self.cursor).copied() {
            if arg.arity.is_variadic() && !self.pending.is_empty() {
                let items = std::mem::take(&mut self.pending);
                self.values.insert(&arg.name, Value::List(items));
            }
        }

        for arg in self.node.arguments() {
            if self.values.contains(&arg.name) {
                continue;
            }
            if let Some(default) = &arg.default {
                self.values.insert(&arg.name, default.clone());
            } else if arg.is_required() {
                return Err(ParseError::MissingArgument {
                    argument: arg.label(),
                });
            } else if arg.is_positional() && arg.arity == Arity::ZeroOrMore {
                self.values.insert(&arg.name, Value::List(Vec::new()));
            }
        }

        Ok(self.values)
    }
}

/// Splits `--name=value` and `-nVALUE` into flag and inline value.
fn split_inline_value<'t>(node: &GrammarNode, token: &'t str) -> (&'t str, Option<&'t str>) {
    if token.starts_with("--") {
        return match token.split_once('=') {
            Some((flag, value)) => (flag, Some(value)),
            None => (token, None),
        };
    }

    if let Some((boundary, _)) = token.char_indices().nth(2) {
        let (flag, value) = token.split_at(boundary);
        if node.find_option(token).is_none()
            && node.find_option(flag).is_some_and(Argument::takes_value)
        {
            return (flag, Some(value));
        }
    }
    (token, None)
}

/// Whether `token` should be treated as a flag rather than a value.
fn looks_like_flag(token: &str) -> bool {
    token.starts_with('-') && token != "-" && !looks_like_negative_number(token)
}

fn looks_like_negative_number(token: &str) -> bool {
    let Some(digits) = token.strip_prefix('-') else {
        return false;
    };
    !digits.is_empty()
        && digits.chars().all(|c| c.is_ascii_digit() || c == '.')
        && digits.chars().filter(|c| *c == '.').count() <= 1
        && digits.chars().any(|c| c.is_ascii_digit())
}
