//! Argument descriptors.
//!
//! An [`Argument`] declares one parameter of a command: a positional
//! argument, a value-taking option, or a boolean switch. Descriptors are
//! plain data; the schema builder validates them and the parser applies them.

use serde::Serialize;

use crate::error::ParseError;
use crate::value::{Value, ValueType};

/// How many tokens an argument consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Arity {
    /// Exactly one token (the default).
    #[default]
    ExactlyOne,
    /// One token or none.
    ZeroOrOne,
    /// At least one token; binds a list.
    OneOrMore,
    /// Any number of tokens; binds a list.
    ZeroOrMore,
}

impl Arity {
    /// Whether the argument collects a list of tokens.
    pub fn is_variadic(self) -> bool {
        matches!(self, Arity::OneOrMore | Arity::ZeroOrMore)
    }
}

/// Kind of argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArgKind {
    /// Matched by position, in declaration order.
    Positional,
    /// Introduced by a flag alias and followed by its value(s).
    Option,
    /// Flag without a value; binds `true` when present.
    Switch,
}

/// Declarative description of one command argument.
///
/// `name` is the attribute the coerced value is bound to. Positionals are
/// displayed by their metavar (upper-cased name unless set); options and
/// switches by their flag aliases.
///
/// # Examples
///
/// ```
/// use argcommand_core::{Argument, Arity, ValueType};
///
/// let word = Argument::positional("what")
///     .with_metavar("WORD")
///     .with_default("Something")
///     .with_help("the text you want to print");
/// assert!(!word.is_required());
/// assert_eq!(word.label(), "WORD");
///
/// let times = Argument::option("times", &["--times", "-t"])
///     .with_type(ValueType::Int)
///     .with_default(1);
/// assert!(times.matches("-t"));
/// assert_eq!(times.label(), "--times/-t");
///
/// let files = Argument::positional("files")
///     .with_metavar("FILE")
///     .with_type(ValueType::InputFile)
///     .with_arity(Arity::OneOrMore);
/// assert!(files.is_required());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Argument {
    /// Attribute name the value is bound to.
    pub name: String,
    /// Positional, option, or switch.
    pub kind: ArgKind,
    /// Flag aliases, in declaration order (empty for positionals).
    pub flags: Vec<String>,
    /// Coercion applied to each token.
    pub value_type: ValueType,
    /// Number of tokens consumed.
    pub arity: Arity,
    /// Value bound when no token is supplied.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    /// Options only: must appear on the command line.
    pub required: bool,
    /// Display name of the value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metavar: Option<String>,
    /// Help text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub help: Option<String>,
    /// Options with [`Arity::ZeroOrOne`]: value bound when the flag is given
    /// without one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub const_value: Option<Value>,
}

impl Argument {
    fn base(name: &str, kind: ArgKind, flags: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            kind,
            flags: flags.iter().map(|f| (*f).to_string()).collect(),
            value_type: ValueType::String,
            arity: Arity::ExactlyOne,
            default: None,
            required: false,
            metavar: None,
            help: None,
            const_value: None,
        }
    }

    /// Creates a positional argument bound to `name`.
    pub fn positional(name: &str) -> Self {
        Self::base(name, ArgKind::Positional, &[])
    }

    /// Creates an option that takes a value, introduced by any of `flags`.
    pub fn option(name: &str, flags: &[&str]) -> Self {
        Self::base(name, ArgKind::Option, flags)
    }

    /// Creates a boolean switch introduced by any of `flags`.
    ///
    /// # Examples
    ///
    /// ```
    /// use argcommand_core::{Argument, Value};
    ///
    /// let quiet = Argument::switch("quiet", &["-q", "--quiet"]);
    /// assert!(!quiet.takes_value());
    /// assert_eq!(quiet.default, Some(Value::Bool(false)));
    /// ```
    pub fn switch(name: &str, flags: &[&str]) -> Self {
        let mut arg = Self::base(name, ArgKind::Switch, flags);
        arg.value_type = ValueType::Bool;
        arg.default = Some(Value::Bool(false));
        arg
    }

    /// Sets the value type.
    pub fn with_type(mut self, value_type: ValueType) -> Self {
        self.value_type = value_type;
        self
    }

    /// Restricts the value to one of `choices`.
    pub fn with_choices(mut self, choices: &[&str]) -> Self {
        self.value_type = ValueType::Choice(choices.iter().map(|c| (*c).to_string()).collect());
        self
    }

    /// Sets the arity.
    pub fn with_arity(mut self, arity: Arity) -> Self {
        self.arity = arity;
        self
    }

    /// Sets the default value.
    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }

    /// Sets the value bound when an optional-value flag is given bare.
    pub fn with_const(mut self, value: impl Into<Value>) -> Self {
        self.const_value = Some(value.into());
        self
    }

    /// Sets the display name of the value.
    pub fn with_metavar(mut self, metavar: &str) -> Self {
        self.metavar = Some(metavar.to_string());
        self
    }

    /// Adds help text.
    pub fn with_help(mut self, help: &str) -> Self {
        self.help = Some(help.to_string());
        self
    }

    /// Marks an option as mandatory.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Whether this is a positional argument.
    pub fn is_positional(&self) -> bool {
        self.kind == ArgKind::Positional
    }

    /// Whether the argument is followed by value tokens when flagged.
    pub fn takes_value(&self) -> bool {
        self.kind == ArgKind::Option
    }

    /// Whether parsing fails when the argument gets no token.
    ///
    /// A positional with a default is optional whatever its arity.
    pub fn is_required(&self) -> bool {
        match self.kind {
            ArgKind::Positional => {
                self.default.is_none() && matches!(self.arity, Arity::ExactlyOne | Arity::OneOrMore)
            }
            ArgKind::Option => self.required && self.default.is_none(),
            ArgKind::Switch => false,
        }
    }

    /// Checks if `flag` is one of this argument's aliases.
    pub fn matches(&self, flag: &str) -> bool {
        self.flags.iter().any(|f| f == flag)
    }

    /// Display name of the value (metavar, or the upper-cased name).
    pub fn value_name(&self) -> String {
        self.metavar
            .clone()
            .unwrap_or_else(|| self.name.to_uppercase())
    }

    /// Label used in diagnostics: the metavar for positionals, the flag
    /// aliases joined by `/` otherwise.
    pub fn label(&self) -> String {
        if self.is_positional() {
            self.value_name()
        } else {
            self.flags.join("/")
        }
    }

    /// Coerces one raw token with this argument's value type.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::Coercion`] naming this argument.
    pub fn coerce(&self, raw: &str) -> Result<Value, ParseError> {
        self.value_type
            .coerce(raw)
            .map_err(|reason| ParseError::Coercion {
                argument: self.label(),
                raw_value: raw.to_string(),
                reason,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positional_requirement_follows_arity_and_default() {
        assert!(Argument::positional("a").is_required());
        assert!(!Argument::positional("a").with_default("x").is_required());
        assert!(!Argument::positional("a").with_arity(Arity::ZeroOrOne).is_required());
        assert!(Argument::positional("a").with_arity(Arity::OneOrMore).is_required());
        assert!(!Argument::positional("a").with_arity(Arity::ZeroOrMore).is_required());
    }

    #[test]
    fn test_option_requirement() {
        let opt = Argument::option("level", &["--level"]);
        assert!(!opt.is_required());
        assert!(opt.clone().required().is_required());
        assert!(!opt.required().with_default(3).is_required());
    }

    #[test]
    fn test_labels() {
        assert_eq!(Argument::positional("files").label(), "FILES");
        assert_eq!(
            Argument::positional("files").with_metavar("FILE").label(),
            "FILE"
        );
        assert_eq!(
            Argument::option("times", &["-t", "--times"]).label(),
            "-t/--times"
        );
    }

    #[test]
    fn test_coerce_reports_label() {
        let arg = Argument::option("times", &["--times", "-t"]).with_type(ValueType::Int);
        let err = arg.coerce("many").unwrap_err();
        assert_eq!(
            err,
            ParseError::Coercion {
                argument: "--times/-t".to_string(),
                raw_value: "many".to_string(),
                reason: "invalid int value: 'many'".to_string(),
            }
        );
    }

    #[test]
    fn test_with_choices_sets_type() {
        let arg = Argument::option("format", &["--format"]).with_choices(&["json", "yaml"]);
        assert_eq!(
            arg.value_type,
            ValueType::Choice(vec!["json".to_string(), "yaml".to_string()])
        );
    }
}
