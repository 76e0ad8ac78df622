//! Usage and help text.

use crate::argument::{ArgKind, Argument, Arity};
use crate::grammar::{Grammar, GrammarNode};

/// Gap between the two help columns.
const TAB_SPACE: &str = "  ";

/// Widest left column before descriptions move to their own line.
const MAX_LEFT_WIDTH: usize = 24;

/// Renders the one-line usage for the level at `path`.
///
/// The root's name is replaced by `program`. Unknown paths fall back to the
/// deepest known level.
///
/// # Examples
///
/// ```
/// use argcommand_core::*;
/// # struct Say;
/// # impl FromAttributes for Say {
/// #     fn from_attributes(_: &mut Attributes) -> Result<Self, BindError> { Ok(Say) }
/// # }
/// # impl Run for Say {
/// #     fn run(&mut self, _: &mut Context<'_>) -> Result<Status, ActionError> { Ok(Status::Success) }
/// # }
///
/// let def = CommandDef::new("demo").with_subcommand(
///     CommandDef::new("say")
///         .with_arg(Argument::positional("what").with_metavar("WORD").with_default("Something"))
///         .with_arg(Argument::option("times", &["-t", "--times"]).with_metavar("T"))
///         .with_action::<Say>(),
/// );
/// let grammar = Grammar::build(&def).unwrap();
/// let path = vec!["demo".to_string(), "say".to_string()];
/// assert_eq!(
///     render_usage(&grammar, &path, "demo"),
///     "usage: demo say [-h] [-t T] [WORD]"
/// );
/// ```
pub fn render_usage(grammar: &Grammar, path: &[String], program: &str) -> String {
    let node = resolve(grammar, path);
    let mut parts: Vec<String> = vec![format!("usage: {program}")];
    parts.extend(node.path().iter().skip(1).cloned());

    if let Some(help) = grammar.help_flags().first() {
        parts.push(format!("[{help}]"));
    }
    parts.extend(node.options().map(option_usage));
    parts.extend(node.positionals().map(positional_usage));
    if !node.is_leaf() {
        parts.push("<command> ...".to_string());
    }

    parts.join(" ")
}

/// Renders the full help text for the level at `path`.
pub fn render_help(grammar: &Grammar, path: &[String], program: &str) -> String {
    let node = resolve(grammar, path);
    let mut out = render_usage(grammar, path, program);
    out.push('\n');

    if let Some(summary) = node.summary() {
        out.push('\n');
        out.push_str(summary);
        out.push('\n');
    }

    let positionals: Vec<(String, String)> = node
        .positionals()
        .map(|arg| (arg.value_name(), describe(arg)))
        .collect();
    if !positionals.is_empty() {
        out.push_str("\npositional arguments:\n");
        tab_to(&mut out, &positionals);
    }

    let commands: Vec<(String, String)> = node
        .subcommands()
        .iter()
        .map(|sub| (sub.name().to_string(), sub.summary().unwrap_or_default().to_string()))
        .collect();
    if !commands.is_empty() {
        out.push_str("\ncommands:\n");
        tab_to(&mut out, &commands);
    }

    let mut options: Vec<(String, String)> = Vec::new();
    if !grammar.help_flags().is_empty() {
        options.push((
            grammar.help_flags().join(", "),
            "show this help message and exit".to_string(),
        ));
    }
    options.extend(node.options().map(|arg| (option_left(arg), describe(arg))));
    if !options.is_empty() {
        out.push_str("\noptions:\n");
        tab_to(&mut out, &options);
    }

    out
}

fn resolve<'g>(grammar: &'g Grammar, path: &[String]) -> &'g GrammarNode {
    let mut node = grammar.root();
    for name in path.iter().skip(1) {
        match node.find_subcommand(name) {
            Some(child) => node = child,
            None => break,
        }
    }
    node
}

fn value_usage(arg: &Argument) -> String {
    let name = arg.value_name();
    match arg.arity {
        Arity::ExactlyOne => name,
        Arity::ZeroOrOne => format!("[{name}]"),
        Arity::OneOrMore => format!("{name} [{name} ...]"),
        Arity::ZeroOrMore => format!("[{name} ...]"),
    }
}

fn option_usage(arg: &Argument) -> String {
    let flag = arg.flags.first().map(String::as_str).unwrap_or_default();
    let body = match arg.kind {
        ArgKind::Switch => flag.to_string(),
        _ => format!("{flag} {}", value_usage(arg)),
    };
    if arg.is_required() {
        body
    } else {
        format!("[{body}]")
    }
}

fn positional_usage(arg: &Argument) -> String {
    let usage = value_usage(arg);
    if arg.is_required() || arg.arity.is_variadic() || arg.arity == Arity::ZeroOrOne {
        usage
    } else {
        format!("[{usage}]")
    }
}

fn option_left(arg: &Argument) -> String {
    let flags = arg.flags.join(", ");
    if arg.takes_value() {
        format!("{flags} {}", value_usage(arg))
    } else {
        flags
    }
}

fn describe(arg: &Argument) -> String {
    let mut text = arg.help.clone().unwrap_or_default();
    if arg.kind != ArgKind::Switch {
        if let Some(default) = &arg.default {
            if !text.is_empty() {
                text.push(' ');
            }
            text.push_str(&format!("(default: {default})"));
        }
    }
    text
}

/// Pads the left column so descriptions line up.
fn tab_to(out: &mut String, rows: &[(String, String)]) {
    let width = rows
        .iter()
        .map(|(left, _)| left.len())
        .filter(|len| *len <= MAX_LEFT_WIDTH)
        .max()
        .unwrap_or(0);

    for (left, right) in rows {
        if right.is_empty() {
            out.push_str(&format!("  {left}\n"));
        } else if left.len() > MAX_LEFT_WIDTH {
            let indent = " ".repeat(width + 2 + TAB_SPACE.len());
            out.push_str(&format!("  {left}\n{indent}{right}\n"));
        } else {
            let padding = " ".repeat(width - left.len());
            out.push_str(&format!("  {left}{padding}{TAB_SPACE}{right}\n"));
        }
    }
}
