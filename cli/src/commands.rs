//! Command tree of the demo application.

use std::io::Write;

use argcommand_core::{
    ActionError, Argument, Arity, Attributes, BindError, CommandDef, Context, FromAttributes,
    InputFile, Run, Status, ValueType,
};

/// Builds the demo command tree.
pub fn app() -> CommandDef {
    CommandDef::new("argcommand-demo")
        .with_summary("A small demo of declarative subcommands")
        .with_arg(
            Argument::switch("quiet", &["-q", "--quiet"]).with_help("suppress the output of say"),
        )
        .with_state::<Root>()
        .with_subcommand(
            CommandDef::new("say")
                .with_summary("Prints a message to the screen")
                .with_arg(
                    Argument::positional("what")
                        .with_metavar("WORD")
                        .with_default("Something")
                        .with_help("the text you want to print"),
                )
                .with_arg(
                    Argument::option("times", &["--times", "-t"])
                        .with_type(ValueType::Int)
                        .with_default(1)
                        .with_metavar("T")
                        .with_help("how many times you want to repeat the text"),
                )
                .with_action::<Say>(),
        )
        .with_subcommand(
            CommandDef::new("firstline")
                .with_summary("Prints the first line of any file in the input")
                .with_arg(
                    Argument::positional("files")
                        .with_type(ValueType::InputFile)
                        .with_arity(Arity::OneOrMore)
                        .with_metavar("FILE")
                        .with_help("The files to read"),
                )
                .with_action::<FirstLine>(),
        )
        .with_subcommand(
            CommandDef::new("schema")
                .with_summary("Prints the command grammar as JSON")
                .with_action::<Schema>(),
        )
}

/// Options shared by every subcommand.
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
        // Negative counts print an empty line.
        let times = usize::try_from(self.times).unwrap_or(0);
        writeln!(ctx.out(), "{}", self.what.repeat(times))?;
        Ok(Status::Success)
    }
}

struct FirstLine {
    files: Vec<InputFile>,
}

impl FromAttributes for FirstLine {
    fn from_attributes(attrs: &mut Attributes) -> Result<Self, BindError> {
        Ok(Self {
            files: attrs.take("files")?,
        })
    }
}

impl Run for FirstLine {
    fn run(&mut self, ctx: &mut Context<'_>) -> Result<Status, ActionError> {
        for file in &self.files {
            let line = file.read_first_line().map_err(|err| {
                ActionError::new(format!("can't read '{}': {err}", file.path().display()))
            })?;
            writeln!(ctx.out(), "{line}")?;
        }
        Ok(Status::Success)
    }
}

struct Schema;

impl FromAttributes for Schema {
    fn from_attributes(_attrs: &mut Attributes) -> Result<Self, BindError> {
        Ok(Schema)
    }
}

impl Run for Schema {
    fn run(&mut self, ctx: &mut Context<'_>) -> Result<Status, ActionError> {
        let json = ctx.grammar().to_json_pretty()?;
        writeln!(ctx.out(), "{json}")?;
        Ok(Status::Success)
    }
}
