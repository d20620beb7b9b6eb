use clap::{Parser, Subcommand};
use serde_json::json;

use crate::commands::{Output, Verbosity};
use crate::error::Error;
use crate::schema_io::load_value;

#[derive(Clone, Debug, Parser)]
pub struct Opts {
    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Clone, Debug)]
pub enum Command {
    /// Expand a patch file containing `{"$": "<expression>"}` placeholders,
    /// then merge the result onto the object
    Template(TemplateOpts),

    /// Evaluate a single expression against the object, then merge the
    /// result onto the object
    Eval(EvalOpts),

    /// Evaluate a single `objects.apply(oldObject, {...})` expression, which
    /// performs the merge itself
    Apply(ApplyOpts),
}

#[derive(Clone, Debug, Parser)]
pub struct TemplateOpts {
    /// Path to the OpenAPI-shaped schema the object and patch are validated against
    #[clap(long)]
    schema: Option<String>,

    /// Path to the object being mutated
    #[clap(long)]
    object: String,

    /// Path to the patch file
    #[clap(long)]
    patch: String,

    #[clap(flatten)]
    output: Output,

    #[clap(flatten)]
    verbose: Verbosity,
}

#[derive(Clone, Debug, Parser)]
pub struct EvalOpts {
    /// Path to the OpenAPI-shaped schema the object is validated against
    #[clap(long)]
    schema: Option<String>,

    /// Path to the object being mutated
    #[clap(long)]
    object: String,

    /// CEL-dialect expression evaluated against `oldObject`
    #[clap(long)]
    mutation: String,

    #[clap(flatten)]
    output: Output,

    #[clap(flatten)]
    verbose: Verbosity,
}

#[derive(Clone, Debug, Parser)]
pub struct ApplyOpts {
    /// Path to the OpenAPI-shaped schema the object is validated against
    #[clap(long)]
    schema: Option<String>,

    /// Path to the object being mutated
    #[clap(long)]
    object: String,

    /// Object-construction literal, evaluated as `objects.apply(oldObject, <mutation>)`
    #[clap(long)]
    mutation: String,

    #[clap(flatten)]
    output: Output,

    #[clap(flatten)]
    verbose: Verbosity,
}

pub fn execute(opts: Opts) -> Result<(), Error> {
    match opts.command {
        Command::Template(o) => {
            o.verbose.start()?;
            let schema = o.schema.map(|p| load_value(&p)).transpose()?;
            let object = load_value(&o.object)?;
            let patch = load_value(&o.patch)?;

            let result = schemapatch::orchestrate::mutate_template(schema.as_ref(), &object, &patch)?;
            o.output.show(&result)
        }
        Command::Eval(o) => {
            o.verbose.start()?;
            let schema = o.schema.map(|p| load_value(&p)).transpose()?;
            let object = load_value(&o.object)?;
            let patch = json!({ "mutation": o.mutation });

            let result = schemapatch::orchestrate::mutate_eval(schema.as_ref(), &object, &patch)?;
            o.output.show(&result)
        }
        Command::Apply(o) => {
            o.verbose.start()?;
            let schema = o.schema.map(|p| load_value(&p)).transpose()?;
            let object = load_value(&o.object)?;
            let patch = json!({ "mutation": o.mutation });

            let result = schemapatch::orchestrate::mutate_apply(schema.as_ref(), &object, &patch)?;
            o.output.show(&result)
        }
    }
}
