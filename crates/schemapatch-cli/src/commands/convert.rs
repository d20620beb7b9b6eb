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
    /// Expand a patch file against the target schema, prune the object to
    /// the target schema, and merge
    Template(TemplateOpts),

    /// Evaluate a single expression (with `oldObject` and `convertedObject`
    /// bound) and merge the result onto the pruned object
    Eval(EvalOpts),

    /// Evaluate a single `objects.apply(convertedObject, {...})` expression,
    /// which performs the merge itself
    Apply(ApplyOpts),
}

#[derive(Clone, Debug, Parser)]
pub struct TemplateOpts {
    /// Path to the object's current schema
    #[clap(long = "from-schema")]
    from_schema: Option<String>,

    /// Path to the schema being converted to
    #[clap(long = "to-schema")]
    to_schema: Option<String>,

    /// Path to the object being converted
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
    #[clap(long = "from-schema")]
    from_schema: Option<String>,

    #[clap(long = "to-schema")]
    to_schema: Option<String>,

    #[clap(long)]
    object: String,

    /// CEL-dialect expression evaluated with `oldObject`/`convertedObject` bound
    #[clap(long)]
    mutation: String,

    #[clap(flatten)]
    output: Output,

    #[clap(flatten)]
    verbose: Verbosity,
}

#[derive(Clone, Debug, Parser)]
pub struct ApplyOpts {
    #[clap(long = "from-schema")]
    from_schema: Option<String>,

    #[clap(long = "to-schema")]
    to_schema: Option<String>,

    #[clap(long)]
    object: String,

    /// Object-construction literal, evaluated as `objects.apply(convertedObject, <mutation>)`
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
            let from_schema = o.from_schema.map(|p| load_value(&p)).transpose()?;
            let to_schema = o.to_schema.map(|p| load_value(&p)).transpose()?;
            let object = load_value(&o.object)?;
            let patch = load_value(&o.patch)?;

            let result = schemapatch::orchestrate::convert_template(
                from_schema.as_ref(),
                to_schema.as_ref(),
                &object,
                &patch,
            )?;
            o.output.show(&result)
        }
        Command::Eval(o) => {
            o.verbose.start()?;
            let from_schema = o.from_schema.map(|p| load_value(&p)).transpose()?;
            let to_schema = o.to_schema.map(|p| load_value(&p)).transpose()?;
            let object = load_value(&o.object)?;
            let patch = json!({ "mutation": o.mutation });

            let result = schemapatch::orchestrate::convert_eval(
                from_schema.as_ref(),
                to_schema.as_ref(),
                &object,
                &patch,
            )?;
            o.output.show(&result)
        }
        Command::Apply(o) => {
            o.verbose.start()?;
            let from_schema = o.from_schema.map(|p| load_value(&p)).transpose()?;
            let to_schema = o.to_schema.map(|p| load_value(&p)).transpose()?;
            let object = load_value(&o.object)?;
            let patch = json!({ "mutation": o.mutation });

            let result = schemapatch::orchestrate::convert_apply(
                from_schema.as_ref(),
                to_schema.as_ref(),
                &object,
                &patch,
            )?;
            o.output.show(&result)
        }
    }
}
