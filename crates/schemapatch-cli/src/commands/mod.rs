use std::fs::File;
use std::io::prelude::*;

use clap::{Parser, ValueEnum};
use env_logger::Builder as LoggerBuilder;
use serde_json::Value;

pub mod convert;
pub mod mutate;

use crate::error::Error;

#[derive(Clone, Debug, Parser)]
pub struct Verbosity {
    /// Verbosity level, increase by multiplying v occurrences (warning, info, debug, trace)
    #[clap(long, short, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Verbosity {
    pub fn start(&self) -> Result<(), Error> {
        LoggerBuilder::new()
            .filter(
                None,
                match self.verbose {
                    0 => log::LevelFilter::Error,
                    1 => log::LevelFilter::Warn,
                    2 => log::LevelFilter::Info,
                    3 => log::LevelFilter::Debug,
                    _ => log::LevelFilter::Trace,
                },
            )
            .format_timestamp_nanos()
            .try_init()
            .map_err(|e| Error::LoggerStart(e.to_string()))?;

        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Yaml,
}

#[derive(Clone, Debug, Parser)]
pub struct Output {
    /// Returned format
    #[arg(value_enum, short, long, default_value = "json")]
    output: OutputFormat,
    /// Path of output file, default output to stdout
    #[clap(long)]
    to_file: Option<String>,
}

impl Output {
    pub fn show(&self, value: &Value) -> Result<(), Error> {
        let result = match self.output {
            OutputFormat::Yaml => serde_yaml::to_string(value).map_err(|e| Error::FileWrite {
                path: self.to_file.clone().unwrap_or_else(|| "<stdout>".to_string()),
                reason: e.to_string(),
            })?,
            OutputFormat::Json => serde_json::to_string_pretty(value).map_err(|e| Error::FileWrite {
                path: self.to_file.clone().unwrap_or_else(|| "<stdout>".to_string()),
                reason: e.to_string(),
            })?,
        };

        match &self.to_file {
            Some(filename) => {
                let mut file = File::create(filename).map_err(|e| Error::FileWrite {
                    path: filename.clone(),
                    reason: e.to_string(),
                })?;
                file.write_all(result.as_bytes())
                    .map_err(|e| Error::FileWrite {
                        path: filename.clone(),
                        reason: e.to_string(),
                    })
            }
            None => {
                println!("{result}");
                Ok(())
            }
        }
    }
}
