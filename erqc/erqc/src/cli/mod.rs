#![cfg(not(target_family = "wasm"))]

use std::env;
use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::process::exit;

use anstream::eprintln;
use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand, ValueHint};
use clap_verbosity_flag::LogLevel;
use clio::Output;
use is_terminal::IsTerminal;
use itertools::Itertools;

use crate::debug;
use crate::{compile, erq_to_pr, erq_to_tokens, DisplayOptions, Options, Rule, Statement};

/// Entrypoint called by [`crate::main`]
pub fn main() -> color_eyre::eyre::Result<()> {
    let mut cli = Cli::parse();

    // redirect all log messages into the [debug::DebugLog]
    static LOGGER: debug::MessageLogger = debug::MessageLogger;
    log::set_logger(&LOGGER).map(|()| log::set_max_level(cli.verbose.log_level_filter()))?;

    color_eyre::install()?;
    cli.color.write_global();

    if let Err(error) = cli.command.run() {
        eprintln!("{error}");
        // Same check as the standard library's, which is private
        fn backtrace_enabled() -> bool {
            match env::var("RUST_LIB_BACKTRACE") {
                Ok(s) => s != "0",
                Err(_) => match env::var("RUST_BACKTRACE") {
                    Ok(s) => s != "0",
                    Err(_) => false,
                },
            }
        }
        if backtrace_enabled() {
            eprintln!("{:#}", error.backtrace());
        }

        exit(1)
    }

    Ok(())
}

#[derive(Parser, Debug, Clone)]
struct Cli {
    #[command(subcommand)]
    command: Command,
    #[command(flatten)]
    color: colorchoice_clap::Color,

    #[command(flatten)]
    verbose: clap_verbosity_flag::Verbosity<LoggingHelp>,
}

#[derive(Subcommand, Debug, Clone)]
#[command(name = env!("CARGO_PKG_NAME"), about, version)]
enum Command {
    /// Lex into Lexer Representation
    Lex {
        #[command(flatten)]
        io_args: IoArgs,
        #[arg(value_enum, long, default_value = "yaml")]
        format: Format,
    },

    /// Parse into PR AST
    Parse {
        #[command(flatten)]
        io_args: IoArgs,
        #[arg(value_enum, long, default_value = "yaml")]
        format: Format,
        /// Grammar rule the whole input must match
        #[arg(short, long, default_value = "script", env = "ERQC_RULE")]
        rule: Rule,
    },

    /// Parse & compile into statement descriptors, as JSON
    #[command(name = "compile")]
    Compile {
        #[command(flatten)]
        io_args: IoArgs,

        /// Grammar rule the whole input must match
        #[arg(short, long, default_value = "script", env = "ERQC_RULE")]
        rule: Rule,

        /// Split emitted SQL over multiple lines
        #[arg(long)]
        format: bool,

        /// File path into which to write the debug log to.
        #[arg(long, env = "ERQC_DEBUG_LOG")]
        debug_log: Option<PathBuf>,
    },

    /// Parse & compile, printing only the SQL texts
    ///
    /// Nested statements of `if` and `for` blocks are included, in order.
    /// Commands have no SQL and are skipped.
    #[command(name = "sql")]
    Sql {
        #[command(flatten)]
        io_args: IoArgs,

        /// Grammar rule the whole input must match
        #[arg(short, long, default_value = "script", env = "ERQC_RULE")]
        rule: Rule,

        /// Split emitted SQL over multiple lines
        #[arg(long)]
        format: bool,
    },
}

#[derive(clap::Args, Default, Debug, Clone)]
pub struct IoArgs {
    #[arg(value_parser, default_value = "-", value_hint(ValueHint::FilePath))]
    input: clio::ClioPath,

    #[arg(value_parser, default_value = "-", value_hint(ValueHint::FilePath))]
    output: Output,
}

#[derive(Copy, Clone, Debug, Default)]
struct LoggingHelp;

impl LogLevel for LoggingHelp {
    /// By default, this will only report errors.
    fn default() -> Option<log::Level> {
        Some(log::Level::Error)
    }
    fn verbose_help() -> Option<&'static str> {
        Some("Increase logging verbosity")
    }

    fn verbose_long_help() -> Option<&'static str> {
        Some(
            r#"More `v`s, More verbose logging:
-v shows warnings
-vv shows info
-vvv shows debug
-vvvv shows trace"#,
        )
    }

    fn quiet_help() -> Option<&'static str> {
        Some("Silences logging output")
    }

    fn quiet_long_help() -> Option<&'static str> {
        Some("Silences logging output")
    }
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum Format {
    Json,
    Yaml,
}

impl Command {
    /// Entrypoint called by [`main`]
    pub fn run(&mut self) -> Result<()> {
        let source = self.read_input()?;
        let buf = self.execute(&source)?;
        Ok(self.write_output(&buf)?)
    }

    fn execute(&self, source: &str) -> Result<Vec<u8>> {
        Ok(match self {
            Command::Lex { format, .. } => {
                let tokens = erq_to_tokens(source)?;
                match format {
                    Format::Json => serde_json::to_string_pretty(&tokens)?.into_bytes(),
                    Format::Yaml => serde_yaml::to_string(&tokens)?.into_bytes(),
                }
            }
            Command::Parse { format, rule, .. } => {
                let stmts = erq_to_pr(source, *rule)?;
                match format {
                    Format::Json => serde_json::to_string_pretty(&stmts)?.into_bytes(),
                    Format::Yaml => serde_yaml::to_string(&stmts)?.into_bytes(),
                }
            }
            Command::Compile {
                rule,
                format,
                debug_log,
                ..
            } => {
                if debug_log.is_some() {
                    debug::log_start();
                }

                let res = compile(source, &options(*rule, *format));

                if let Some(path) = debug_log {
                    write_log(path)?;
                }

                let mut json = serde_json::to_string_pretty(&res?)?;
                json.push('\n');
                json.into_bytes()
            }
            Command::Sql { rule, format, .. } => {
                let statements = compile(source, &options(*rule, *format))?;
                collect_queries(&statements)
                    .into_iter()
                    .map(|q| format!("{q};\n"))
                    .join("")
                    .into_bytes()
            }
        })
    }

    fn io_args(&self) -> &IoArgs {
        match self {
            Command::Lex { io_args, .. }
            | Command::Parse { io_args, .. }
            | Command::Compile { io_args, .. }
            | Command::Sql { io_args, .. } => io_args,
        }
    }

    fn read_input(&mut self) -> Result<String> {
        let input = &self.io_args().input;

        // Don't wait without a prompt when reading a terminal, it's
        // confusing whether it's waiting for input or not.
        if input.path() == Path::new("-") && std::io::stdin().is_terminal() {
            #[cfg(unix)]
            eprintln!("Enter Erq, then press ctrl-d to compile:\n");
            #[cfg(windows)]
            eprintln!("Enter Erq, then press ctrl-z to compile:\n");
        }

        let mut source = String::new();
        input.clone().open()?.read_to_string(&mut source)?;
        Ok(source)
    }

    fn write_output(&mut self, data: &[u8]) -> std::io::Result<()> {
        let mut output = self.io_args().output.clone();
        output.write_all(data)
    }
}

fn options(rule: Rule, format: bool) -> Options {
    Options::default()
        .with_rule(rule)
        .with_format(format)
        .with_display(DisplayOptions::AnsiColor)
}

/// SQL texts of `statements` and of their nested blocks, depth first.
fn collect_queries(statements: &[Statement]) -> Vec<&str> {
    let mut res = Vec::new();
    for statement in statements {
        res.extend(statement.queries());
        match statement {
            Statement::If {
                then_statements,
                else_statements,
                ..
            } => {
                res.extend(collect_queries(then_statements));
                res.extend(collect_queries(else_statements));
            }
            Statement::For {
                body_statements, ..
            } => res.extend(collect_queries(body_statements)),
            _ => {}
        }
    }
    res
}

pub fn write_log(path: &Path) -> Result<()> {
    let debug_log = debug::log_finish().ok_or_else(|| {
        anyhow!("debug log was started, but it cannot be found after compilation")
    })?;
    match path.extension().and_then(|s| s.to_str()) {
        Some("json") => {
            let file = BufWriter::new(File::create(path)?);
            serde_json::to_writer(file, &debug_log)?;
        }
        _ => {
            return Err(anyhow!("unknown debug log format for file {path:?}"));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use insta::assert_snapshot;

    use super::*;

    fn sql_command() -> Command {
        Command::Sql {
            io_args: IoArgs::default(),
            rule: Rule::Script,
            format: false,
        }
    }

    #[test]
    fn sql_includes_nested_blocks() {
        let output = sql_command()
            .execute("for a in T do U[id = 1];; end;;\n.headers on\ndrop table T")
            .unwrap();
        assert_snapshot!(String::from_utf8(output).unwrap(), @r"
        select a from T;
        select * from U where (id = 1);
        drop table T;
        ");
    }

    /// Check we get an error on a bad input
    #[test]
    fn compile_bad() {
        anstream::ColorChoice::Never.write_global();

        let result = Command::Compile {
            io_args: IoArgs::default(),
            rule: Rule::Script,
            format: false,
            debug_log: None,
        }
        .execute("T{a +}");

        let message = result.unwrap_err().to_string();
        assert!(message.contains("T{a +}"));
    }

    #[test]
    fn compile_to_descriptors() {
        let result = Command::Compile {
            io_args: IoArgs::default(),
            rule: Rule::Statement,
            format: false,
            debug_log: None,
        }
        .execute("T[a]{b} output sparse")
        .unwrap();

        assert_snapshot!(String::from_utf8(result).unwrap(), @r#"
        [
          {
            "type": "select",
            "query": "select b from T where (a)",
            "format": "sparse"
          }
        ]
        "#);
    }
}
