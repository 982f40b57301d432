//! # FuzzKit CLI
//!
//! Load an FCL model and evaluate it, either one-shot from the command line
//! or interactively:
//!
//! ```bash
//! # one-shot: inputs in declaration order
//! fuzzkit aiwisdom.fcl --inputs 50,50
//!
//! # interactive
//! fuzzkit aiwisdom.fcl
//! > set 0 50
//! > set 1 25
//! > eval
//! > quit
//! ```

use anyhow::{bail, Context};
use clap::Parser;
use std::io::{self, Write};

use fuzzkit::{Config, ModelRegistry};

#[derive(Parser)]
#[command(name = "fuzzkit", about = "Fuzzy logic inference on FCL models")]
struct Args {
    /// Path to the FCL model file
    model: String,

    /// Comma-separated crisp inputs, in variable declaration order.
    /// When given, evaluates once and exits.
    #[arg(long, value_delimiter = ',')]
    inputs: Option<Vec<f64>>,
}

fn main() -> anyhow::Result<()> {
    let config = Config::load().unwrap_or_default();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level)),
        )
        .init();

    let args = Args::parse();

    let registry = ModelRegistry::new(config.registry_config());
    let model = registry.new_model();
    if let Err(err) = registry.load_fcl_file(model, &args.model) {
        if let Ok(Some(msg)) = registry.take_msg_text(model) {
            bail!("failed to load '{}': {msg}", args.model);
        }
        return Err(err).with_context(|| format!("failed to load '{}'", args.model));
    }

    let num_inputs = registry.with_model(model, fuzzkit::Model::num_inputs)?;
    let child = registry.new_child(model)?;

    if let Some(values) = args.inputs {
        if values.len() != num_inputs {
            bail!("model declares {num_inputs} input variables, got {}", values.len());
        }
        for (var_idx, value) in values.into_iter().enumerate() {
            registry.set_value(model, child, var_idx, value)?;
        }
        match registry.get_output_value(model, child)? {
            Some(value) => println!("{value}"),
            None => println!("no output (no active output set)"),
        }
        return Ok(());
    }

    repl(&registry, model, child, num_inputs)
}

fn repl(
    registry: &ModelRegistry,
    model: fuzzkit::ModelHandle,
    child: fuzzkit::SessionHandle,
    num_inputs: usize,
) -> anyhow::Result<()> {
    println!("FuzzKit Inference REPL");
    println!("======================\n");
    print_model_summary(registry, model)?;
    println!("\nCommands:");
    println!("  set <var> <value> - Set an input variable");
    println!("  eval              - Evaluate and print the output");
    println!("  show              - Show the loaded model");
    println!("  help              - Show this help");
    println!("  quit              - Exit\n");

    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            return Ok(()); // EOF
        }
        let input = input.trim();
        if input.is_empty() {
            continue;
        }

        let words: Vec<&str> = input.split_whitespace().collect();
        match words[0] {
            "quit" | "exit" | "q" => return Ok(()),
            "help" => {
                println!("  set <var> <value> | eval | show | quit");
            }
            "show" => print_model_summary(registry, model)?,
            "set" => {
                if words.len() != 3 {
                    println!("usage: set <var index 0..{}> <value>", num_inputs - 1);
                    continue;
                }
                let parsed = (words[1].parse::<usize>(), words[2].parse::<f64>());
                match parsed {
                    (Ok(var_idx), Ok(value)) => {
                        if let Err(err) = registry.set_value(model, child, var_idx, value) {
                            println!("error: {err}");
                        }
                    }
                    _ => println!("usage: set <var index> <numeric value>"),
                }
            }
            "eval" => match registry.get_output_value(model, child)? {
                Some(value) => println!("output: {value}"),
                None => println!("no output (no active output set)"),
            },
            other => println!("unknown command '{other}' (try 'help')"),
        }
    }
}

fn print_model_summary(
    registry: &ModelRegistry,
    model: fuzzkit::ModelHandle,
) -> anyhow::Result<()> {
    registry.with_model(model, |m| {
        for var in m.inputs() {
            let terms: Vec<&str> = var.sets().iter().map(fuzzkit::set::FuzzySet::id).collect();
            println!(
                "  input {} '{}' in [{}, {}]: {}",
                var.index(),
                var.id(),
                var.map().left_x(),
                var.map().right_x(),
                terms.join(", ")
            );
        }
        if let Some(out) = m.output() {
            let terms: Vec<&str> = out.sets().iter().map(fuzzkit::set::FuzzySet::id).collect();
            println!(
                "  output '{}' in [{}, {}]: {}",
                out.id(),
                out.map().left_x(),
                out.map().right_x(),
                terms.join(", ")
            );
        }
        println!(
            "  {} rule cells ({} defined)",
            m.rules().len(),
            m.rules().cells().iter().flatten().count()
        );
    })?;
    Ok(())
}
