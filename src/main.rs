//! compose – command-line photo print composer.
//!
//! Usage:
//!   compose <photo>... [--layout a5|two4x6] [--out DIR] [--config FILE]
//!           [--copies N] [--fit-to-page]
//!   compose --plan [--layout ID]
//!
//! Every input becomes one job. Outcomes are printed to stdout as JSON, one
//! document per job; inputs that fall back still print their original path.

use std::{env, path::PathBuf, process};

use print_compose::pipeline::{Pipeline, PrintJob};
use print_compose::{compute_plan, LayoutId, PipelineConfig};
use rayon::prelude::*;

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();

    let mut inputs: Vec<PathBuf> = Vec::new();
    let mut layout: Option<String> = None;
    let mut out_dir: Option<PathBuf> = None;
    let mut config_path: Option<PathBuf> = None;
    let mut copies: u32 = 1;
    let mut fit_to_page = false;
    let mut plan_only = false;

    let mut iter = args.iter().skip(1).peekable();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--layout" | "-l" => layout = Some(value_for(arg, iter.next(), &args[0])),
            "--out" | "-o" => out_dir = Some(PathBuf::from(value_for(arg, iter.next(), &args[0]))),
            "--config" | "-c" => {
                config_path = Some(PathBuf::from(value_for(arg, iter.next(), &args[0])))
            }
            "--copies" => {
                let v = value_for(arg, iter.next(), &args[0]);
                copies = match v.parse() {
                    Ok(n) if n > 0 => n,
                    _ => {
                        eprintln!("Error: --copies expects a positive integer, got '{v}'");
                        process::exit(1);
                    }
                };
            }
            "--fit-to-page" => fit_to_page = true,
            "--plan" => plan_only = true,
            "--help" | "-h" => {
                print_usage(&args[0]);
                process::exit(0);
            }
            other if other.starts_with('-') => {
                eprintln!("Unknown flag: {other}");
                print_usage(&args[0]);
                process::exit(1);
            }
            path => inputs.push(PathBuf::from(path)),
        }
    }

    let layout_id = LayoutId::parse_or_default(layout.as_deref());

    if plan_only {
        match compute_plan(layout_id) {
            Ok(plan) => {
                println!("{}", plan.to_json());
                return;
            }
            Err(e) => {
                eprintln!("Error computing plan: {e}");
                process::exit(1);
            }
        }
    }

    if inputs.is_empty() {
        eprintln!("Error: no input photo specified.");
        print_usage(&args[0]);
        process::exit(1);
    }

    let mut config = match &config_path {
        Some(p) => match PipelineConfig::load(p) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Error loading config: {e}");
                process::exit(1);
            }
        },
        None => PipelineConfig::default(),
    };
    if let Some(dir) = out_dir {
        config.output_dir = dir;
    }

    let pipeline = match Pipeline::new(config) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Error initialising pipeline: {e}");
            process::exit(1);
        }
    };

    let jobs: Vec<PrintJob> = inputs
        .iter()
        .enumerate()
        .map(|(i, path)| {
            let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("job");
            let mut job = PrintJob::new(format!("{stem}-{i}"), path, layout_id);
            job.options.copies = copies;
            job.options.fit_to_page = fit_to_page;
            job
        })
        .collect();

    let results: Vec<_> = jobs.par_iter().map(|job| pipeline.process_one(job)).collect();

    let mut failed = 0usize;
    for (job, result) in jobs.iter().zip(results) {
        match result {
            Ok(outcome) => println!("{}", outcome.to_json()),
            Err(e) => {
                eprintln!("Error processing '{}': {e}", job.source.display());
                failed += 1;
            }
        }
    }

    if failed > 0 {
        eprintln!("{failed} of {} job{} failed", jobs.len(), if jobs.len() == 1 { "" } else { "s" });
        process::exit(1);
    }
}

fn value_for(flag: &str, value: Option<&String>, prog: &str) -> String {
    match value {
        Some(v) => v.clone(),
        None => {
            eprintln!("Error: {flag} requires a value");
            print_usage(prog);
            process::exit(1);
        }
    }
}

fn print_usage(prog: &str) {
    eprintln!("compose – photo print layout composer (print-compose)");
    eprintln!();
    eprintln!("Usage:");
    eprintln!("  {prog} <photo>... [--layout ID] [--out DIR] [--config FILE] [--copies N] [--fit-to-page]");
    eprintln!("  {prog} --plan [--layout ID]");
    eprintln!();
    eprintln!("Arguments:");
    eprintln!("  <photo>...         JPEG or PNG photos; each becomes one print job");
    eprintln!();
    eprintln!("Flags:");
    eprintln!("  --layout, -l ID    a5 (alias fullA5) or two4x6 (alias twoA6); default a5");
    eprintln!("  --out, -o DIR      Output directory (default: <tmp>/print-compose)");
    eprintln!("  --config, -c FILE  Pipeline config JSON");
    eprintln!("  --copies N         Copies forwarded to the spooler (default: 1)");
    eprintln!("  --fit-to-page      Forward fit-to-page to the spooler");
    eprintln!("  --plan             Print the composition plan for the layout and exit");
    eprintln!("  --help             Print this message");
}
