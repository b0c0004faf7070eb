//! Blendforge CLI - demonstration command-line adapter
//!
//! Commands:
//!   optimize  - Read a CSV inventory + JSON request, print blend solutions

use blendforge::*;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

fn main() -> ExitCode {
    env_logger::init();
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage();
        return ExitCode::from(1);
    }

    match args[1].as_str() {
        "optimize" => cmd_optimize(&args[2..]),
        "version" | "--version" | "-v" => {
            println!("blendforge {}", VERSION);
            ExitCode::SUCCESS
        }
        "help" | "--help" | "-h" => {
            print_usage();
            ExitCode::SUCCESS
        }
        cmd => {
            eprintln!("Unknown command: {}", cmd);
            print_usage();
            ExitCode::from(1)
        }
    }
}

fn print_usage() {
    println!(
        r#"
Blendforge - blend optimization engine

USAGE:
    blendforge <COMMAND> [OPTIONS]

COMMANDS:
    optimize <inventory.csv> <request.json>   Compute blend solutions

OPTIONS:
    --output <file>   Output file for JSON solutions (default: stdout)

EXAMPLES:
    blendforge optimize inventory.csv request.json
    blendforge optimize inventory.csv request.json --output solutions.json
"#
    );
}

fn cmd_optimize(args: &[String]) -> ExitCode {
    if args.len() < 2 {
        eprintln!("Usage: blendforge optimize <inventory.csv> <request.json>");
        return ExitCode::from(2);
    }

    let inventory_path = &args[0];
    let request_path = &args[1];
    let output = parse_output_arg(args);

    let rows = match read_csv_rows(inventory_path) {
        Ok(rows) => rows,
        Err(e) => {
            eprintln!("Error reading inventory: {e}");
            return ExitCode::from(2);
        }
    };

    let request_content = match fs::read_to_string(request_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error reading request: {e}");
            return ExitCode::from(2);
        }
    };
    let req: BlendRequirement = match serde_json::from_str(&request_content) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Error parsing request: {e}");
            return ExitCode::from(2);
        }
    };

    let sink = LogSink;
    let (lots, row_errors) = load_lots(&rows, &ColumnAliasMap::default(), &sink);
    for err in &row_errors {
        eprintln!("row error: {err}");
    }

    let options = OptimizeOptions::default();
    match optimize(&req, &lots, &options) {
        Ok(solutions) => {
            let json = serde_json::to_string_pretty(&solutions).unwrap_or_default();
            if let Err(e) = write_output(&output, &json) {
                eprintln!("Error writing output: {e}");
                return ExitCode::from(1);
            }
            ExitCode::SUCCESS
        }
        Err(OptimizerError::InvalidRequest(msg)) => {
            eprintln!("Invalid request: {msg}");
            ExitCode::from(2)
        }
        Err(e @ OptimizerError::NoCandidates { .. }) => {
            eprintln!("No candidates: {e}");
            ExitCode::from(3)
        }
        Err(e @ OptimizerError::NoFeasibleBlend { .. }) => {
            eprintln!("No feasible blend: {e}");
            ExitCode::from(3)
        }
        Err(OptimizerError::Cancelled { partial }) => {
            eprintln!("Cancelled with {} partial solution(s)", partial.len());
            ExitCode::from(4)
        }
    }
}

fn read_csv_rows(path: &str) -> Result<Vec<RawRow>> {
    let mut reader = csv::Reader::from_path(path)?;
    let headers = reader.headers()?.clone();
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let mut row = RawRow::new();
        for (header, value) in headers.iter().zip(record.iter()) {
            row.insert(header, value);
        }
        rows.push(row);
    }
    Ok(rows)
}

fn parse_output_arg(args: &[String]) -> Option<PathBuf> {
    for (i, arg) in args.iter().enumerate() {
        if arg == "--output" || arg == "-o" {
            if let Some(path) = args.get(i + 1) {
                return Some(PathBuf::from(path));
            }
        }
    }
    None
}

fn write_output(path: &Option<PathBuf>, content: &str) -> Result<()> {
    match path {
        Some(p) => {
            fs::write(p, content)?;
            eprintln!("Written to: {}", p.display());
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}
