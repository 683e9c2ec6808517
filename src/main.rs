//! pseudoc CLI - Pseudocode to Python translator

use std::env;
use std::fs;
use std::process::ExitCode;

use pseudoc::{errors::print_error, Translator};

fn main() -> ExitCode {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        println!("pseudoc - Pseudocode to Python translator");
        println!("Version {}", env!("CARGO_PKG_VERSION"));
        println!();
        println!("Usage: pseudoc <input.pseudo> [output.py]");
        println!();
        println!("Translates line-oriented pseudocode to Python. The result is");
        println!("written to the output path, or to stdout when none is given.");
        return ExitCode::FAILURE;
    }

    let input = &args[1];
    let output = args.get(2);

    let source = match fs::read_to_string(input) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("ERROR [converter]: cannot read '{}': {}", input, e);
            return ExitCode::FAILURE;
        }
    };

    let mut translator = Translator::new();
    let code = match translator.translate(&source) {
        Ok(code) => code,
        Err(e) => {
            print_error(&source, input, &e);
            eprintln!("ERROR [converter]: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match output {
        Some(path) => match fs::write(path, &code) {
            Ok(_) => {
                println!("Generated: {} ({} bytes)", path, code.len());
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("ERROR [converter]: cannot write '{}': {}", path, e);
                ExitCode::FAILURE
            }
        },
        None => {
            print!("{}", code);
            ExitCode::SUCCESS
        }
    }
}
