//! Command-line interface for linelex
//! Runs a declarative grammar over line-oriented input and reports matched
//! tokens as JSON, one object per line.
//!
//! Usage:
//!   linelex run --grammar `<grammar>` [`<input>`]  - Lex an input file (or stdin)
//!   linelex check --grammar `<grammar>`           - Surface structural grammar errors

use clap::{Arg, Command};
use linelex::{GrammarFile, MatchEvent, Parser, TokenWalk};
use serde::Serialize;
use std::io::Read;

#[derive(Serialize)]
struct MatchedToken {
    token: String,
    line: usize,
    column: usize,
    text: String,
}

fn main() {
    let matches = Command::new("linelex")
        .version(env!("CARGO_PKG_VERSION"))
        .about("A table-driven line lexer for declarative grammars")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("run")
                .about("Run a grammar over input and print matched tokens as JSON")
                .arg(
                    Arg::new("grammar")
                        .long("grammar")
                        .short('g')
                        .help("Path to a YAML grammar file")
                        .required(true),
                )
                .arg(
                    Arg::new("input")
                        .help("Input file (defaults to stdin)")
                        .index(1),
                ),
        )
        .subcommand(
            Command::new("check")
                .about("Load a grammar and report structural errors")
                .arg(
                    Arg::new("grammar")
                        .long("grammar")
                        .short('g')
                        .help("Path to a YAML grammar file")
                        .required(true),
                ),
        )
        .get_matches();

    match matches.subcommand() {
        Some(("run", run_matches)) => {
            let grammar = run_matches.get_one::<String>("grammar").unwrap();
            let input = run_matches.get_one::<String>("input");
            handle_run_command(grammar, input.map(String::as_str));
        }
        Some(("check", check_matches)) => {
            let grammar = check_matches.get_one::<String>("grammar").unwrap();
            handle_check_command(grammar);
        }
        _ => unreachable!(),
    }
}

fn load_table(path: &str) -> linelex::TokenTable {
    let text = std::fs::read_to_string(path).unwrap_or_else(|e| {
        eprintln!("Error reading grammar: {}", e);
        std::process::exit(1);
    });
    let file = GrammarFile::from_yaml(&text).unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    });
    file.into_table().unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    })
}

/// Handle the run command
fn handle_run_command(grammar_path: &str, input_path: Option<&str>) {
    let table = load_table(grammar_path);

    let source = match input_path {
        Some(path) => std::fs::read_to_string(path).unwrap_or_else(|e| {
            eprintln!("Error reading input: {}", e);
            std::process::exit(1);
        }),
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf).unwrap_or_else(|e| {
                eprintln!("Error reading stdin: {}", e);
                std::process::exit(1);
            });
            buf
        }
    };

    let mut parser = Parser::new(&table);
    parser.observe(|event| {
        if let MatchEvent::Matched { name, lineno, pos, value } = event {
            let record = MatchedToken {
                token: name.to_string(),
                line: *lineno,
                column: pos + 1,
                text: value.text().to_string(),
            };
            match serde_json::to_string(&record) {
                Ok(json) => println!("{}", json),
                Err(e) => eprintln!("Error serializing token: {}", e),
            }
        }
    });

    if let Err(e) = parser.parse_lines([source]) {
        eprintln!("Lexing error: {}", e);
        std::process::exit(1);
    }
}

/// Handle the check command: expand the start symbol once so every
/// structural error in the reachable graph surfaces without input.
fn handle_check_command(grammar_path: &str) {
    let table = load_table(grammar_path);
    let mut walk = TokenWalk::new(table.begin());
    loop {
        match walk.next(&table) {
            None => break,
            Some(Ok(_)) => {}
            Some(Err(e)) => {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        }
    }
    println!("ok");
}
