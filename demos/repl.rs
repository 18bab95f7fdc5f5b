use minischeme::ast::{Procedure, Term};
use minischeme::scheme::ParseConfig;
use minischeme::{Error, Interpreter, InterpreterConfig};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::panic;
use std::process;

fn main() {
    init_tracing();

    let result = panic::catch_unwind(|| {
        run_repl();
    });

    if let Err(panic_info) = result {
        eprintln!("The REPL encountered an unexpected error and must exit.");

        if let Some(msg) = panic_info.downcast_ref::<&str>() {
            eprintln!("Error: {msg}");
        } else if let Some(msg) = panic_info.downcast_ref::<String>() {
            eprintln!("Error: {msg}");
        } else {
            eprintln!("Error: Unknown panic occurred");
        }

        process::exit(1);
    }
}

// Only log when RUST_LOG asks for it
fn init_tracing() {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    if std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::registry()
            .with(fmt::layer().with_target(true).with_level(true))
            .with(EnvFilter::from_default_env())
            .init();
    }
}

fn run_repl() {
    println!("minischeme: a small Scheme over shared, mutable pairs");
    println!("Enter expressions like: (define (square x) (* x x))");
    println!("Type :help for more commands, or Ctrl+C to exit.");
    println!();

    let mut rl = match DefaultEditor::new() {
        Ok(rl) => rl,
        Err(err) => {
            eprintln!("Could not initialize REPL: {err}");
            return;
        }
    };

    let config = InterpreterConfig {
        parse: ParseConfig {
            handle_comments: true,
            ..ParseConfig::default()
        },
        ..InterpreterConfig::default()
    };
    let interpreter = Interpreter::with_config(config);

    // Callable from user code as (help)
    interpreter.register_builtin("help", |_args| {
        print_help();
        Ok(Term::Null)
    });

    loop {
        match rl.readline("minischeme> ") {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                let _ = rl.add_history_entry(line);

                match line {
                    ":help" => {
                        print_help();
                        continue;
                    }
                    ":env" => {
                        print_environment(&interpreter);
                        continue;
                    }
                    ":quit" | ":exit" => {
                        println!("Goodbye!");
                        break;
                    }
                    _ => {}
                }

                match interpreter.eval_str(line).and_then(|value| render(&value)) {
                    Ok(output) => println!("{output}"),
                    Err(e) => println!("Error: {e}"),
                }
            }

            Err(ReadlineError::Eof | ReadlineError::Interrupted) => {
                println!("Goodbye!");
                break;
            }
            Err(err) => {
                println!("Error: {err:?}");
                break;
            }
        }
    }
}

/// Procedures have no written form, so the REPL shows a placeholder for them
fn render(value: &Term) -> Result<String, Error> {
    match value {
        Term::Procedure(procedure) => Ok(describe_procedure(procedure)),
        other => other.serialize(),
    }
}

fn describe_procedure(procedure: &Procedure) -> String {
    match procedure.name() {
        Some(name) => format!("<procedure {name}>"),
        None => "<procedure>".to_owned(),
    }
}

fn print_help() {
    println!("minischeme commands:");
    println!("  :help      - Show this help message");
    println!("  :env       - Show current environment bindings");
    println!("  :quit      - Exit the interpreter");
    println!("  :exit      - Exit the interpreter");
    println!("  Ctrl+C     - Exit the interpreter");
    println!();
    println!("Data: integers (42, -5), booleans (#t, #f), symbols, () and pairs");
    println!("Special forms: quote, if, define, set!, lambda, and, or, set-car!, set-cdr!");
    println!("Arithmetic: +, -, *, /, abs, max, min");
    println!("Comparison: =, <, >, <=, >=");
    println!("Predicates: number?, boolean?, symbol?, pair?, null?, list?, not");
    println!("Lists: cons, car, cdr, list, list-ref, list-tail");
    println!("Comments start with ';' and run to the end of the line.");
    println!();
    println!("Examples:");
    println!("  (define (fact n) (if (< n 2) 1 (* n (fact (- n 1)))))");
    println!("  (fact 10)");
    println!("  (define x (list 1 2 3))");
    println!("  (set-car! (cdr x) 20)");
    println!("  x");
    println!();
}

fn print_environment(interpreter: &Interpreter) {
    let bindings = interpreter.global_bindings();

    if bindings.is_empty() {
        println!("Environment is empty.");
        return;
    }

    println!("Environment bindings ({} total):", bindings.len());
    println!();

    let mut builtins = Vec::new();
    let mut user_defined = Vec::new();

    for (name, value) in bindings {
        match value {
            Term::Procedure(Procedure::Builtin(_)) => builtins.push(name),
            _ => user_defined.push((name, value)),
        }
    }

    if !builtins.is_empty() {
        println!("Built-in procedures ({}):", builtins.len());
        let mut col = 0;
        for name in builtins {
            print!("  {name:<15}");
            col += 1;
            if col % 4 == 0 {
                println!();
            }
        }
        if col % 4 != 0 {
            println!();
        }
        println!();
    }

    if !user_defined.is_empty() {
        println!("User-defined values ({}):", user_defined.len());
        for (name, value) in user_defined {
            match render(&value) {
                Ok(text) => println!("  {name} = {text}"),
                Err(e) => println!("  {name} = <{e}>"),
            }
        }
    }
}
