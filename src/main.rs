//! Compiler entry point.

fn main() {
    if let Err(error) = dyva::cli::run_cli() {
        eprintln!("error: {}", error);
        std::process::exit(1);
    }
}
