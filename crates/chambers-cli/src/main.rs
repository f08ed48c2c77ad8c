#![forbid(unsafe_code)]

fn main() -> std::process::ExitCode {
    chambers_cli::main_entry()
}
