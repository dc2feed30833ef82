use std::process::ExitCode;

mod app;
mod logging;

fn main() -> ExitCode {
    let args = trashctl::cli::parse();
    app::run(args)
}
