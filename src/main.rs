use std::process::ExitCode;

fn main() -> ExitCode {
    match medoptix_lib::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("medoptix: {e}");
            ExitCode::FAILURE
        }
    }
}
