//! mirror-sync binary entry point.

use mirrorsync::cli;
use mirrorsync::ui::output;

fn main() {
    let code = match cli::run() {
        Ok(()) => 0,
        Err(err) => {
            output::error(format!("{:#}", err));
            cli::exit_code(&err)
        }
    };
    std::process::exit(code);
}
