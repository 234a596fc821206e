use std::io;
use std::process::ExitCode;

use btree_index::cli;

//-------------------------------------------------------------------------

fn main() -> ExitCode {
    let args = std::env::args().skip(1);
    let mut stdout = io::stdout();
    let code = cli::run(args, &mut stdout);
    ExitCode::from(code as u8)
}

//-------------------------------------------------------------------------
