use aws_sso_sync::cli;

fn main() {
    let code = cli::process_cli();
    if code != 0 {
        // Let the shell see the failure; nothing is left to drop by now.
        std::process::exit(code);
    }
}
