use rowan_chess::uci;

fn main() {
    if let Err(err) = uci::run_stdio_loop() {
        eprintln!("fatal I/O error in UCI loop: {err}");
        std::process::exit(1);
    }
}
