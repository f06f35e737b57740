fn main() {
    if let Err(e) = botc_drv::main() {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
