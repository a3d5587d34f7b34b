fn main() {
    if let Err(err) = schemaforge::run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
