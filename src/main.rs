fn main() {
    if let Err(err) = attack_path_viz::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
