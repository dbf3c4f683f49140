fn main() {
    if let Err(e) = pet_triage::run() {
        tracing::error!("{e}");
        eprintln!("pet-triage: {e}");
        std::process::exit(1);
    }
}
