fn main() {
    if let Err(err) = moodtunes_lib::run() {
        eprintln!("moodtunes: {:#}", err);
        std::process::exit(1);
    }
}
