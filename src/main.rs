fn main() -> std::process::ExitCode {
    deckgen::run()
}
