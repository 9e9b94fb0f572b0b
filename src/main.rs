fn main() {
    std::process::exit(freightline::cli::run());
}
