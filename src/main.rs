fn main() {
    cspp::cli::run();
}
