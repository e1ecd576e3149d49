fn main() {
    pariksha::cli::run();
}
