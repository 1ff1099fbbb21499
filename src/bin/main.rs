fn main() {
    wrangle::cli::run();
}
