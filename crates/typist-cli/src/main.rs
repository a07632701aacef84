fn main() {
    typist_cli::run_main();
}
