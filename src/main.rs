fn main() -> Result<(), Box<dyn std::error::Error>> {
    citychat::cli::main()
}
