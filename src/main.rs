use std::error::Error;

fn main() -> Result<(), Box<dyn Error>> {
    vastuchat::cli::main()
}
