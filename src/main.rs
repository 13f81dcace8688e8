fn main() -> Result<(), Box<dyn std::error::Error>> {
    sonata::runtime::run()
}
