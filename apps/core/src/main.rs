fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let options = match quickfind_core::runtime::parse_cli_args(&args) {
        Ok(options) => options,
        Err(error) => {
            eprintln!("[quickfind-core] {error}");
            std::process::exit(2);
        }
    };

    quickfind_core::runtime::run_with_options(options)
        .map_err(|error| anyhow::anyhow!("[quickfind-core] runtime failed: {error}"))
}
