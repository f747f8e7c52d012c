fn main() -> anyhow::Result<()> {
    clientgen::cli::run_cli()
}
