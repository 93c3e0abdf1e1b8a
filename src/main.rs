fn main() -> sweepgen::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    sweepgen::cli::run()
}
