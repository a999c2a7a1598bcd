mod demo;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("pinchzoom=info".parse().unwrap()),
        )
        .init();

    let code = match demo::parse_args(std::env::args().skip(1)).and_then(demo::run) {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("{:#}", e);
            1
        }
    };
    std::process::exit(code);
}
