use chord_dht::cli::commands::{Shell, DEFAULT_PORT};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let args: Vec<String> = std::env::args().collect();
    let mut port = DEFAULT_PORT;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--port" => {
                let Some(value) = args.get(i + 1) else {
                    eprintln!("--port requires a value");
                    std::process::exit(1);
                };
                port = match value.parse() {
                    Ok(port) => port,
                    Err(e) => {
                        eprintln!("bad port {value:?}: {e}");
                        std::process::exit(1);
                    }
                };
                i += 2;
            }
            other => {
                eprintln!("Usage: {} [--port <n>]", args[0]);
                eprintln!("unknown argument {other:?}");
                std::process::exit(1);
            }
        }
    }

    let mut shell = Shell::new(port);
    shell.run().await
}
