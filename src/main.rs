use merge_arena::run_demo_with_config;

#[tokio::main]
async fn main() {
    if let Err(error) = run_demo_with_config().await {
        tracing::error!(%error, "demo failed");
        std::process::exit(1);
    }
}
