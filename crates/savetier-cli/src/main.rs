//! Thin entrypoint for the `savetier` binary.

#[tokio::main]
async fn main() {
    let code = savetier_cli::run().await;
    std::process::exit(code);
}
