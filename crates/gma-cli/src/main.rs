//! Binary entrypoint for the GMA console CLI.

#[tokio::main]
async fn main() {
    let exit_code = gma_cli::run().await;
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}
