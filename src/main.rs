#[tokio::main]
async fn main() {
    if let Err(e) = jikjik_auth::run().await {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}
