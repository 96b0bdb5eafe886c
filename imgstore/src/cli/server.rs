pub async fn run() {
    server::run().await;
}
