mod ai;
mod app;
mod message;
mod payment;
mod prompting;
mod types;

#[tokio::main]
async fn main() {
    app::run().await;
}
