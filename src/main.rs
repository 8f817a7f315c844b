use anyhow::Result;
use funny_voice_rs::{config, engine, event, net, session, stdin, transport, visualizer};

#[tokio::main]
async fn main() -> Result<()> {
    pretty_env_logger::init();

    let config = config::load_or_default().await;

    let bus = event::EventBus::new();
    event::debug(&bus);

    let engine = engine::init();
    let transport = transport::init(&bus);
    session::init(&bus, &config, engine.clone(), transport.clone()).await;

    let frames = visualizer::init(engine.clone(), transport.clone());
    stdin::init(&bus, frames);

    net::init(engine, config.net.listen_addr.clone());

    println!("funny-voice ready. Type \"help\" for commands.");

    tokio::signal::ctrl_c().await?;

    Ok(())
}
