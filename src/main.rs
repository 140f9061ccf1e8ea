use anyhow::{anyhow, Context};
use voicemail_ai::configuration::get_configuration;
use voicemail_ai::startup::{Application, ExternalClients};
use voicemail_ai::telemetry::{get_subscriber, init_subscriber};

#[rocket::main]
async fn main() -> anyhow::Result<()> {
    let subscriber = get_subscriber("voicemail-ai".into(), "info".into(), std::io::stdout);
    init_subscriber(subscriber);

    let configuration = get_configuration().context("Failed to read configuration.")?;
    let clients = ExternalClients::from_settings(&configuration)?;
    let application = Application::build(&configuration, clients).await?;
    application
        .server
        .launch()
        .await
        .map_err(|e| anyhow!("The server stopped unexpectedly: {}", e))?;
    Ok(())
}
