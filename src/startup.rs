use crate::agent::{GeminiClient, LanguageModel, RateLimiter};
use crate::catchers::*;
use crate::configuration::Settings;
use crate::offline::{OfflineCache, OfflinePolicy, StaticAssetCache, StaticDirFetcher};
use crate::port_saver;
use crate::port_saver::BoundPort;
use crate::routes::*;
use crate::stripe::{HttpStripeClient, StripeApi};
use anyhow::{anyhow, Context};
use diesel::PgConnection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use rocket::fairing::{self, AdHoc};
use rocket::{Build, Ignite, Rocket};
use rocket_sync_db_pools::database;
use secrecy::ExposeSecret;
use std::sync::Arc;
use std::time::Duration;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

#[database("voicemail")]
pub struct VoicemailDbConn(PgConnection);

/// Clients for the third parties we call. Swapped for fakes in tests.
pub struct ExternalClients {
    pub stripe: Arc<dyn StripeApi>,
    /// `None` when no Gemini key is configured; the chat route then answers 503.
    pub language_model: Option<Arc<dyn LanguageModel>>,
}

impl ExternalClients {
    pub fn from_settings(settings: &Settings) -> Result<ExternalClients, anyhow::Error> {
        let stripe = HttpStripeClient::new(
            settings.stripe.api_base_url.clone(),
            settings.stripe.secret_key.clone(),
            settings.stripe.timeout(),
        )?;
        let language_model: Option<Arc<dyn LanguageModel>> = if settings.gemini.is_configured() {
            Some(Arc::new(GeminiClient::new(
                settings.gemini.api_base_url.clone(),
                settings.gemini.model.clone(),
                settings.gemini.api_key.clone(),
                settings.gemini.timeout(),
            )?))
        } else {
            tracing::warn!("No Gemini API key configured, the assistant is disabled");
            None
        };
        Ok(ExternalClients {
            stripe: Arc::new(stripe),
            language_model,
        })
    }
}

pub struct Application {
    pub server: Rocket<Ignite>,
    pub port: BoundPort,
}

impl Application {
    pub async fn build(
        settings: &Settings,
        clients: ExternalClients,
    ) -> Result<Application, anyhow::Error> {
        let (port_saver, port) = port_saver::create_pair();

        let figment = rocket::Config::figment()
            .merge(("address", settings.application.host))
            .merge(("port", settings.application.port.unwrap_or(0)))
            .merge((
                "databases.voicemail.url",
                settings.database.connection_string().expose_secret().clone(),
            ));

        let policy = OfflinePolicy::new(
            &settings.application.base_url,
            &settings.offline.allowed_origins,
        )
        .context("Invalid offline cache policy.")?;
        let static_cache: StaticAssetCache = OfflineCache::new(
            policy,
            StaticDirFetcher::new(settings.offline.static_dir.clone()),
            settings.offline.cache_version.clone(),
        );

        let mut rocket = rocket::custom(figment)
            .attach(port_saver)
            .attach(VoicemailDbConn::fairing())
            .attach(AdHoc::try_on_ignite("Database migrations", run_migrations))
            .manage(clients.stripe)
            .manage(clients.language_model)
            .manage(RateLimiter::new(
                settings.agent.rate_limit_requests,
                Duration::from_secs(settings.agent.rate_limit_window_seconds),
            ))
            .manage(static_cache)
            .manage(StripeWebhookConfig {
                secret: settings.stripe.webhook_secret.clone(),
                tolerance_seconds: settings.stripe.webhook_tolerance_seconds,
            })
            .mount(
                "/",
                routes![
                    health,
                    service_worker,
                    offline_page,
                    web_manifest,
                    static_asset
                ],
            )
            .mount(
                "/api",
                routes![
                    list_agenda_events,
                    create_agenda_event,
                    update_agenda_event,
                    delete_agenda_event,
                    chat,
                    list_notifications,
                    post_notifications,
                    sync_subscriptions,
                    get_profile,
                    update_profile,
                    stripe_webhook_probe,
                    receive_stripe_webhook,
                    list_transcriptions,
                    get_transcription,
                    pwa_message
                ],
            )
            .register(
                "/",
                catchers![
                    unprocessable_entity_to_bad_request,
                    unauthorized_request_credentials,
                    json_default
                ],
            );

        if settings.application.enable_dev_endpoints {
            tracing::warn!("Development endpoints are enabled");
            rocket = rocket
                .manage(IntegrationStatus {
                    stripe: !settings.stripe.secret_key.expose_secret().is_empty(),
                    stripe_webhook: !settings.stripe.webhook_secret.expose_secret().is_empty(),
                    gemini: settings.gemini.is_configured(),
                })
                .mount("/api", routes![create_dev_user, seed_dev_data, dev_status]);
        }

        let server = rocket
            .ignite()
            .await
            .map_err(|e| anyhow!("Failed to ignite the server: {}", e))?;
        Ok(Application { server, port })
    }
}

async fn run_migrations(rocket: Rocket<Build>) -> fairing::Result {
    let conn = match VoicemailDbConn::get_one(&rocket).await {
        Some(conn) => conn,
        None => {
            tracing::error!("No database connection available to run migrations");
            return Err(rocket);
        }
    };
    let outcome = conn
        .run(|c: &mut PgConnection| {
            c.run_pending_migrations(MIGRATIONS)
                .map(|applied| applied.len())
                .map_err(|e| e.to_string())
        })
        .await;
    match outcome {
        Ok(applied) => {
            tracing::info!(applied, "Database migrations are up to date");
            Ok(rocket)
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to run database migrations");
            Err(rocket)
        }
    }
}
