use diesel::prelude::*;
use diesel::{Connection, PgConnection};
use once_cell::sync::Lazy;
use secrecy::{ExposeSecret, Secret};
use uuid::Uuid;
use voicemail_ai::authentication::compute_password_hash;
use voicemail_ai::configuration::{get_configuration, Settings};
use voicemail_ai::models::NewUser;
use voicemail_ai::startup::{Application, ExternalClients};
use voicemail_ai::stripe::sign_payload;
use voicemail_ai::telemetry::{get_subscriber, init_subscriber};

static TRACING: Lazy<()> = Lazy::new(|| {
    let default_filter_level = "info".into();
    let subscriber_name = "test".into();
    if std::env::var("TEST_LOG").is_ok() {
        let subscriber = get_subscriber(subscriber_name, default_filter_level, std::io::stdout);
        init_subscriber(subscriber);
    } else {
        let subscriber = get_subscriber(subscriber_name, default_filter_level, std::io::sink);
        init_subscriber(subscriber);
    }
});

pub const WEBHOOK_SECRET: &str = "whsec_test_secret";

pub struct TestUser {
    pub user_id: Uuid,
    pub email: String,
    pub password: String,
}

impl TestUser {
    fn generate() -> Self {
        Self {
            user_id: Uuid::new_v4(),
            email: format!("{}@example.com", Uuid::new_v4()),
            password: Uuid::new_v4().to_string(),
        }
    }

    fn store(&self, conn: &mut PgConnection) {
        use voicemail_ai::schema::users;
        let password_hash = compute_password_hash(Secret::new(self.password.clone())).unwrap();
        diesel::insert_into(users::table)
            .values(NewUser {
                user_id: &self.user_id,
                email: &self.email,
                password_hash: password_hash.expose_secret(),
            })
            .execute(conn)
            .expect("Failed to store the test user.");
    }
}

pub struct TestApp {
    pub address: String,
    pub db_connection: PgConnection,
    pub stripe_server: mockito::ServerGuard,
    pub gemini_server: mockito::ServerGuard,
    pub test_user: TestUser,
    pub api_client: reqwest::Client,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    pub fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.api_client.get(self.url(path))
    }

    pub fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.api_client.post(self.url(path))
    }

    pub fn put(&self, path: &str) -> reqwest::RequestBuilder {
        self.api_client.put(self.url(path))
    }

    pub fn delete(&self, path: &str) -> reqwest::RequestBuilder {
        self.api_client.delete(self.url(path))
    }

    /// Same request, with the test user's Basic credentials.
    pub fn authenticated(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request.basic_auth(&self.test_user.email, Some(&self.test_user.password))
    }

    pub async fn post_agenda_event(&self, body: &serde_json::Value) -> reqwest::Response {
        self.post("/api/agenda-events")
            .json(body)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn post_webhook(&self, payload: &str) -> reqwest::Response {
        let signature = sign_payload(
            payload,
            &Secret::new(WEBHOOK_SECRET.to_string()),
            chrono::Utc::now().timestamp(),
        );
        self.post("/api/webhook/stripe")
            .header("Stripe-Signature", signature)
            .body(payload.to_string())
            .send()
            .await
            .expect("Failed to execute request.")
    }
}

pub async fn spawn_app() -> TestApp {
    Lazy::force(&TRACING);

    let stripe_server = mockito::Server::new_async().await;
    let gemini_server = mockito::Server::new_async().await;

    let configuration = {
        let mut c = get_configuration().expect("Failed to read configuration.");
        c.application.port = None;
        c.application.enable_dev_endpoints = true;
        c.database.database_name = Uuid::new_v4().to_string();
        c.stripe.api_base_url = stripe_server.url();
        c.stripe.webhook_secret = Secret::new(WEBHOOK_SECRET.to_string());
        c.gemini.api_base_url = gemini_server.url();
        c.gemini.api_key = Secret::new("gemini-test-key".to_string());
        c
    };

    create_database(&configuration);

    let clients =
        ExternalClients::from_settings(&configuration).expect("Failed to build the API clients.");
    let app = Application::build(&configuration, clients)
        .await
        .expect("Failed to build the application.");
    let _ = tokio::spawn(app.server.launch());
    let port = app.port.get().await.expect("The server did not report its port.");

    // Migrations ran when the server ignited.
    let mut db_connection = connect_to_database(&configuration);
    let test_user = TestUser::generate();
    test_user.store(&mut db_connection);

    TestApp {
        address: format!("http://127.0.0.1:{}", port),
        db_connection,
        stripe_server,
        gemini_server,
        test_user,
        api_client: reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .unwrap(),
    }
}

fn create_database(configuration: &Settings) {
    let mut connection = PgConnection::establish(
        configuration
            .database
            .connection_string_without_database()
            .expose_secret(),
    )
    .expect("Failed to connect to Postgres.");

    diesel::sql_query(format!(
        "CREATE DATABASE \"{}\"",
        configuration.database.database_name
    ))
    .execute(&mut connection)
    .expect("Failed to create the test database.");
}

fn connect_to_database(configuration: &Settings) -> PgConnection {
    PgConnection::establish(configuration.database.connection_string().expose_secret())
        .expect("Failed to connect to Postgres.")
}
