use rocket::fairing::Info;
use rocket::{Orbit, Rocket};
use std::sync::Mutex;
use tokio::sync::oneshot;

/// Pairs a liftoff fairing with a handle that resolves to the port Rocket actually bound.
/// Needed when the server is configured with port 0.
pub fn create_pair() -> (PortSaver, BoundPort) {
    let (tx, rx) = oneshot::channel();
    (PortSaver::new(tx), BoundPort { rx })
}

pub struct BoundPort {
    rx: oneshot::Receiver<u16>,
}

impl BoundPort {
    pub async fn get(self) -> Result<u16, anyhow::Error> {
        self.rx
            .await
            .map_err(|_| anyhow::anyhow!("The server shut down before reporting its port."))
    }
}

pub struct PortSaver {
    sender: Mutex<Option<oneshot::Sender<u16>>>,
}

impl PortSaver {
    fn new(sender: oneshot::Sender<u16>) -> PortSaver {
        PortSaver {
            sender: Mutex::new(Some(sender)),
        }
    }
}

#[rocket::async_trait]
impl rocket::fairing::Fairing for PortSaver {
    fn info(&self) -> Info {
        Info {
            name: "Port Saver",
            kind: rocket::fairing::Kind::Liftoff,
        }
    }

    async fn on_liftoff(&self, rocket: &Rocket<Orbit>) {
        let sender = match self.sender.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(sender) = sender {
            if sender.send(rocket.config().port).is_err() {
                tracing::debug!("Nobody is waiting for the bound port.");
            }
        }
    }
}
