//! Preference persistence.
//!
//! Anonymous sessions write a composite JSON record into the local store.
//! Registered sessions hand saves to a [`PreferenceWriter`], a worker
//! thread that debounces and coalesces them before calling the remote
//! [`OptionsApi`]. Neither path reports failures to the caller.

use std::{
    collections::BTreeMap,
    sync::mpsc::{self, Receiver, RecvTimeoutError, Sender},
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use anyhow::{Context, Result};
use reqwest::header::CONTENT_TYPE;
use serde_json::{Map, Value};
use tracing::{debug, warn};
use url::Url;

use crate::store::LocalStore;

/// Remote "save option" call.
pub trait OptionsApi: Send + 'static {
    fn save_option(&self, name: &str, value: &str) -> Result<()>;
}

impl<F> OptionsApi for F
where
    F: Fn(&str, &str) -> Result<()> + Send + 'static,
{
    fn save_option(&self, name: &str, value: &str) -> Result<()> {
        self(name, value)
    }
}

/// Posts `{"name": .., "value": ..}` as JSON to a fixed endpoint.
pub struct HttpOptionsApi {
    endpoint: Url,
    client: reqwest::blocking::Client,
}

impl HttpOptionsApi {
    pub fn new(endpoint: &str) -> Result<Self> {
        let endpoint = Url::parse(endpoint)
            .with_context(|| format!("invalid options endpoint '{endpoint}'"))?;
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self { endpoint, client })
    }
}

impl OptionsApi for HttpOptionsApi {
    fn save_option(&self, name: &str, value: &str) -> Result<()> {
        let body = serde_json::json!({ "name": name, "value": value });
        self.client
            .post(self.endpoint.clone())
            .header(CONTENT_TYPE, "application/json")
            .body(body.to_string())
            .send()?
            .error_for_status()?;
        Ok(())
    }
}

enum WriterMessage {
    Save { name: String, value: String },
    Flush(Sender<()>),
}

/// Background writer for registered sessions.
///
/// Every save restarts the debounce window. When the window lapses, the
/// latest value of each pending name is written once.
pub struct PreferenceWriter {
    sender: Option<Sender<WriterMessage>>,
    join: Option<JoinHandle<()>>,
}

impl PreferenceWriter {
    pub fn spawn(api: impl OptionsApi, debounce: Duration) -> Self {
        let (tx, rx) = mpsc::channel();
        let join = thread::spawn(move || run_writer(api, rx, debounce));
        Self {
            sender: Some(tx),
            join: Some(join),
        }
    }

    pub fn send(&self, name: &str, value: &str) {
        let Some(sender) = &self.sender else {
            return;
        };
        let message = WriterMessage::Save {
            name: name.to_string(),
            value: value.to_string(),
        };
        if sender.send(message).is_err() {
            warn!(name, "preference writer is gone; dropping save");
        }
    }

    /// Writes everything pending now and waits until it is written.
    pub fn flush(&self) {
        let Some(sender) = &self.sender else {
            return;
        };
        let (ack_tx, ack_rx) = mpsc::channel();
        if sender.send(WriterMessage::Flush(ack_tx)).is_ok() {
            let _ = ack_rx.recv();
        }
    }
}

impl Drop for PreferenceWriter {
    fn drop(&mut self) {
        // Closing the channel makes the worker write what is pending and exit.
        self.sender.take();
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}

fn run_writer(api: impl OptionsApi, rx: Receiver<WriterMessage>, debounce: Duration) {
    let mut pending: BTreeMap<String, String> = BTreeMap::new();
    let mut deadline: Option<Instant> = None;
    loop {
        let message = match deadline {
            None => match rx.recv() {
                Ok(message) => Some(message),
                Err(_) => break,
            },
            Some(at) => match rx.recv_timeout(at.saturating_duration_since(Instant::now())) {
                Ok(message) => Some(message),
                Err(RecvTimeoutError::Timeout) => None,
                Err(RecvTimeoutError::Disconnected) => break,
            },
        };
        match message {
            Some(WriterMessage::Save { name, value }) => {
                pending.insert(name, value);
                deadline = Some(Instant::now() + debounce);
            }
            Some(WriterMessage::Flush(ack)) => {
                write_pending(&api, &mut pending);
                deadline = None;
                let _ = ack.send(());
            }
            None => {
                write_pending(&api, &mut pending);
                deadline = None;
            }
        }
    }
    write_pending(&api, &mut pending);
}

fn write_pending(api: &impl OptionsApi, pending: &mut BTreeMap<String, String>) {
    for (name, value) in std::mem::take(pending) {
        match api.save_option(&name, &value) {
            Ok(()) => debug!(%name, %value, "saved preference"),
            Err(error) => warn!(%error, %name, "failed to save preference"),
        }
    }
}

enum Backend {
    Local,
    Remote(PreferenceWriter),
}

/// Persists named feature states for the current session.
pub struct PreferenceStore {
    local: Box<dyn LocalStore>,
    local_key: String,
    backend: Backend,
}

impl PreferenceStore {
    /// Anonymous session: saves land in `local` under `local_key`.
    pub fn anonymous(local: Box<dyn LocalStore>, local_key: impl Into<String>) -> Self {
        Self {
            local,
            local_key: local_key.into(),
            backend: Backend::Local,
        }
    }

    /// Registered session: saves go through `writer`.
    pub fn registered(
        local: Box<dyn LocalStore>,
        local_key: impl Into<String>,
        writer: PreferenceWriter,
    ) -> Self {
        Self {
            local,
            local_key: local_key.into(),
            backend: Backend::Remote(writer),
        }
    }

    pub fn is_registered(&self) -> bool {
        matches!(self.backend, Backend::Remote(_))
    }

    /// Fire-and-forget save of the full current value.
    pub fn save(&mut self, name: &str, value: &str) {
        match &self.backend {
            Backend::Remote(writer) => writer.send(name, value),
            Backend::Local => self.save_local(name, value),
        }
    }

    fn save_local(&mut self, name: &str, value: &str) {
        let mut record = self.local_record();
        record.insert(name.to_string(), Value::String(value.to_string()));
        let json = Value::Object(record).to_string();
        if let Err(error) = self.local.set(&self.local_key, &json) {
            warn!(%error, name, "failed to store preference locally");
        }
    }

    /// The anonymous composite record. Missing or malformed data reads as empty.
    pub fn local_record(&self) -> Map<String, Value> {
        let Some(raw) = self.local.get(&self.local_key) else {
            return Map::new();
        };
        match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Object(map)) => map,
            Ok(_) | Err(_) => {
                warn!(key = %self.local_key, "ignoring malformed stored preferences");
                Map::new()
            }
        }
    }

    /// A value saved locally in this or an earlier anonymous session.
    pub fn stored(&self, name: &str) -> Option<String> {
        match self.local_record().get(name)? {
            Value::String(value) => Some(value.clone()),
            other => Some(other.to_string()),
        }
    }

    pub fn local(&self) -> &dyn LocalStore {
        self.local.as_ref()
    }

    pub fn local_mut(&mut self) -> &mut dyn LocalStore {
        self.local.as_mut()
    }

    /// Blocks until queued remote saves are written. No-op when anonymous.
    pub fn flush(&self) {
        if let Backend::Remote(writer) = &self.backend {
            writer.flush();
        }
    }
}
