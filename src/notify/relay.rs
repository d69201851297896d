//! Mail delivery.
//!
//! Delivery happens on a spawned task: the caller gets a join handle and
//! never waits for the SMTP exchange. Failures are logged and not retried.

use std::{
    sync::{
        Arc,
        atomic::{AtomicU32, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport,
    AsyncTransport,
    Tokio1Executor,
    transport::smtp::{authentication::Credentials, extension::ClientId},
};
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{error, info};

use super::message::Message;
use crate::params::{Param, ParameterError, ParameterStore};

/// Delivery failures.
#[derive(Debug, Error)]
pub enum RelayError {
    /// The message could not be assembled.
    #[error("failed to build message: {0}")]
    Build(#[from] lettre::error::Error),
    /// The SMTP exchange failed or timed out.
    #[error("smtp delivery failed: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
    /// Mail settings are missing or malformed.
    #[error(transparent)]
    Settings(#[from] ParameterError),
}

/// Accepts composed messages for delivery.
#[async_trait]
pub trait MailRelay: Send + Sync {
    /// Deliver `message`; `token` correlates log lines for one delivery.
    async fn send(&self, message: Message, token: u32) -> Result<(), RelayError>;
}

/// SMTP settings read from the parameter registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailSettings {
    /// Relay host.
    pub host: String,
    /// Login, when authentication is used.
    pub user: Option<String>,
    /// Password for `user`.
    pub password: Option<String>,
    /// Relay port.
    pub port: u16,
    /// Negotiate STARTTLS.
    pub tls: bool,
    /// HELO domain.
    pub domain: Option<String>,
    /// Connect and command timeout.
    pub timeout: Duration,
}

impl MailSettings {
    /// Read the settings.
    ///
    /// # Errors
    /// Returns [`ParameterError`] when a required entry is missing or a
    /// number does not parse.
    pub async fn load(store: &dyn ParameterStore) -> Result<Self, ParameterError> {
        let raw_port = store.number(Param::SmtpPort).await?;
        let port = u16::try_from(raw_port).map_err(|_| ParameterError::Invalid {
            id: Param::SmtpPort.id(),
            value: raw_port.to_string(),
            expected: "a TCP port",
        })?;
        Ok(Self {
            host: store.required(Param::SmtpHost).await?.trim().to_owned(),
            user: store.optional(Param::SmtpUser).await?,
            password: store.optional(Param::SmtpPassword).await?,
            port,
            tls: store.flag(Param::SmtpTls).await?,
            domain: store.optional(Param::SmtpDomain).await?,
            timeout: Duration::from_millis(store.number(Param::SmtpTimeout).await?),
        })
    }

    fn transport(&self) -> Result<AsyncSmtpTransport<Tokio1Executor>, RelayError> {
        let mut builder = if self.tls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.host)?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&self.host)
        };
        builder = builder.port(self.port).timeout(Some(self.timeout));
        if let (Some(user), Some(password)) = (&self.user, &self.password) {
            builder = builder.credentials(Credentials::new(user.clone(), password.clone()));
        }
        if let Some(domain) = &self.domain {
            builder = builder.hello_name(ClientId::Domain(domain.clone()));
        }
        Ok(builder.build())
    }
}

/// Relay that speaks SMTP using settings read at send time.
#[derive(Clone)]
pub struct SmtpRelay {
    params: Arc<dyn ParameterStore>,
}

impl SmtpRelay {
    /// Build a relay reading settings from `params`.
    #[must_use]
    pub fn new(params: Arc<dyn ParameterStore>) -> Self { Self { params } }
}

#[async_trait]
impl MailRelay for SmtpRelay {
    async fn send(&self, message: Message, token: u32) -> Result<(), RelayError> {
        let settings = MailSettings::load(self.params.as_ref()).await?;
        let wire = message.to_lettre()?;
        settings.transport()?.send(wire).await?;
        info!(token, subject = %message.subject, "notification delivered");
        Ok(())
    }
}

/// Hands messages to a relay on background tasks.
#[derive(Clone)]
pub struct Mailer {
    relay: Arc<dyn MailRelay>,
    next_token: Arc<AtomicU32>,
}

impl Mailer {
    /// Wrap a relay.
    #[must_use]
    pub fn new(relay: Arc<dyn MailRelay>) -> Self {
        Self {
            relay,
            next_token: Arc::new(AtomicU32::new(1)),
        }
    }

    /// Start delivering `message` without waiting for it.
    pub fn dispatch(&self, message: Message) -> JoinHandle<()> {
        let relay = Arc::clone(&self.relay);
        let token = self.next_token.fetch_add(1, Ordering::Relaxed);
        tokio::spawn(async move {
            let subject = message.subject.clone();
            if let Err(err) = relay.send(message, token).await {
                error!(token, %subject, error = %err, "notification delivery failed");
            }
        })
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use self::recording::RecordingRelay;

#[cfg(any(test, feature = "test-support"))]
mod recording {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::{MailRelay, Message, RelayError};

    /// Relay that keeps messages in memory.
    #[derive(Debug, Default)]
    pub struct RecordingRelay {
        sent: Mutex<Vec<Message>>,
    }

    impl RecordingRelay {
        /// Messages delivered so far.
        #[must_use]
        pub fn messages(&self) -> Vec<Message> {
            self.sent.lock().map(|sent| sent.clone()).unwrap_or_default()
        }
    }

    #[async_trait]
    impl MailRelay for RecordingRelay {
        async fn send(&self, message: Message, _token: u32) -> Result<(), RelayError> {
            if let Ok(mut sent) = self.sent.lock() {
                sent.push(message);
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::params::MemoryParameterStore;

    #[rstest]
    #[tokio::test]
    async fn settings_come_from_parameters() {
        let store = MemoryParameterStore::with_defaults();
        store.set(Param::SmtpHost, " mail.example.org ");
        store.set(Param::SmtpUser, "desk");
        store.set(Param::SmtpPassword, "secret");
        let settings = MailSettings::load(&store).await.expect("settings");
        assert_eq!(settings.host, "mail.example.org");
        assert_eq!(settings.port, 587);
        assert!(settings.tls);
        assert_eq!(settings.timeout, Duration::from_millis(10_000));
        assert_eq!(settings.user.as_deref(), Some("desk"));
    }

    #[rstest]
    #[tokio::test]
    async fn oversized_port_is_rejected() {
        let store = MemoryParameterStore::with_defaults();
        store.set(Param::SmtpPort, "70000");
        assert!(matches!(
            MailSettings::load(&store).await,
            Err(ParameterError::Invalid { id: 4, .. })
        ));
    }

    #[rstest]
    #[tokio::test]
    async fn missing_host_is_a_configuration_error() {
        let store = MemoryParameterStore::with_defaults();
        store.remove(Param::SmtpHost);
        assert!(matches!(
            MailSettings::load(&store).await,
            Err(ParameterError::Missing(1))
        ));
    }
}
