// src/services/notification.rs

//! Envio de e-mails para o RH.
//!
//! As requisições nunca esperam o envio: elas colocam a mensagem numa fila
//! limitada e um único worker em background entrega. Falhas de entrega são
//! logadas e descartadas, sem retry automático.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use thiserror::Error;
use tokio::{sync::mpsc, task::JoinHandle};

use crate::config::EmailProvider;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("falha HTTP ao falar com o provedor: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{provider} recusou a mensagem ({status}): {body}")]
    Rejected {
        provider: &'static str,
        status: u16,
        body: String,
    },
}

/// Capacidade de envio usada pelo núcleo.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_notification(
        &self,
        recipients: &[String],
        subject: &str,
        body: &str,
    ) -> Result<(), NotifyError>;

    fn provider_name(&self) -> &'static str;
}

// ---
// Provedores
// ---

/// Só escreve no log. Padrão em desenvolvimento.
pub struct ConsoleNotifier;

#[async_trait]
impl Notifier for ConsoleNotifier {
    async fn send_notification(
        &self,
        recipients: &[String],
        subject: &str,
        body: &str,
    ) -> Result<(), NotifyError> {
        tracing::info!(to = ?recipients, subject, "📧 E-mail (console)\n{body}");
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        "console"
    }
}

pub struct ResendNotifier {
    client: reqwest::Client,
    api_key: String,
    from: String,
}

#[async_trait]
impl Notifier for ResendNotifier {
    async fn send_notification(
        &self,
        recipients: &[String],
        subject: &str,
        body: &str,
    ) -> Result<(), NotifyError> {
        let response = self
            .client
            .post("https://api.resend.com/emails")
            .bearer_auth(&self.api_key)
            .json(&json!({
                "from": self.from,
                "to": recipients,
                "subject": subject,
                "text": body,
            }))
            .send()
            .await?;

        check_status(self.provider_name(), response).await
    }

    fn provider_name(&self) -> &'static str {
        "resend"
    }
}

pub struct SendGridNotifier {
    client: reqwest::Client,
    api_key: String,
    from: String,
}

#[async_trait]
impl Notifier for SendGridNotifier {
    async fn send_notification(
        &self,
        recipients: &[String],
        subject: &str,
        body: &str,
    ) -> Result<(), NotifyError> {
        let to: Vec<_> = recipients.iter().map(|email| json!({ "email": email })).collect();

        let response = self
            .client
            .post("https://api.sendgrid.com/v3/mail/send")
            .bearer_auth(&self.api_key)
            .json(&json!({
                "personalizations": [{ "to": to }],
                "from": { "email": self.from },
                "subject": subject,
                "content": [{ "type": "text/plain", "value": body }],
            }))
            .send()
            .await?;

        check_status(self.provider_name(), response).await
    }

    fn provider_name(&self) -> &'static str {
        "sendgrid"
    }
}

pub struct MailgunNotifier {
    client: reqwest::Client,
    api_key: String,
    domain: String,
    from: String,
}

#[async_trait]
impl Notifier for MailgunNotifier {
    async fn send_notification(
        &self,
        recipients: &[String],
        subject: &str,
        body: &str,
    ) -> Result<(), NotifyError> {
        let mut form: Vec<(&str, &str)> = vec![("from", self.from.as_str()), ("subject", subject), ("text", body)];
        form.extend(recipients.iter().map(|r| ("to", r.as_str())));

        let response = self
            .client
            .post(format!("https://api.mailgun.net/v3/{}/messages", self.domain))
            .basic_auth("api", Some(&self.api_key))
            .form(&form)
            .send()
            .await?;

        check_status(self.provider_name(), response).await
    }

    fn provider_name(&self) -> &'static str {
        "mailgun"
    }
}

async fn check_status(provider: &'static str, response: reqwest::Response) -> Result<(), NotifyError> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }
    let body = response.text().await.unwrap_or_default();
    Err(NotifyError::Rejected { provider, status: status.as_u16(), body })
}

/// Monta o provedor escolhido na configuração.
pub fn build_notifier(provider: &EmailProvider, from: &str) -> anyhow::Result<Arc<dyn Notifier>> {
    let client = || {
        reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
    };

    let notifier: Arc<dyn Notifier> = match provider {
        EmailProvider::Console => Arc::new(ConsoleNotifier),
        EmailProvider::Resend { api_key } => Arc::new(ResendNotifier {
            client: client()?,
            api_key: api_key.clone(),
            from: from.to_string(),
        }),
        EmailProvider::SendGrid { api_key } => Arc::new(SendGridNotifier {
            client: client()?,
            api_key: api_key.clone(),
            from: from.to_string(),
        }),
        EmailProvider::Mailgun { api_key, domain } => Arc::new(MailgunNotifier {
            client: client()?,
            api_key: api_key.clone(),
            domain: domain.clone(),
            from: from.to_string(),
        }),
    };

    Ok(notifier)
}

// ---
// Fila + worker
// ---

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub recipients: Vec<String>,
    pub subject: String,
    pub body: String,
}

#[derive(Clone)]
pub struct NotificationQueue {
    sender: mpsc::Sender<Notification>,
}

impl NotificationQueue {
    /// Cria a fila e sobe o worker que a consome.
    pub fn start(notifier: Arc<dyn Notifier>, capacity: usize) -> (Self, JoinHandle<()>) {
        let (sender, receiver) = mpsc::channel(capacity);
        let worker = tokio::spawn(run_worker(receiver, notifier));
        (Self { sender }, worker)
    }

    /// Nunca bloqueia e nunca falha para quem chama. Devolve se a mensagem
    /// entrou na fila.
    pub fn enqueue(&self, notification: Notification) -> bool {
        if notification.recipients.is_empty() {
            tracing::debug!(subject = %notification.subject, "Sem destinatários, notificação ignorada");
            return false;
        }

        match self.sender.try_send(notification) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(n)) => {
                tracing::warn!(subject = %n.subject, "Fila de notificações cheia, mensagem descartada");
                false
            }
            Err(mpsc::error::TrySendError::Closed(n)) => {
                tracing::error!(subject = %n.subject, "Worker de notificações parado, mensagem descartada");
                false
            }
        }
    }

    #[cfg(test)]
    pub fn detached(capacity: usize) -> (Self, mpsc::Receiver<Notification>) {
        let (sender, receiver) = mpsc::channel(capacity);
        (Self { sender }, receiver)
    }
}

async fn run_worker(mut receiver: mpsc::Receiver<Notification>, notifier: Arc<dyn Notifier>) {
    tracing::info!(provider = notifier.provider_name(), "Worker de notificações iniciado");

    while let Some(notification) = receiver.recv().await {
        let result = notifier
            .send_notification(&notification.recipients, &notification.subject, &notification.body)
            .await;

        match result {
            Ok(()) => tracing::info!(
                provider = notifier.provider_name(),
                recipients = notification.recipients.len(),
                subject = %notification.subject,
                "E-mail enviado"
            ),
            Err(e) => tracing::error!(
                provider = notifier.provider_name(),
                recipients = notification.recipients.len(),
                subject = %notification.subject,
                error = %e,
                "Falha ao enviar e-mail"
            ),
        }
    }

    tracing::info!("Worker de notificações encerrado");
}

#[cfg(test)]
pub mod testing {
    use std::sync::Mutex;

    use super::*;

    /// Guarda tudo o que seria enviado.
    #[derive(Default)]
    pub struct RecordingNotifier {
        pub sent: Mutex<Vec<Notification>>,
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn send_notification(
            &self,
            recipients: &[String],
            subject: &str,
            body: &str,
        ) -> Result<(), NotifyError> {
            self.sent.lock().unwrap().push(Notification {
                recipients: recipients.to_vec(),
                subject: subject.to_string(),
                body: body.to_string(),
            });
            Ok(())
        }

        fn provider_name(&self) -> &'static str {
            "recording"
        }
    }

    pub struct FailingNotifier;

    #[async_trait]
    impl Notifier for FailingNotifier {
        async fn send_notification(&self, _: &[String], _: &str, _: &str) -> Result<(), NotifyError> {
            Err(NotifyError::Rejected { provider: "failing", status: 500, body: "boom".into() })
        }

        fn provider_name(&self) -> &'static str {
            "failing"
        }
    }
}
