//! Email digests of scrape results.
//!
//! The notifier listens on the [`EventBus`]: completed runs with available
//! courts produce a digest, failed runs a failure notice. Scraping itself
//! never sends mail.

use std::fmt::{self, Write as _};
use std::sync::Arc;

use async_trait::async_trait;
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

use crate::config::EmailConfig;
use crate::domain::{CourtSession, DataSource, EventBus, PeakTimePolicy, ScrapeEvent};
use crate::error::CourtbookerError;

/// A rendered message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Digest {
    /// Subject line.
    pub subject: String,
    /// Plain-text body.
    pub plain: String,
    /// HTML body.
    pub html: String,
}

/// Renders available sessions, peak times first.
///
/// Each part is sorted by start time.
#[must_use]
pub fn compose_digest(sessions: &[CourtSession], policy: &PeakTimePolicy) -> Digest {
    let (mut peak, mut off_peak): (Vec<&CourtSession>, Vec<&CourtSession>) =
        sessions.iter().partition(|s| policy.is_peak_time(s.start_time));
    peak.sort_by_key(|s| s.start_time);
    off_peak.sort_by_key(|s| s.start_time);

    let mut plain = String::from("Available courts:\n");
    let mut html = String::from("<p>Available courts:</p>\n");
    for (title, part) in [("Peak", &peak), ("Off-peak", &off_peak)] {
        if part.is_empty() {
            continue;
        }
        let _ = writeln!(plain, "\n{title} ({}):", part.len());
        for session in part {
            let _ = writeln!(plain, "  - {session}\n    {}", session.url);
        }
        html.push_str(&session_table(title, part));
    }

    Digest {
        subject: format!("{} courts available", sessions.len()),
        plain,
        html,
    }
}

/// Renders a notice that a run for `data_source` failed.
#[must_use]
pub fn compose_failure(data_source: DataSource, error: &str) -> Digest {
    Digest {
        subject: format!("{data_source} scrape failed"),
        plain: format!("Scraping {data_source} failed:\n\n{error}\n"),
        html: format!(
            "<p>Scraping <b>{}</b> failed:</p>\n<pre>{}</pre>\n",
            escape_html(data_source.as_str()),
            escape_html(error)
        ),
    }
}

fn session_table(title: &str, sessions: &[&CourtSession]) -> String {
    let mut html = format!(
        "<h3>{}</h3>\n<table>\n<tr><th>Venue</th><th>Court</th><th>Date</th><th>Time</th>\
         <th>Cost</th><th>Link</th></tr>\n",
        escape_html(title)
    );
    for s in sessions {
        let _ = writeln!(
            html,
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}-{}</td><td>£{}</td>\
             <td><a href=\"{}\">Book</a></td></tr>",
            escape_html(s.venue_name()),
            escape_html(s.label.as_deref().unwrap_or("")),
            s.start_time.format("%a %d %b"),
            s.start_time.format("%H:%M"),
            s.end_time.format("%H:%M"),
            s.cost,
            escape_html(&s.url),
        );
    }
    html.push_str("</table>\n");
    html
}

/// Escapes text for use in HTML element content and quoted attributes.
#[must_use]
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Delivers digests.
#[async_trait]
pub trait Notifier: Send + Sync + fmt::Debug {
    /// Sends `digest` to the configured recipients.
    ///
    /// # Errors
    ///
    /// Returns [`CourtbookerError::Notification`] if delivery fails.
    async fn send(&self, digest: &Digest) -> Result<(), CourtbookerError>;
}

/// Sends digests through an SMTP relay using STARTTLS.
pub struct SmtpNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Vec<Mailbox>,
    subject_prefix: String,
}

impl fmt::Debug for SmtpNotifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmtpNotifier")
            .field("from", &self.from)
            .field("to", &self.to)
            .field("subject_prefix", &self.subject_prefix)
            .finish_non_exhaustive()
    }
}

fn mail_error(e: impl fmt::Display) -> CourtbookerError {
    CourtbookerError::Notification(e.to_string())
}

impl SmtpNotifier {
    /// Builds a notifier from email settings.
    ///
    /// # Errors
    ///
    /// Returns [`CourtbookerError::Notification`] if an address is invalid,
    /// there are no recipients, or the relay cannot be configured.
    pub fn new(config: &EmailConfig) -> Result<Self, CourtbookerError> {
        let from: Mailbox = config.sender.parse().map_err(mail_error)?;
        let to = config
            .receivers
            .iter()
            .map(|r| r.parse::<Mailbox>().map_err(mail_error))
            .collect::<Result<Vec<_>, _>>()?;
        if to.is_empty() {
            return Err(CourtbookerError::Notification("no receiver addresses".to_string()));
        }

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_server)
            .map_err(mail_error)?
            .port(config.smtp_port)
            .credentials(Credentials::new(config.sender.clone(), config.password.clone()))
            .build();

        Ok(Self {
            transport,
            from,
            to,
            subject_prefix: config.subject.clone(),
        })
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn send(&self, digest: &Digest) -> Result<(), CourtbookerError> {
        let mut builder = Message::builder()
            .from(self.from.clone())
            .subject(format!("{}: {}", self.subject_prefix, digest.subject));
        for to in &self.to {
            builder = builder.to(to.clone());
        }
        let message = builder
            .multipart(MultiPart::alternative_plain_html(
                digest.plain.clone(),
                digest.html.clone(),
            ))
            .map_err(mail_error)?;

        self.transport.send(message).await.map_err(mail_error)?;
        tracing::info!(subject = %digest.subject, recipients = self.to.len(), "email sent");
        Ok(())
    }
}

/// Writes digests to the log instead of sending them.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, digest: &Digest) -> Result<(), CourtbookerError> {
        tracing::info!(subject = %digest.subject, body = %digest.plain, "notification");
        Ok(())
    }
}

/// Turns a scrape event into the message it should produce, if any.
#[must_use]
pub fn digest_for(event: &ScrapeEvent, policy: &PeakTimePolicy) -> Option<Digest> {
    match event {
        ScrapeEvent::RunCompleted { sessions, .. } if !sessions.is_empty() => {
            Some(compose_digest(sessions, policy))
        }
        ScrapeEvent::RunFailed {
            data_source, error, ..
        } => Some(compose_failure(*data_source, error)),
        _ => None,
    }
}

/// Subscribes `notifier` to the bus and sends a message for every event
/// that warrants one. Runs until the bus is dropped.
pub fn spawn_notifier(
    event_bus: &EventBus,
    notifier: Arc<dyn Notifier>,
    policy: PeakTimePolicy,
) -> JoinHandle<()> {
    let mut events = event_bus.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => {
                    let Some(digest) = digest_for(&event, &policy) else {
                        continue;
                    };
                    if let Err(e) = notifier.send(&digest).await {
                        tracing::error!(
                            run_id = %event.run_id(),
                            error = %e,
                            "failed to send notification"
                        );
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "notifier lagged behind event bus");
                }
                Err(RecvError::Closed) => break,
            }
        }
        tracing::debug!("notifier stopped");
    })
}
