//! Email notifier for coupon events.
//!
//! Renders the issued/redeemed templates and hands messages to the outbox.
//! In production the outbox is drained by the mail relay; here it is kept
//! in memory per recipient.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use coupon_core::config::NotificationConfig;
use coupon_core::ports::NotificationPort;
use coupon_core::{CouponError, CouponResult};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

const TEMPLATE_ISSUED: &str = "coupon_issued";
const TEMPLATE_REDEEMED: &str = "coupon_redeemed";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmailMessage {
    pub message_id: String,
    pub template: String,
    pub to: String,
    /// Sender in `Name <address>` form.
    pub from: String,
    pub subject: String,
    pub body: String,
    pub sent_at: DateTime<Utc>,
}

pub struct EmailNotifier {
    config: NotificationConfig,
    /// Sent messages keyed by recipient address. Lives for the process;
    /// the relay empties it through [`EmailNotifier::drain_for`] or
    /// [`EmailNotifier::drain_all`].
    outbox: DashMap<String, Vec<EmailMessage>>,
}

impl EmailNotifier {
    pub fn new(config: NotificationConfig) -> Self {
        info!(from = %config.from_email, "Email notifier initialized");
        Self {
            config,
            outbox: DashMap::new(),
        }
    }

    pub fn config(&self) -> &NotificationConfig {
        &self.config
    }

    pub fn sent_to(&self, email: &str) -> Vec<EmailMessage> {
        self.outbox
            .get(email)
            .map(|m| m.value().clone())
            .unwrap_or_default()
    }

    pub fn total_sent(&self) -> usize {
        self.outbox.iter().map(|m| m.value().len()).sum()
    }

    /// Take every queued message for one recipient.
    pub fn drain_for(&self, email: &str) -> Vec<EmailMessage> {
        self.outbox
            .remove(email)
            .map(|(_, messages)| messages)
            .unwrap_or_default()
    }

    /// Take every queued message, oldest first.
    pub fn drain_all(&self) -> Vec<EmailMessage> {
        let recipients: Vec<String> = self.outbox.iter().map(|m| m.key().clone()).collect();
        let mut drained: Vec<EmailMessage> = recipients
            .iter()
            .flat_map(|email| self.drain_for(email))
            .collect();
        drained.sort_by(|a, b| a.sent_at.cmp(&b.sent_at));
        drained
    }

    fn deliver(&self, template: &'static str, to: &str, subject: String, body: String) -> CouponResult<()> {
        if !is_deliverable(to) {
            return Err(CouponError::Notification(format!(
                "undeliverable address {to:?}"
            )));
        }

        let message = EmailMessage {
            message_id: format!("msg-{}", uuid::Uuid::new_v4()),
            template: template.to_string(),
            to: to.to_string(),
            from: format!("{} <{}>", self.config.from_name, self.config.from_email),
            subject,
            body,
            sent_at: Utc::now(),
        };

        debug!(
            to = %to,
            template,
            message_id = %message.message_id,
            "Queueing email"
        );
        metrics::counter!("notifications.emails_sent", "template" => template).increment(1);

        self.outbox.entry(to.to_string()).or_default().push(message);
        Ok(())
    }
}

fn is_deliverable(address: &str) -> bool {
    match address.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.'),
        None => false,
    }
}

#[async_trait]
impl NotificationPort for EmailNotifier {
    async fn send_coupon_issued(&self, email: &str, codes: &[String]) -> CouponResult<()> {
        self.deliver(
            TEMPLATE_ISSUED,
            email,
            "Your coupons have arrived!".to_string(),
            format!("Congratulations! Here are your coupons: {}", codes.join(", ")),
        )?;
        info!(to = %email, count = codes.len(), "Coupon issued email sent");
        Ok(())
    }

    async fn send_coupon_redeemed(&self, email: &str, code: &str) -> CouponResult<()> {
        self.deliver(
            TEMPLATE_REDEEMED,
            email,
            "Coupon redeemed".to_string(),
            format!("Your coupon {code} has been applied to your order."),
        )?;
        info!(to = %email, code = %code, "Coupon redeemed email sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn notifier() -> EmailNotifier {
        EmailNotifier::new(NotificationConfig::default())
    }

    #[tokio::test]
    async fn test_issued_email_lists_every_code() {
        let notifier = notifier();
        let codes = vec!["CPNAAAA1111".to_string(), "CPNBBBB2222".to_string()];
        notifier
            .send_coupon_issued("jane@example.com", &codes)
            .await
            .unwrap();

        let sent = notifier.sent_to("jane@example.com");
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].subject, "Your coupons have arrived!");
        assert_eq!(
            sent[0].body,
            "Congratulations! Here are your coupons: CPNAAAA1111, CPNBBBB2222"
        );
        assert_eq!(sent[0].from, "Coupon Express <coupons@example.com>");
        assert_eq!(sent[0].template, "coupon_issued");
    }

    #[tokio::test]
    async fn test_redeemed_email_names_code() {
        let notifier = notifier();
        notifier
            .send_coupon_redeemed("john@example.com", "CPNCCCC3333")
            .await
            .unwrap();

        let sent = notifier.sent_to("john@example.com");
        assert_eq!(sent[0].template, "coupon_redeemed");
        assert!(sent[0].body.contains("CPNCCCC3333"));
        assert_eq!(notifier.total_sent(), 1);
    }

    #[tokio::test]
    async fn test_drain_empties_outbox() {
        let notifier = notifier();
        notifier
            .send_coupon_redeemed("john@example.com", "CPN1")
            .await
            .unwrap();
        notifier
            .send_coupon_redeemed("john@example.com", "CPN2")
            .await
            .unwrap();
        notifier
            .send_coupon_issued("jane@example.com", &["CPN3".to_string()])
            .await
            .unwrap();

        let johns = notifier.drain_for("john@example.com");
        assert_eq!(johns.len(), 2);
        assert!(notifier.sent_to("john@example.com").is_empty());
        assert!(notifier.drain_for("john@example.com").is_empty());
        assert_eq!(notifier.total_sent(), 1);

        let rest = notifier.drain_all();
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].to, "jane@example.com");
        assert_eq!(notifier.total_sent(), 0);
    }

    #[tokio::test]
    async fn test_undeliverable_address_is_notification_error() {
        let notifier = notifier();
        for address in ["", "no-at-sign", "@example.com", "user@localhost"] {
            let err = notifier
                .send_coupon_redeemed(address, "CPN")
                .await
                .unwrap_err();
            assert!(matches!(err, CouponError::Notification(_)));
        }
        assert_eq!(notifier.total_sent(), 0);
    }
}
