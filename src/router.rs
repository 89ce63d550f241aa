//! Router: broadcast, forward and direct-message delivery
//!
//! Consults the registry for recipients and submits formatted lines to
//! the outbound dispatcher. Runs inside the `ChatServer` actor, so a
//! routing pass always sees a stable registry.

use std::sync::Arc;

use tracing::warn;

use crate::capability::Translator;
use crate::color::RESET;
use crate::dispatch::DispatcherHandle;
use crate::error::AppError;
use crate::registry::UserRegistry;
use crate::session::Session;
use crate::types::SessionId;

pub struct Router {
    dispatcher: DispatcherHandle,
    translator: Option<Arc<dyn Translator>>,
}

impl Router {
    /// Create a router without translation support
    pub fn new(dispatcher: DispatcherHandle) -> Self {
        Self {
            dispatcher,
            translator: None,
        }
    }

    /// Create a router that can translate chat for opted-in recipients
    pub fn with_translator(dispatcher: DispatcherHandle, translator: Arc<dyn Translator>) -> Self {
        Self {
            dispatcher,
            translator: Some(translator),
        }
    }

    /// Send `***text***` to every registered session
    pub async fn broadcast_announcement(&self, registry: &UserRegistry, text: &str) {
        let line = format!("***{}***", text);
        for session in registry.all() {
            self.dispatcher.enqueue(session.id, line.clone()).await;
        }
    }

    /// Relay a chat line to every session except the sender
    pub async fn forward(&self, registry: &UserRegistry, sender_id: SessionId, text: &str) {
        let Some(sender) = registry.get(sender_id) else {
            return;
        };
        let (name, color) = (sender.name.clone(), sender.color);

        for recipient in registry.all() {
            if recipient.id == sender_id {
                continue;
            }
            let body = self.translate_for(&recipient, text).await;
            let line = format!("{}{}: {}{}", color, name, body, RESET);
            self.dispatcher.enqueue(recipient.id, line).await;
        }
    }

    /// Deliver a `/dm :name: text` command to exactly one recipient
    ///
    /// Errors are reported only to the caller; the room never sees a
    /// failed DM.
    pub async fn send_direct(
        &self,
        registry: &UserRegistry,
        sender_id: SessionId,
        raw: &str,
    ) -> Result<(), AppError> {
        let Some(sender) = registry.get(sender_id) else {
            return Ok(());
        };
        let (target, body) = parse_dm(raw)?;
        let recipient = registry
            .find(target)
            .ok_or_else(|| AppError::NoSuchRecipient(target.to_string()))?;

        let line = format!("**DM FROM {}: {}", sender.name, body);
        self.dispatcher.enqueue(recipient.id, line).await;
        Ok(())
    }

    /// Translate for recipients that asked for it, falling back to the
    /// original text on any failure
    async fn translate_for(&self, recipient: &Session, text: &str) -> String {
        let (Some(translator), Some(lang)) =
            (self.translator.as_ref(), recipient.translate_to.as_deref())
        else {
            return text.to_string();
        };
        match translator.translate(text, lang).await {
            Ok(translated) => translated,
            Err(e) => {
                warn!("Translation to '{}' failed: {}", lang, e);
                text.to_string()
            }
        }
    }
}

/// Split `/dm :name: message` into the target name and message body
fn parse_dm(raw: &str) -> Result<(&str, &str), AppError> {
    let rest = raw.strip_prefix("/dm").unwrap_or(raw).trim_start();
    let Some(rest) = rest.strip_prefix(':') else {
        return Err(AppError::MalformedCommand(
            "expected ':recipient:' after /dm".to_string(),
        ));
    };
    let Some(end) = rest.find(':') else {
        return Err(AppError::MalformedCommand(
            "unterminated ':recipient:' token".to_string(),
        ));
    };
    let target = &rest[..end];
    if target.is_empty() {
        return Err(AppError::MalformedCommand(
            "empty recipient name".to_string(),
        ));
    }
    Ok((target, rest[end + 1..].trim()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use async_trait::async_trait;
    use tokio::io::{AsyncBufReadExt, BufReader, DuplexStream, ReadHalf};

    use crate::dispatch::OutboundDispatcher;

    type TestReader = tokio::io::Lines<BufReader<ReadHalf<DuplexStream>>>;

    struct UppercaseTranslator;

    #[async_trait]
    impl Translator for UppercaseTranslator {
        async fn translate(&self, text: &str, target: &str) -> Result<String, AppError> {
            Ok(format!("[{}] {}", target, text.to_uppercase()))
        }
    }

    struct BrokenTranslator;

    #[async_trait]
    impl Translator for BrokenTranslator {
        async fn translate(&self, _: &str, _: &str) -> Result<String, AppError> {
            Err(AppError::ClassifierUnavailable)
        }
    }

    struct Harness {
        dispatcher: DispatcherHandle,
        registry: UserRegistry,
    }

    impl Harness {
        fn new() -> Self {
            let (dispatcher, worker) = OutboundDispatcher::new();
            tokio::spawn(worker.run());
            Self {
                dispatcher,
                registry: UserRegistry::new(),
            }
        }

        async fn join(&mut self, name: &str) -> (SessionId, TestReader) {
            let id = SessionId::new();
            let (client, server) = tokio::io::duplex(4096);
            let (_discard, writer) = tokio::io::split(server);
            self.dispatcher.attach(id, Box::new(writer)).await;
            self.registry
                .register(id, name.to_string())
                .expect("registration should succeed");
            let (reader, _) = tokio::io::split(client);
            (id, BufReader::new(reader).lines())
        }
    }

    async fn recv(lines: &mut TestReader) -> String {
        tokio::time::timeout(Duration::from_secs(5), lines.next_line())
            .await
            .expect("timed out waiting for line")
            .expect("stream error")
            .expect("stream closed")
    }

    #[test]
    fn test_parse_dm() {
        assert_eq!(parse_dm("/dm :bob: hello there").unwrap(), ("bob", "hello there"));
        assert_eq!(parse_dm("/dm :bob:").unwrap(), ("bob", ""));

        assert!(matches!(
            parse_dm("/dm bob hello"),
            Err(AppError::MalformedCommand(_))
        ));
        assert!(matches!(
            parse_dm("/dm :bob hello"),
            Err(AppError::MalformedCommand(_))
        ));
        assert!(matches!(
            parse_dm("/dm :: hello"),
            Err(AppError::MalformedCommand(_))
        ));
    }

    #[tokio::test]
    async fn test_broadcast_reaches_everyone() {
        let mut harness = Harness::new();
        let (_, mut alice) = harness.join("alice").await;
        let (_, mut bob) = harness.join("bob").await;

        let router = Router::new(harness.dispatcher.clone());
        router
            .broadcast_announcement(&harness.registry, "carol joined!")
            .await;

        assert_eq!(recv(&mut alice).await, "***carol joined!***");
        assert_eq!(recv(&mut bob).await, "***carol joined!***");
    }

    #[tokio::test]
    async fn test_forward_excludes_sender() {
        let mut harness = Harness::new();
        let (alice_id, mut alice) = harness.join("alice").await;
        let (_, mut bob) = harness.join("bob").await;
        let (_, mut carol) = harness.join("carol").await;

        let router = Router::new(harness.dispatcher.clone());
        router.forward(&harness.registry, alice_id, "hello").await;
        // A marker broadcast flushes each queue; the sender must see the
        // marker first, everyone else the chat line first.
        router.broadcast_announcement(&harness.registry, "marker").await;

        let color = harness.registry.find("alice").unwrap().color;
        let expected = format!("{}alice: hello{}", color, RESET);
        assert_eq!(recv(&mut bob).await, expected);
        assert_eq!(recv(&mut carol).await, expected);
        assert_eq!(recv(&mut alice).await, "***marker***");
    }

    #[tokio::test]
    async fn test_dm_reaches_only_the_recipient() {
        let mut harness = Harness::new();
        let (alice_id, mut alice) = harness.join("alice").await;
        let (_, mut bob) = harness.join("bob").await;
        let (_, mut carol) = harness.join("carol").await;

        let router = Router::new(harness.dispatcher.clone());
        router
            .send_direct(&harness.registry, alice_id, "/dm :bob: hello")
            .await
            .expect("dm should be delivered");
        router.broadcast_announcement(&harness.registry, "marker").await;

        assert_eq!(recv(&mut bob).await, "**DM FROM alice: hello");
        assert_eq!(recv(&mut bob).await, "***marker***");
        assert_eq!(recv(&mut alice).await, "***marker***");
        assert_eq!(recv(&mut carol).await, "***marker***");
    }

    #[tokio::test]
    async fn test_dm_to_unknown_recipient() {
        let mut harness = Harness::new();
        let (alice_id, _alice) = harness.join("alice").await;

        let router = Router::new(harness.dispatcher.clone());
        let result = router
            .send_direct(&harness.registry, alice_id, "/dm :bob: hello")
            .await;
        assert!(matches!(result, Err(AppError::NoSuchRecipient(name)) if name == "bob"));
    }

    #[tokio::test]
    async fn test_forward_translates_for_opted_in_recipient() {
        let mut harness = Harness::new();
        let (alice_id, _alice) = harness.join("alice").await;
        let (bob_id, mut bob) = harness.join("bob").await;
        harness.registry.set_translation(bob_id, Some("fr".to_string()));

        let router =
            Router::with_translator(harness.dispatcher.clone(), Arc::new(UppercaseTranslator));
        router.forward(&harness.registry, alice_id, "hello").await;

        let color = harness.registry.find("alice").unwrap().color;
        assert_eq!(
            recv(&mut bob).await,
            format!("{}alice: [fr] HELLO{}", color, RESET)
        );
    }

    #[tokio::test]
    async fn test_translation_failure_falls_back_to_original() {
        let mut harness = Harness::new();
        let (alice_id, _alice) = harness.join("alice").await;
        let (bob_id, mut bob) = harness.join("bob").await;
        harness.registry.set_translation(bob_id, Some("fr".to_string()));

        let router =
            Router::with_translator(harness.dispatcher.clone(), Arc::new(BrokenTranslator));
        router.forward(&harness.registry, alice_id, "hello").await;

        let color = harness.registry.find("alice").unwrap().color;
        assert_eq!(
            recv(&mut bob).await,
            format!("{}alice: hello{}", color, RESET)
        );
    }
}
