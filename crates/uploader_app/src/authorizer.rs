use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::oneshot;
use uploader_engine::{ApiError, Authorizer, FailureKind};
use uploader_logging::{upl_info, upl_warn};
use url::Url;

const CONSENT_ENDPOINT: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const SCOPES: &str =
    "https://www.googleapis.com/auth/drive.readonly https://www.googleapis.com/auth/dfatrafficking";

/// Where a typed `code <value>` line is delivered while a consent prompt
/// is waiting.
#[derive(Clone, Default)]
pub struct CodeSlot {
    waiting: Arc<Mutex<Option<oneshot::Sender<String>>>>,
}

impl CodeSlot {
    fn arm(&self, tx: oneshot::Sender<String>) {
        *self.waiting.lock().unwrap_or_else(PoisonError::into_inner) = Some(tx);
    }

    fn disarm(&self) {
        self.waiting
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }

    pub fn is_waiting(&self) -> bool {
        self.waiting
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Returns false when nobody is waiting for a code.
    pub fn deliver(&self, code: String) -> bool {
        let pending = self
            .waiting
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        match pending {
            Some(tx) => tx.send(code).is_ok(),
            None => false,
        }
    }
}

/// Prints the Google consent URL and waits for the user to paste back the
/// code it shows.
pub struct ConsentAuthorizer {
    consent_url: Url,
    slot: CodeSlot,
    wait: Duration,
}

impl ConsentAuthorizer {
    pub fn new(client_id: &str, redirect_uri: &str, slot: CodeSlot) -> Result<Self, url::ParseError> {
        let consent_url = Url::parse_with_params(
            CONSENT_ENDPOINT,
            &[
                ("client_id", client_id),
                ("redirect_uri", redirect_uri),
                ("response_type", "code"),
                ("scope", SCOPES),
                ("access_type", "offline"),
                ("prompt", "consent"),
            ],
        )?;
        Ok(Self {
            consent_url,
            slot,
            wait: Duration::from_secs(300),
        })
    }

    pub fn with_wait(mut self, wait: Duration) -> Self {
        self.wait = wait;
        self
    }

    pub fn consent_url(&self) -> &Url {
        &self.consent_url
    }
}

#[async_trait::async_trait]
impl Authorizer for ConsentAuthorizer {
    async fn authorization_code(&self) -> Result<String, ApiError> {
        let (tx, rx) = oneshot::channel();
        self.slot.arm(tx);
        println!(
            "Grant access in your browser, then type `code <value>`:\n  {}",
            self.consent_url()
        );
        upl_info!("waiting for authorization code");

        match tokio::time::timeout(self.wait, rx).await {
            Ok(Ok(code)) if !code.trim().is_empty() => Ok(code.trim().to_string()),
            Ok(Ok(_)) => Err(ApiError::new(FailureKind::Unauthorized, "empty authorization code")),
            Ok(Err(_)) => Err(ApiError::new(
                FailureKind::Unauthorized,
                "authorization was abandoned",
            )),
            Err(_) => {
                upl_warn!("authorization code never arrived");
                self.slot.disarm();
                Err(ApiError::new(
                    FailureKind::Unauthorized,
                    "timed out waiting for the authorization code",
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn consent_url_carries_client_and_scopes() {
        let auth = ConsentAuthorizer::new("abc.apps", "urn:ietf:wg:oauth:2.0:oob", CodeSlot::default())
            .unwrap();
        let pairs: Vec<(String, String)> = auth
            .consent_url()
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert!(pairs.contains(&("client_id".to_string(), "abc.apps".to_string())));
        assert!(pairs.contains(&("scope".to_string(), SCOPES.to_string())));
        assert!(pairs.contains(&("access_type".to_string(), "offline".to_string())));
    }

    #[test]
    fn delivering_without_a_prompt_is_refused() {
        assert!(!CodeSlot::default().deliver("4/abc".to_string()));
    }

    #[tokio::test]
    async fn typed_code_completes_the_prompt() {
        let slot = CodeSlot::default();
        let auth = ConsentAuthorizer::new("abc", "urn:ietf:wg:oauth:2.0:oob", slot.clone()).unwrap();
        let waiter = tokio::spawn(async move { auth.authorization_code().await });

        while !slot.is_waiting() {
            tokio::task::yield_now().await;
        }
        assert!(slot.deliver(" 4/abc ".to_string()));
        assert_eq!(waiter.await.unwrap().unwrap(), "4/abc");
    }

    #[tokio::test(start_paused = true)]
    async fn prompt_times_out() {
        let slot = CodeSlot::default();
        let auth = ConsentAuthorizer::new("abc", "urn:ietf:wg:oauth:2.0:oob", slot.clone())
            .unwrap()
            .with_wait(Duration::from_secs(1));
        let err = auth.authorization_code().await.unwrap_err();
        assert_eq!(err.kind, FailureKind::Unauthorized);
        assert!(!slot.is_waiting());
    }
}
