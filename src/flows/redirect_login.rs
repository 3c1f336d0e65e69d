//! Redirect Login
//!
//! Drives the login redirect: issues a CSRF-protected authorization URL and,
//! on callback, validates the state and exchanges the code.

use constant_time_eq::constant_time_eq;
use serde_json::Value;
use std::sync::{Arc, Mutex};
use tracing::{debug, instrument, warn};

use crate::core::{remove_params, Params, PersistentDataStore, RandomStringGenerator};
use crate::error::{CsrfFailure, SdkResult, ValidationError};
use crate::flows::OAuth2Flow;
use crate::telemetry::redact_url;
use crate::types::{AccessToken, CallbackParams};

/// Length of the generated CSRF state.
pub const CSRF_LENGTH: usize = 32;

/// Persistence key holding the CSRF state.
pub const STATE_KEY: &str = "state";

const CALLBACK_ARTIFACTS: &[&str] = &["code", "state", "enforce_https"];

/// Redirect login helper.
pub struct RedirectLoginHelper {
    oauth2: Arc<dyn OAuth2Flow>,
    persistence: Arc<dyn PersistentDataStore>,
    random: Arc<dyn RandomStringGenerator>,
    separator: String,
    last_callback: Mutex<Option<CallbackParams>>,
}

impl RedirectLoginHelper {
    pub fn new(
        oauth2: Arc<dyn OAuth2Flow>,
        persistence: Arc<dyn PersistentDataStore>,
        random: Arc<dyn RandomStringGenerator>,
    ) -> Self {
        Self {
            oauth2,
            persistence,
            random,
            separator: "&".to_string(),
            last_callback: Mutex::new(None),
        }
    }

    /// Separator between query arguments of issued URLs.
    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    pub fn persistence(&self) -> &Arc<dyn PersistentDataStore> {
        &self.persistence
    }

    /// Authorization URL carrying a persisted CSRF state.
    ///
    /// A state already persisted is reused.
    #[instrument(
        skip(self, redirect_url, extra_params),
        fields(redirect_url = %redact_url(redirect_url))
    )]
    pub fn login_url(
        &self,
        redirect_url: &str,
        scopes: &[&str],
        extra_params: &Params,
    ) -> SdkResult<String> {
        let state = match self.persistence.get(STATE_KEY) {
            Some(state) if !state.is_empty() => state,
            _ => self.random.generate(CSRF_LENGTH)?,
        };
        self.persistence.set(STATE_KEY, Some(state.clone()));

        Ok(self
            .oauth2
            .authorization_url(redirect_url, &state, scopes, extra_params, &self.separator))
    }

    /// Login URL asking again for declined permissions.
    pub fn re_request_url(&self, redirect_url: &str, scopes: &[&str]) -> SdkResult<String> {
        self.login_url(redirect_url, scopes, &auth_type("rerequest"))
    }

    /// Login URL forcing the user to re-enter their credentials.
    pub fn re_authentication_url(&self, redirect_url: &str, scopes: &[&str]) -> SdkResult<String> {
        self.login_url(redirect_url, scopes, &auth_type("reauthenticate"))
    }

    /// Complete the login from the callback.
    ///
    /// Returns `Ok(None)` when the callback carries no `code`. The redirect URL
    /// must match the one the login URL was issued for; when `None`, the URL
    /// the callback arrived on is used.
    #[instrument(
        skip(self, callback, redirect_url),
        fields(redirect_url = ?redirect_url.map(redact_url))
    )]
    pub async fn complete_login(
        &self,
        callback: &CallbackParams,
        redirect_url: Option<&str>,
    ) -> SdkResult<Option<AccessToken>> {
        *self.last_callback.lock().unwrap() = Some(callback.clone());

        let code = match callback.code.as_deref() {
            Some(code) => code,
            None => {
                debug!("callback carries no code");
                return Ok(None);
            }
        };

        self.validate_csrf(callback)?;
        self.persistence.set(STATE_KEY, None);

        let redirect_url = redirect_url
            .or(callback.url.as_deref())
            .ok_or(ValidationError::MissingRedirectUrl)?;
        let redirect_url = remove_params(redirect_url, CALLBACK_ARTIFACTS);

        let token = self
            .oauth2
            .access_token_from_code(code, &redirect_url)
            .await?;
        Ok(Some(token))
    }

    fn validate_csrf(&self, callback: &CallbackParams) -> SdkResult<()> {
        let given = callback
            .state
            .as_deref()
            .ok_or(ValidationError::CsrfMismatch {
                reason: CsrfFailure::MissingCallbackState,
            })?;

        let saved = self
            .persistence
            .get(STATE_KEY)
            .filter(|state| !state.is_empty())
            .ok_or(ValidationError::CsrfMismatch {
                reason: CsrfFailure::MissingPersistedState,
            })?;

        if !constant_time_eq(given.as_bytes(), saved.as_bytes()) {
            warn!("callback state does not match persisted state");
            return Err(ValidationError::CsrfMismatch {
                reason: CsrfFailure::StateMismatch,
            }
            .into());
        }
        Ok(())
    }

    fn callback_field(&self, field: fn(&CallbackParams) -> &Option<String>) -> Option<String> {
        self.last_callback
            .lock()
            .unwrap()
            .as_ref()
            .and_then(|callback| field(callback).clone())
    }

    /// `error` from the last callback.
    pub fn error(&self) -> Option<String> {
        self.callback_field(|c| &c.error)
    }

    pub fn error_code(&self) -> Option<String> {
        self.callback_field(|c| &c.error_code)
    }

    pub fn error_reason(&self) -> Option<String> {
        self.callback_field(|c| &c.error_reason)
    }

    pub fn error_description(&self) -> Option<String> {
        self.callback_field(|c| &c.error_description)
    }
}

fn auth_type(value: &str) -> Params {
    let mut params = Params::new();
    params.insert("auth_type".to_string(), Value::from(value));
    params
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{params_as_map, InMemoryPersistentDataStore, MockRandomStringGenerator};
    use crate::error::SdkError;
    use crate::flows::MockOAuth2Flow;
    use std::io;
    use tracing_subscriber::fmt::format::FmtSpan;

    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl CapturedLogs {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn capture_logs() -> (CapturedLogs, tracing::subscriber::DefaultGuard) {
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_max_level(tracing::Level::TRACE)
            .with_span_events(FmtSpan::NEW)
            .with_ansi(false)
            .finish();
        let guard = tracing::subscriber::set_default(subscriber);
        (logs, guard)
    }

    struct Fixture {
        helper: RedirectLoginHelper,
        flow: Arc<MockOAuth2Flow>,
        store: Arc<InMemoryPersistentDataStore>,
        random: Arc<MockRandomStringGenerator>,
    }

    fn fixture() -> Fixture {
        let flow = Arc::new(MockOAuth2Flow::new());
        let store = Arc::new(InMemoryPersistentDataStore::new());
        let random = Arc::new(MockRandomStringGenerator::new());
        let helper = RedirectLoginHelper::new(flow.clone(), store.clone(), random.clone());
        Fixture {
            helper,
            flow,
            store,
            random,
        }
    }

    #[test]
    fn test_login_url_persists_state() {
        let f = fixture();
        f.random.set_next_value("0123456789abcdef0123456789abcdef");

        let url = f
            .helper
            .login_url("https://app/cb", &["read"], &Params::new())
            .unwrap();

        assert_eq!(
            f.store.get(STATE_KEY).as_deref(),
            Some("0123456789abcdef0123456789abcdef")
        );
        assert_eq!(
            params_as_map(&url)["state"],
            "0123456789abcdef0123456789abcdef"
        );
        assert_eq!(f.random.get_generate_history(), vec![CSRF_LENGTH]);
    }

    #[test]
    fn test_login_url_reuses_persisted_state() {
        let f = fixture();
        f.store.set(STATE_KEY, Some("existing".to_string()));

        let url = f
            .helper
            .login_url("https://app/cb", &[], &Params::new())
            .unwrap();

        assert_eq!(params_as_map(&url)["state"], "existing");
        assert!(f.random.get_generate_history().is_empty());
    }

    #[test]
    fn test_re_request_and_re_authentication_urls() {
        let f = fixture();
        let url = f.helper.re_request_url("https://app/cb", &["email"]).unwrap();
        assert_eq!(params_as_map(&url)["auth_type"], "rerequest");

        let url = f
            .helper
            .re_authentication_url("https://app/cb", &["email"])
            .unwrap();
        assert_eq!(params_as_map(&url)["auth_type"], "reauthenticate");
    }

    #[tokio::test]
    async fn test_complete_login_without_code() {
        let f = fixture();
        let callback = CallbackParams::from_url("https://app/cb?state=abc");

        let result = f.helper.complete_login(&callback, None).await.unwrap();
        assert!(result.is_none());
        assert!(f.flow.get_code_exchange_history().is_empty());
    }

    #[tokio::test]
    async fn test_complete_login_success() {
        let f = fixture();
        f.store.set(STATE_KEY, Some("abc".to_string()));
        f.flow.set_next_access_token(AccessToken::new("T", None));

        let callback =
            CallbackParams::from_url("https://app/cb?code=foo&state=abc&enforce_https=1&page=2");
        let token = f.helper.complete_login(&callback, None).await.unwrap();

        assert_eq!(token.unwrap().value(), "T");
        assert_eq!(f.store.get(STATE_KEY), None);
        assert_eq!(
            f.flow.get_code_exchange_history(),
            vec![("foo".to_string(), "https://app/cb?page=2".to_string())]
        );
    }

    #[tokio::test]
    async fn test_complete_login_explicit_redirect_url() {
        let f = fixture();
        f.store.set(STATE_KEY, Some("abc".to_string()));

        let callback = CallbackParams::from_url("https://proxy/cb?code=foo&state=abc");
        f.helper
            .complete_login(&callback, Some("https://app/cb?code=foo&state=abc"))
            .await
            .unwrap();

        assert_eq!(f.flow.get_code_exchange_history()[0].1, "https://app/cb");
    }

    #[tokio::test]
    async fn test_complete_login_missing_persisted_state() {
        let f = fixture();
        let callback = CallbackParams::from_url("https://app/cb?code=foo&state=abc");

        let result = f.helper.complete_login(&callback, None).await;
        assert!(matches!(
            result,
            Err(SdkError::Validation(ValidationError::CsrfMismatch {
                reason: CsrfFailure::MissingPersistedState
            }))
        ));
        assert!(f.flow.get_code_exchange_history().is_empty());
    }

    #[tokio::test]
    async fn test_complete_login_state_mismatch() {
        let f = fixture();
        f.store.set(STATE_KEY, Some("abc".to_string()));
        let callback = CallbackParams::from_url("https://app/cb?code=foo&state=xyz");

        let result = f.helper.complete_login(&callback, None).await;
        assert!(matches!(
            result,
            Err(SdkError::Validation(ValidationError::CsrfMismatch {
                reason: CsrfFailure::StateMismatch
            }))
        ));
        assert_eq!(f.store.get(STATE_KEY).as_deref(), Some("abc"));
    }

    #[tokio::test]
    async fn test_complete_login_missing_callback_state() {
        let f = fixture();
        f.store.set(STATE_KEY, Some("abc".to_string()));
        let callback = CallbackParams::from_url("https://app/cb?code=foo");

        let result = f.helper.complete_login(&callback, None).await;
        assert!(matches!(
            result,
            Err(SdkError::Validation(ValidationError::CsrfMismatch {
                reason: CsrfFailure::MissingCallbackState
            }))
        ));
    }

    #[tokio::test]
    async fn test_complete_login_missing_redirect_url() {
        let f = fixture();
        f.store.set(STATE_KEY, Some("abc".to_string()));
        let callback = CallbackParams {
            code: Some("foo".to_string()),
            state: Some("abc".to_string()),
            ..Default::default()
        };

        let result = f.helper.complete_login(&callback, None).await;
        assert!(matches!(
            result,
            Err(SdkError::Validation(ValidationError::MissingRedirectUrl))
        ));
    }

    #[tokio::test]
    async fn test_spans_do_not_record_code() {
        let f = fixture();
        f.store.set(STATE_KEY, Some("foo_state".to_string()));
        f.flow.set_next_access_token(AccessToken::new("foo_token", None));
        let (logs, _guard) = capture_logs();

        f.helper
            .login_url("https://app/cb?code=SECRETCODE&page=2", &["read"], &Params::new())
            .unwrap();
        let callback = CallbackParams::from_url("https://app/cb?code=SECRETCODE&state=foo_state");
        f.helper
            .complete_login(&callback, Some("https://app/cb?code=SECRETCODE&state=foo_state"))
            .await
            .unwrap();

        let output = logs.contents();
        assert!(output.contains("login_url"));
        assert!(output.contains("complete_login"));
        assert!(output.contains("[REDACTED]"));
        assert!(!output.contains("SECRETCODE"));
    }

    #[tokio::test]
    async fn test_error_accessors() {
        let f = fixture();
        assert_eq!(f.helper.error(), None);

        let callback = CallbackParams::from_url(
            "https://app/cb?error=access_denied&error_code=200&error_reason=user_denied&error_description=Permissions+error",
        );
        assert!(f.helper.complete_login(&callback, None).await.unwrap().is_none());

        assert_eq!(f.helper.error().as_deref(), Some("access_denied"));
        assert_eq!(f.helper.error_code().as_deref(), Some("200"));
        assert_eq!(f.helper.error_reason().as_deref(), Some("user_denied"));
        assert_eq!(
            f.helper.error_description().as_deref(),
            Some("Permissions error")
        );
    }
}
