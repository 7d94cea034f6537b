use async_trait::async_trait;

use super::domain::{LoginInput, LoginResponse};
use super::errors::AuthError;

/// Remote authentication API consumed by the session store.
#[async_trait]
pub trait AuthApi: Send + Sync {
    /// Exchange credentials for an access token and user profile.
    async fn authenticate(&self, input: &LoginInput) -> Result<LoginResponse, AuthError>;
    /// Best-effort server-side logout.
    async fn invalidate_session(&self) -> Result<(), AuthError>;
}

/// Scripted in-memory API for tests and doc examples
pub mod mock {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    /// Replies are consumed in order; once a queue is empty `authenticate`
    /// fails with `Unauthorized` and `invalidate_session` succeeds.
    #[derive(Default)]
    pub struct MockAuthApi {
        logins: Mutex<VecDeque<Result<LoginResponse, AuthError>>>,
        logouts: Mutex<VecDeque<Result<(), AuthError>>>,
        delay: Mutex<Option<Duration>>,
        authenticate_calls: AtomicUsize,
        invalidate_calls: AtomicUsize,
        last_input: Mutex<Option<LoginInput>>,
    }

    impl MockAuthApi {
        pub fn push_login(&self, reply: Result<LoginResponse, AuthError>) -> &Self {
            self.logins.lock().unwrap().push_back(reply);
            self
        }

        pub fn push_logout(&self, reply: Result<(), AuthError>) -> &Self {
            self.logouts.lock().unwrap().push_back(reply);
            self
        }

        /// Suspend every call for `delay` before replying.
        pub fn set_delay(&self, delay: Duration) {
            *self.delay.lock().unwrap() = Some(delay);
        }

        pub fn authenticate_calls(&self) -> usize {
            self.authenticate_calls.load(Ordering::SeqCst)
        }

        pub fn invalidate_calls(&self) -> usize {
            self.invalidate_calls.load(Ordering::SeqCst)
        }

        pub fn last_input(&self) -> Option<LoginInput> {
            self.last_input.lock().unwrap().clone()
        }

        async fn pause(&self) {
            let delay = *self.delay.lock().unwrap();
            if let Some(d) = delay {
                tokio::time::sleep(d).await;
            }
        }
    }

    #[async_trait]
    impl AuthApi for MockAuthApi {
        async fn authenticate(&self, input: &LoginInput) -> Result<LoginResponse, AuthError> {
            self.authenticate_calls.fetch_add(1, Ordering::SeqCst);
            *self.last_input.lock().unwrap() = Some(input.clone());
            self.pause().await;
            let reply = self.logins.lock().unwrap().pop_front();
            reply.unwrap_or_else(|| Err(AuthError::Unauthorized("Invalid email or password".into())))
        }

        async fn invalidate_session(&self) -> Result<(), AuthError> {
            self.invalidate_calls.fetch_add(1, Ordering::SeqCst);
            self.pause().await;
            let reply = self.logouts.lock().unwrap().pop_front();
            reply.unwrap_or(Ok(()))
        }
    }
}
