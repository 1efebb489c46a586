//! Sign-up and login screens

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::warn;

use super::ViewModelScope;
use crate::api::StoryApi;
use crate::models::SessionRecord;
use crate::outcome::Outcome;
use crate::repository::{Repository, UNKNOWN_ERROR};

struct SignupState {
    is_loading: watch::Sender<bool>,
    signup_result: watch::Sender<Option<String>>,
    error_message: watch::Sender<Option<String>>,
}

/// State behind the sign-up form
pub struct SignupViewModel<A> {
    repository: Arc<Repository<A>>,
    state: Arc<SignupState>,
    scope: ViewModelScope,
}

impl<A: StoryApi> SignupViewModel<A> {
    pub fn new(repository: Arc<Repository<A>>) -> Self {
        Self {
            repository,
            state: Arc::new(SignupState {
                is_loading: watch::Sender::new(false),
                signup_result: watch::Sender::new(None),
                error_message: watch::Sender::new(None),
            }),
            scope: ViewModelScope::new(),
        }
    }

    pub fn is_loading(&self) -> watch::Receiver<bool> {
        self.state.is_loading.subscribe()
    }

    /// The service's confirmation once an account was created
    pub fn signup_result(&self) -> watch::Receiver<Option<String>> {
        self.state.signup_result.subscribe()
    }

    pub fn error_message(&self) -> watch::Receiver<Option<String>> {
        self.state.error_message.subscribe()
    }

    pub fn register(&self, name: &str, email: &str, password: &str) -> JoinHandle<()> {
        let repository = Arc::clone(&self.repository);
        let state = Arc::clone(&self.state);
        let (name, email, password) = (name.to_string(), email.to_string(), password.to_string());

        self.scope.launch(async move {
            state.is_loading.send_replace(true);
            match repository.register(&name, &email, &password).await {
                Outcome::Success(message) => {
                    state.error_message.send_replace(None);
                    state.signup_result.send_replace(Some(message));
                }
                Outcome::Error(message) => {
                    state.error_message.send_replace(Some(message));
                }
                Outcome::Loading => {}
            }
            state.is_loading.send_replace(false);
        })
    }
}

struct LoginState {
    is_loading: watch::Sender<bool>,
    login_result: watch::Sender<Option<SessionRecord>>,
    error_message: watch::Sender<Option<String>>,
}

/// State behind the login form
///
/// A successful login is persisted as the current session before it is
/// published.
pub struct LoginViewModel<A> {
    repository: Arc<Repository<A>>,
    state: Arc<LoginState>,
    scope: ViewModelScope,
}

impl<A: StoryApi> LoginViewModel<A> {
    pub fn new(repository: Arc<Repository<A>>) -> Self {
        Self {
            repository,
            state: Arc::new(LoginState {
                is_loading: watch::Sender::new(false),
                login_result: watch::Sender::new(None),
                error_message: watch::Sender::new(None),
            }),
            scope: ViewModelScope::new(),
        }
    }

    pub fn is_loading(&self) -> watch::Receiver<bool> {
        self.state.is_loading.subscribe()
    }

    /// The saved session after a successful login
    pub fn login_result(&self) -> watch::Receiver<Option<SessionRecord>> {
        self.state.login_result.subscribe()
    }

    pub fn error_message(&self) -> watch::Receiver<Option<String>> {
        self.state.error_message.subscribe()
    }

    pub fn login(&self, email: &str, password: &str) -> JoinHandle<()> {
        let repository = Arc::clone(&self.repository);
        let state = Arc::clone(&self.state);
        let (email, password) = (email.to_string(), password.to_string());

        self.scope.launch(async move {
            state.is_loading.send_replace(true);
            match repository.login(&email, &password).await {
                Outcome::Success(response) => match response.login_result {
                    Some(result) => {
                        let session = SessionRecord::logged_in(email, result.token);
                        match repository.save_session(session.clone()) {
                            Ok(()) => {
                                state.error_message.send_replace(None);
                                state.login_result.send_replace(Some(session));
                            }
                            Err(e) => {
                                warn!("Failed to save session: {}", e);
                                state.error_message.send_replace(Some(e.to_string()));
                            }
                        }
                    }
                    None => {
                        state
                            .error_message
                            .send_replace(Some(UNKNOWN_ERROR.to_string()));
                    }
                },
                Outcome::Error(message) => {
                    state.error_message.send_replace(Some(message));
                }
                Outcome::Loading => {}
            }
            state.is_loading.send_replace(false);
        })
    }
}
