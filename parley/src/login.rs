//! Login and signup forms.

use log::{debug, warn};

use crate::api::{self, AuthResponse, Backend};
use crate::session::{Auth, Credentials};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Login,
    Signup,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    /// Credentials were rejected or the server couldn't be reached. The form
    /// makes no distinction between the two.
    Invalid,
    UsernameTaken,
}

#[derive(Debug)]
pub struct Form {
    mode: Mode,
    pub username: String,
    pub password: String,
    failure: Option<Failure>,
}

impl Form {
    pub fn new(mode: Mode) -> Self {
        Self {
            mode,
            username: String::new(),
            password: String::new(),
            failure: None,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn failure(&self) -> Option<Failure> {
        self.failure
    }

    pub fn is_invalid(&self) -> bool {
        self.failure.is_some()
    }

    fn reset(&mut self) {
        self.username.clear();
        self.password.clear();
        self.failure = None;
    }

    /// Exchange the entered credentials for a token and log in with it.
    ///
    /// On failure, the form is marked invalid and any existing session is
    /// logged out. Returns whether the user is now logged in.
    pub async fn submit(&mut self, backend: &dyn Backend, auth: &mut Auth) -> bool {
        self.failure = None;

        let response = match self.mode {
            Mode::Login => backend.login(&self.username, &self.password).await,
            Mode::Signup => backend.signup(&self.username, &self.password).await,
        };
        let result = match response {
            Ok(response) => self.log_in(response, auth),
            Err(err) => Err(err.into()),
        };

        match result {
            Ok(()) => {
                debug!("logged in as {:?}", auth.username());
                self.reset();
                true
            }
            Err(err) => {
                warn!("{err}");
                self.failure = Some(match err {
                    SubmitError::Api(api::Error::Conflict) => Failure::UsernameTaken,
                    _ => Failure::Invalid,
                });
                if let Err(err) = auth.log_out() {
                    warn!("{err}");
                }
                false
            }
        }
    }

    fn log_in(&self, response: AuthResponse, auth: &mut Auth) -> Result<(), SubmitError> {
        let username = response.username.unwrap_or_else(|| self.username.clone());
        auth.log_in(Credentials {
            token: response.token,
            username: Some(username),
        })?;
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
enum SubmitError {
    #[error("authentication failed: {0}")]
    Api(#[from] api::Error),
    #[error("could not store session: {0}")]
    Session(#[from] crate::session::Error),
}
