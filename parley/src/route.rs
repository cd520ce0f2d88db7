use std::fmt;

use crate::session::Auth;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Home,
    Login,
    Signup,
    NotFound,
}

impl Route {
    pub fn parse(path: &str) -> Self {
        match path.trim_end_matches('/') {
            "" => Self::Home,
            "/login" => Self::Login,
            "/signup" => Self::Signup,
            _ => Self::NotFound,
        }
    }

    /// Where a request for this route actually ends up.
    pub fn resolve(self, auth: &Auth) -> Self {
        match self {
            Self::Home if !auth.logged_in() => Self::Login,
            Self::Login | Self::Signup if auth.logged_in() => Self::Home,
            route => route,
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Home => write!(f, "/"),
            Self::Login => write!(f, "/login"),
            Self::Signup => write!(f, "/signup"),
            Self::NotFound => write!(f, "404"),
        }
    }
}
