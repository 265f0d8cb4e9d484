use std::{error, fmt::Display, rc::Rc};

use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum AppError {
    #[error("JSON {0}")]
    Json(String),
    #[error("Server responded with status {0}")]
    Status(u16),
    #[error("System error {0}")]
    SystemError(#[from] SystemError),
    #[error("Can't add an empty task")]
    EmptyText,
    #[error("Item is not part of this list")]
    UnknownItem,
    #[error("Widget element is missing its data-widget-id attribute")]
    MissingWidgetId,
    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Transport errors aren't `Clone`, so they are kept behind an `Rc`.
#[derive(Clone, Debug)]
pub enum SystemError {
    Message(String),
    #[cfg(not(feature = "hydrate"))]
    ReqwestError(Rc<reqwest::Error>),
    #[cfg(feature = "hydrate")]
    GlooError(Rc<gloo_net::Error>),
}

impl From<serde_json::Error> for AppError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value.to_string())
    }
}

#[cfg(not(feature = "hydrate"))]
impl From<reqwest::Error> for SystemError {
    fn from(value: reqwest::Error) -> Self {
        Self::ReqwestError(Rc::new(value))
    }
}

#[cfg(not(feature = "hydrate"))]
impl From<reqwest::Error> for AppError {
    fn from(value: reqwest::Error) -> Self {
        if value.is_decode() {
            return Self::Json(value.to_string());
        }
        Self::SystemError(value.into())
    }
}

#[cfg(feature = "hydrate")]
impl From<gloo_net::Error> for SystemError {
    fn from(value: gloo_net::Error) -> Self {
        Self::GlooError(Rc::new(value))
    }
}

#[cfg(feature = "hydrate")]
impl From<gloo_net::Error> for AppError {
    fn from(value: gloo_net::Error) -> Self {
        match value {
            gloo_net::Error::SerdeError(e) => Self::Json(e.to_string()),
            other => Self::SystemError(other.into()),
        }
    }
}

impl Display for SystemError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SystemError::Message(message) => write!(f, "{}", message),
            #[cfg(not(feature = "hydrate"))]
            SystemError::ReqwestError(reqwest) => write!(f, "{}", reqwest),
            #[cfg(feature = "hydrate")]
            SystemError::GlooError(g) => write!(f, "{}", g),
        }
    }
}

impl error::Error for SystemError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            SystemError::Message(_) => None,
            #[cfg(not(feature = "hydrate"))]
            SystemError::ReqwestError(reqwest) => Some(reqwest.as_ref()),
            #[cfg(feature = "hydrate")]
            SystemError::GlooError(gloo) => Some(gloo.as_ref()),
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;
