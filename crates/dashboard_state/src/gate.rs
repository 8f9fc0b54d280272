//! Feed sources behind their configuration check.

use std::sync::Arc;

use common::Error;

/// A source that is usable, or the configuration failure that keeps it
/// offline. Built once at startup; coordinators consult it before every
/// request so a missing secret never turns into a network call.
#[derive(Debug)]
pub enum SourceGate<S> {
    Ready(Arc<S>),
    Blocked(String),
}

impl<S> SourceGate<S> {
    pub fn ready(source: S) -> Self {
        SourceGate::Ready(Arc::new(source))
    }

    /// Build the source from a required secret, or record why it cannot be.
    pub fn from_secret(secret: Result<&str, Error>, build: impl FnOnce(&str) -> S) -> Self {
        match secret {
            Ok(secret) => SourceGate::Ready(Arc::new(build(secret))),
            Err(Error::Config(reason)) => SourceGate::Blocked(reason),
            Err(e) => SourceGate::Blocked(e.to_string()),
        }
    }

    pub fn source(&self) -> Result<&Arc<S>, Error> {
        match self {
            SourceGate::Ready(source) => Ok(source),
            SourceGate::Blocked(reason) => Err(Error::Config(reason.clone())),
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, SourceGate::Ready(_))
    }
}

impl<S> Clone for SourceGate<S> {
    fn clone(&self) -> Self {
        match self {
            SourceGate::Ready(source) => SourceGate::Ready(Arc::clone(source)),
            SourceGate::Blocked(reason) => SourceGate::Blocked(reason.clone()),
        }
    }
}
