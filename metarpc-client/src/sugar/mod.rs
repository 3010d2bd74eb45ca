mod connect;
mod history;
mod risk;
mod trading;

use crate::{config::Config, service::Service};

/// High-level facade: composed operations built from the
/// [`Service`] and [`crate::account::Account`] layers underneath. Nothing
/// here talks to the wire directly - every method is expressible in terms of
/// the mid-level facade's calls.
#[derive(Clone)]
pub struct Sugar {
    pub(crate) service: Service,
}

impl Sugar {
    pub fn new(service: Service) -> Self {
        Self { service }
    }

    /// Builds a [`Sugar`] facade directly from [`Config`] without an
    /// intermediate [`crate::account::Account`]/[`Service`] the caller has
    /// to wire up by hand (`QuickConnect`).
    pub fn quick_connect(config: Config) -> Self {
        Self::new(Service::new(crate::account::Account::new(config)))
    }

    pub fn service(&self) -> &Service {
        &self.service
    }
}
