use std::sync::Arc;

use crate::adapters::LibavMediaLoader;
use crate::app::{inspect_interactor::InspectInteractor, session::Session};
use crate::config::AppConfig;
use crate::domain::errors::DomainError;
use crate::ports::MediaLoaderPort;

pub trait AppContainer: Send + Sync {
    fn session(&self) -> Session;
    fn inspect_interactor(&self) -> Arc<InspectInteractor>;
}

pub struct DefaultAppContainer {
    config: AppConfig,
    loader: Arc<dyn MediaLoaderPort>,
    inspect_interactor: Arc<InspectInteractor>,
}

impl DefaultAppContainer {
    pub fn new(config: AppConfig) -> Result<Self, DomainError> {
        let loader: Arc<dyn MediaLoaderPort> = Arc::new(LibavMediaLoader::new(&config)?);
        Ok(Self::with_loader(config, loader))
    }

    pub fn with_loader(config: AppConfig, loader: Arc<dyn MediaLoaderPort>) -> Self {
        let inspect_interactor = Arc::new(InspectInteractor::new(
            Arc::clone(&loader),
            config.trim.default_window_secs,
        ));

        Self {
            config,
            loader,
            inspect_interactor,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }
}

impl AppContainer for DefaultAppContainer {
    fn session(&self) -> Session {
        Session::new(Arc::clone(&self.loader), &self.config)
    }

    fn inspect_interactor(&self) -> Arc<InspectInteractor> {
        Arc::clone(&self.inspect_interactor)
    }
}
