use std::sync::Arc;

use preingest_core::fixity::{FixityClient, HttpFixityClient};
use preingest_core::step::StepContext;
use preingest_core::{ActionStore, Collection, EventNotifier, Settings};

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub notifier: EventNotifier,
    pub store: Arc<ActionStore>,
    pub fixity: Arc<dyn FixityClient>,
}

impl AppState {
    /// Open the action store named by `settings` and talk to the configured
    /// utilities service for digests.
    pub fn new(settings: Settings) -> preingest_core::Result<Self> {
        let store = ActionStore::open(&settings.database_path())?;
        let fixity = HttpFixityClient::from_settings(&settings);
        Ok(Self::with_parts(
            Arc::new(settings),
            Arc::new(store),
            Arc::new(fixity),
        ))
    }

    pub fn with_parts(
        settings: Arc<Settings>,
        store: Arc<ActionStore>,
        fixity: Arc<dyn FixityClient>,
    ) -> Self {
        Self {
            settings,
            notifier: EventNotifier::new(),
            store,
            fixity,
        }
    }

    /// Resolve `name` against the data folder. Fails on names that are not a
    /// plain file name; does not check that the file exists.
    pub fn collection(&self, name: &str) -> preingest_core::Result<Collection> {
        Collection::new(&self.settings.data_folder, name)
    }

    pub fn step_context(&self, collection: Collection) -> StepContext {
        StepContext {
            settings: Arc::clone(&self.settings),
            notifier: self.notifier.clone(),
            store: Arc::clone(&self.store),
            collection,
        }
    }
}
