pub mod action;
pub mod checksum;
pub mod collection;
pub mod config;
pub mod error;
pub mod fixity;
pub mod io;
pub mod notifier;
pub mod paths;
pub mod recorder;
pub mod step;
pub mod store;

pub use action::{ActionPhase, ActionResult, PreingestEvent, ResultPayload, Summary};
pub use checksum::ChecksumStep;
pub use collection::Collection;
pub use config::Settings;
pub use error::{PreingestError, Result};
pub use notifier::{EventNotifier, Subscription};
pub use step::{Step, StepContext};
pub use store::ActionStore;
