use crate::config::{Config, Storage};
use crate::infra::{MemoryRep, MongoRep, RepoError, Repository};
use tracing::warn;

/// Shared by every request through Rocket's managed state.
pub struct AppState {
    repo: Box<dyn Repository>,
    pub public_url: String,
}

impl AppState {
    pub fn new<R: Repository + 'static>(repo: R, public_url: impl Into<String>) -> Self {
        AppState {
            repo: Box::new(repo),
            public_url: public_url.into(),
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, RepoError> {
        let repo: Box<dyn Repository> = match &config.storage {
            Storage::Mongo { uri, database } => Box::new(MongoRep::init(uri, database)?),
            Storage::Memory { fixture: Some(path) } => Box::new(MemoryRep::from_fixture(path)?),
            Storage::Memory { fixture: None } => {
                warn!("memory storage without FIXTURE_PATH starts empty");
                Box::new(MemoryRep::new())
            }
        };
        Ok(AppState {
            repo,
            public_url: config.public_url.clone(),
        })
    }

    pub fn repo(&self) -> &dyn Repository {
        self.repo.as_ref()
    }
}
