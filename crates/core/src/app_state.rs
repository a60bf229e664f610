use crate::Config;
use crate::relay::RelayClient;
use std::path::{Path, PathBuf};
use tracing::info;

fn init_workspace(workspace: &Path) -> std::io::Result<PathBuf> {
    std::fs::create_dir_all(workspace)?;
    std::path::absolute(workspace)
}

#[derive(Clone)]
pub struct AppState {
    pub relay: RelayClient,
    pub workspace: PathBuf,
}

impl AppState {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let workspace = init_workspace(Path::new(&config.workspace))?;
        info!(?workspace, relay_url = %config.relay_url, "Workspace ready");

        Ok(Self {
            relay: RelayClient::new(config.relay_url.clone(), config.relay_timeout()),
            workspace,
        })
    }

    pub fn workspace(&self) -> &Path {
        self.workspace.as_path()
    }
}
