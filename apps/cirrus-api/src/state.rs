use std::sync::Arc;

use cirrus_config::Config;
use cirrus_query::{ExtensionRegistry, RescoreChains};

#[derive(Clone)]
pub struct AppState {
	pub config: Arc<Config>,
	pub chains: Arc<RescoreChains>,
}
impl AppState {
	pub fn new(config: Config) -> color_eyre::Result<Self> {
		Self::with_extensions(config, &ExtensionRegistry::new())
	}

	/// Compiles every rescore chain up front so profile errors surface before serving.
	pub fn with_extensions(config: Config, registry: &ExtensionRegistry) -> color_eyre::Result<Self> {
		let chains = RescoreChains::compile(&config, registry)?;

		Ok(Self { config: Arc::new(config), chains: Arc::new(chains) })
	}
}
