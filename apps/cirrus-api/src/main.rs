use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = cirrus_api::Args::parse();

	cirrus_api::run(args).await
}
