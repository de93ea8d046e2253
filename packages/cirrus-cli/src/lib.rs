use clap::builder::{
	Styles,
	styling::{AnsiColor, Effects},
};

pub const VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), "-", env!("CARGO_PKG_NAME"));

/// Help output styling shared by every workspace binary.
pub fn styles() -> Styles {
	Styles::styled()
		.header(AnsiColor::Cyan.on_default() | Effects::BOLD)
		.usage(AnsiColor::Cyan.on_default() | Effects::BOLD)
		.literal(AnsiColor::Yellow.on_default() | Effects::BOLD)
		.placeholder(AnsiColor::Green.on_default())
		.error(AnsiColor::Red.on_default() | Effects::BOLD)
}
