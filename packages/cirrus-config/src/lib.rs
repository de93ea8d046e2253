mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	BoostMode, Completion, Config, DEFAULT_HARD_LIMIT, DEFAULT_MAX_INPUT_LENGTH, ExtraIndex,
	Factor, FunctionSpec, Fuzzy, LanguageWeight, NamespaceWeight, PreferRecentDefaults, Rescore,
	RescoreChain, ScoreMode, Scoring, Service, SuggestProfile, SuggestSource,
};

use std::{collections::HashSet, fs, path::Path};

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;
	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

/// Same as [`load`] for configuration that is already in memory.
pub fn parse(raw: &str) -> Result<Config> {
	let mut cfg: Config = toml::from_str(raw).map_err(|err| Error::ParseInline { source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.service.http_bind.trim().is_empty() {
		return Err(Error::validation("service.http_bind must be non-empty."));
	}

	validate_completion(&cfg.completion)?;
	validate_scoring(&cfg.scoring)?;

	for (name, chain) in &cfg.rescore.chains {
		if name.trim().is_empty() {
			return Err(Error::validation("rescore.chains keys must be non-empty."));
		}

		for (label, value) in
			[("boost", chain.boost), ("max_boost", chain.max_boost), ("min_score", chain.min_score)]
		{
			if let Some(value) = value
				&& !value.is_finite()
			{
				return Err(Error::validation(format!(
					"rescore.chains.{name}.{label} must be a finite number."
				)));
			}
		}
	}

	Ok(())
}

pub fn validate_completion(completion: &Completion) -> Result<()> {
	if completion.hard_limit == Some(0) {
		return Err(Error::validation("completion.hard_limit must be greater than zero."));
	}
	if completion.max_input_length == 0 {
		return Err(Error::validation("completion.max_input_length must be greater than zero."));
	}
	if completion.max_request_chars == Some(0) {
		return Err(Error::validation("completion.max_request_chars must be greater than zero."));
	}
	if !completion.profiles.contains_key(&completion.default_profile) {
		return Err(Error::validation(format!(
			"completion.default_profile '{}' is not defined in completion.profiles.",
			completion.default_profile
		)));
	}

	for (profile_name, sources) in &completion.profiles {
		if sources.is_empty() {
			return Err(Error::validation(format!(
				"completion.profiles.{profile_name} must be non-empty."
			)));
		}

		let mut seen = HashSet::new();

		for source in sources {
			let path = format!("completion.profiles.{profile_name}.{}", source.name);

			if source.name.trim().is_empty() {
				return Err(Error::validation(format!(
					"completion.profiles.{profile_name} source names must be non-empty."
				)));
			}
			if source.name.contains("-variant-") {
				return Err(Error::validation(format!(
					"{path}: source names must not contain '-variant-'."
				)));
			}
			if !seen.insert(source.name.as_str()) {
				return Err(Error::validation(format!("{path} is defined more than once.")));
			}
			if source.field.trim().is_empty() {
				return Err(Error::validation(format!("{path}.field must be non-empty.")));
			}
			if !source.fetch_limit_factor.is_finite() || source.fetch_limit_factor <= 0.0 {
				return Err(Error::validation(format!(
					"{path}.fetch_limit_factor must be a finite number greater than zero."
				)));
			}
			if !source.discount.is_finite() || source.discount < 0.0 {
				return Err(Error::validation(format!(
					"{path}.discount must be a finite number, zero or greater."
				)));
			}
			if let Some(max) = source.max_query_len
				&& max < source.min_query_len
			{
				return Err(Error::validation(format!(
					"{path}.max_query_len must be at least min_query_len."
				)));
			}
		}
	}

	Ok(())
}

pub fn validate_scoring(scoring: &Scoring) -> Result<()> {
	for (label, value) in [
		("scoring.language_weight.user", scoring.language_weight.user),
		("scoring.language_weight.wiki", scoring.language_weight.wiki),
		("scoring.default_namespace_weight", scoring.default_namespace_weight),
		("scoring.talk_namespace_weight", scoring.talk_namespace_weight),
	] {
		if !value.is_finite() || value < 0.0 {
			return Err(Error::validation(format!(
				"{label} must be a finite number, zero or greater."
			)));
		}
	}
	for entry in &scoring.namespace_weights {
		if !entry.weight.is_finite() || entry.weight < 0.0 {
			return Err(Error::validation(format!(
				"scoring.namespace_weights entry for namespace {} must be a finite number, zero or greater.",
				entry.namespace
			)));
		}
	}
	for (template, weight) in scoring
		.boost_templates
		.iter()
		.chain(scoring.extra_indexes.iter().flat_map(|index| index.boost_templates.iter()))
	{
		if !weight.is_finite() {
			return Err(Error::validation(format!(
				"Boost weight for template '{template}' must be a finite number."
			)));
		}
	}
	for index in &scoring.extra_indexes {
		if index.wiki.is_empty() {
			return Err(Error::validation(format!(
				"scoring.extra_indexes.{}.wiki must be non-empty.",
				index.index
			)));
		}
	}

	let recent = &scoring.prefer_recent;

	if !(recent.decay_portion > 0.0 && recent.decay_portion <= 1.0) {
		return Err(Error::validation(
			"scoring.prefer_recent.decay_portion must be in the range (0.0, 1.0].",
		));
	}
	if !recent.half_life_days.is_finite() || recent.half_life_days <= 0.0 {
		return Err(Error::validation(
			"scoring.prefer_recent.half_life_days must be a finite number greater than zero.",
		));
	}
	if scoring.fragment_size == 0 {
		return Err(Error::validation("scoring.fragment_size must be greater than zero."));
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	if cfg.service.log_level.trim().is_empty() {
		cfg.service.log_level = "info".to_string();
	}

	cfg.scoring.wiki_language = cfg.scoring.wiki_language.trim().to_ascii_lowercase();

	for index in &mut cfg.scoring.extra_indexes {
		index.wiki = index.wiki.trim().to_string();
	}

	cfg.scoring.filetype_aliases.retain(|alias, target| {
		!alias.trim().is_empty() && !target.trim().is_empty()
	});
}
