//! Completion and rescore query compilation for wiki search.
//!
//! The crate is synchronous and holds no state between calls: a completion request is compiled
//! into a [`suggest::CompiledSuggest`] which is later handed back to decode the engine response,
//! and rescore chains are compiled once from configuration and then built per request.

pub mod dsl;
pub mod filetype;
pub mod highlight;
pub mod rescore;
pub mod suggest;
pub mod time_serde;

mod error;

pub use error::{Error, Result};
pub use rescore::{
	ExtensionRegistry, FunctionScoreChain, PreferRecent, RescoreChains, ScoreBuilder, SearchContext,
};
pub use suggest::{
	CompiledSuggest, CompletionQueryBuilder, CompletionRequestLog, Suggestion, SuggestionKind,
	SuggestionSet, VARIANT_EXTRA_DISCOUNT,
};
