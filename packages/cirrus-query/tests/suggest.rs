use cirrus_config::{Completion, SuggestSource};
use cirrus_query::{
	CompiledSuggest, CompletionQueryBuilder, CompletionRequestLog, Error, SuggestionKind,
	VARIANT_EXTRA_DISCOUNT,
};
use cirrus_testkit::{
	completion_option, completion_option_with_target, sample_config, suggest_response,
};

fn compile(profile: &str, term: &str, variants: &[&str], limit: u32, offset: u32) -> CompiledSuggest {
	let cfg = sample_config();
	let sources = cfg.completion.profile(profile).expect("Profile must exist.");
	let variants: Vec<String> = variants.iter().map(|variant| variant.to_string()).collect();

	CompletionQueryBuilder::new(sources, limit, offset, &cfg.completion)
		.build(term, &variants)
		.expect("Build must succeed.")
}

fn query_names(compiled: &CompiledSuggest) -> Vec<&str> {
	compiled.queries().iter().map(|query| query.name.as_str()).collect()
}

fn single_source(name: &str) -> SuggestSource {
	SuggestSource {
		name: name.to_string(),
		field: "suggest".to_string(),
		min_query_len: 0,
		max_query_len: None,
		fetch_limit_factor: 1.0,
		discount: 1.0,
		fallback: false,
		fuzzy: None,
	}
}

#[test]
fn short_terms_skip_sources_with_higher_minimum() {
	assert_eq!(query_names(&compile("fuzzy", "ab", &[], 10, 0)), vec!["plain", "plain_stop"]);
	assert_eq!(
		query_names(&compile("fuzzy", "abc", &[], 10, 0)),
		vec!["plain", "plain_stop", "plain_fuzzy_2"]
	);
	assert_eq!(
		query_names(&compile("fuzzy", "abcdef", &[], 10, 0)),
		vec!["plain", "plain_stop", "plain_fuzzy_1"]
	);
	// Surrounding whitespace does not count towards the query length.
	assert_eq!(query_names(&compile("fuzzy", "  ab  ", &[], 10, 0)), vec!["plain", "plain_stop"]);
}

#[test]
fn single_source_compiles_to_one_sized_sub_query() {
	let settings = Completion::default();
	let profile = vec![SuggestSource {
		min_query_len: 2,
		fetch_limit_factor: 2.0,
		..single_source("p1")
	}];
	let compiled = CompletionQueryBuilder::new(&profile, 10, 0, &settings)
		.build("abc", &[])
		.expect("Build must succeed.");

	assert_eq!(compiled.hard_limit(), 10);
	assert_eq!(
		compiled.to_request(),
		serde_json::json!({
			"suggest": {
				"p1": { "prefix": "abc", "completion": { "field": "suggest", "size": 20 } }
			}
		})
	);
}

#[test]
fn fuzzy_settings_are_copied_into_the_request() {
	let compiled = compile("fuzzy", "abc", &[], 10, 0);
	let request = compiled.to_request();

	assert_eq!(
		request["suggest"]["plain_fuzzy_2"]["completion"]["fuzzy"],
		serde_json::json!({ "fuzziness": "AUTO", "prefix_length": 1, "unicode_aware": true })
	);
	assert!(request["suggest"]["plain"]["completion"].get("fuzzy").is_none());
}

#[test]
fn long_terms_are_truncated() {
	let term = "a".repeat(80);
	let compiled = compile("strict", &term, &[], 10, 0);

	assert_eq!(compiled.queries()[0].prefix.chars().count(), 50);
}

#[test]
fn request_length_guard_rejects_long_terms() {
	let settings = Completion { max_request_chars: Some(5), ..Completion::default() };
	let profile = vec![single_source("plain")];
	let err = CompletionQueryBuilder::new(&profile, 10, 0, &settings)
		.build("abcdef", &[])
		.expect_err("Expected the request to be rejected.");

	assert!(matches!(err, Error::RequestTooLong { length: 6, limit: 5 }), "Unexpected error: {err}");
}

#[test]
fn later_variants_are_discounted_more() {
	let compiled = compile("strict", "abc", &["abd", "abe"], 10, 0);

	assert_eq!(query_names(&compiled), vec!["plain", "plain-variant-1", "plain-variant-2"]);

	let first = compiled.discount("plain-variant-1").expect("First variant must be merged.");
	let second = compiled.discount("plain-variant-2").expect("Second variant must be merged.");

	assert_eq!(first, VARIANT_EXTRA_DISCOUNT);
	assert_eq!(second, VARIANT_EXTRA_DISCOUNT / 2.0);
	assert!(second < first);
	assert!(compiled.source("plain-variant-1").is_some_and(|source| source.fallback));
	assert_eq!(compiled.queries()[2].prefix, "abe");
}

#[test]
fn duplicate_variants_are_dropped() {
	let compiled = compile("strict", "abc", &["abc", "abd", "abd", "abe"], 10, 0);

	assert_eq!(query_names(&compiled), vec!["plain", "plain-variant-1", "plain-variant-2"]);
	assert_eq!(compiled.queries()[1].prefix, "abd");
}

#[test]
fn variants_are_gated_by_the_original_term_length() {
	let compiled = compile("fuzzy", "ab", &["abcdef"], 10, 0);

	assert_eq!(
		query_names(&compiled),
		vec!["plain", "plain_stop", "plain-variant-1", "plain_stop-variant-1"]
	);

	let merged: Vec<&str> =
		compiled.merged_profiles().iter().map(|source| source.name.as_str()).collect();

	assert!(merged.contains(&"plain_fuzzy_1"));
	assert!(!merged.contains(&"plain_fuzzy_1-variant-1"));
	assert!(!merged.contains(&"plain_fuzzy_2-variant-1"));
}

#[test]
fn gated_sources_can_leave_an_empty_request() {
	let compiled = compile("fuzzy", "", &[], 10, 0);

	assert_eq!(query_names(&compiled), vec!["plain", "plain_stop"]);

	let settings = Completion::default();
	let profile = vec![SuggestSource { min_query_len: 3, ..single_source("plain") }];
	let compiled = CompletionQueryBuilder::new(&profile, 10, 0, &settings)
		.build("a", &[])
		.expect("Build must succeed.");

	assert!(compiled.is_empty());
	assert_eq!(compiled.to_request(), serde_json::json!({ "suggest": {} }));
}

#[test]
fn decode_keeps_the_best_score_per_page() {
	let compiled = compile("strict", "abc", &[], 10, 0);
	let response = suggest_response([(
		"plain",
		vec![
			completion_option("12t", 5.0, "Abc"),
			completion_option("12r", 7.0, "Abc redirect"),
			completion_option("13t", 6.0, "Abd"),
		],
	)]);
	let mut log = CompletionRequestLog::new();
	let set = compiled.decode(&response, "enwiki_titlesuggest", &mut log).expect("Decode must succeed.");

	assert_eq!(set.page_ids(), vec![12, 13]);
	assert_eq!(set.suggestions[0].score, 7.0);
	assert_eq!(set.suggestions[0].kind, SuggestionKind::Redirect);
	assert_eq!(log.hits_total, 3);
}

#[test]
fn decode_ties_keep_the_first_seen_option() {
	let compiled = compile("strict", "abc", &[], 10, 0);
	let response = suggest_response([(
		"plain",
		vec![
			completion_option("12t", 4.0, "Abc"),
			completion_option("12r", 4.0, "Abc redirect"),
			completion_option("20t", 2.0, "First"),
			completion_option("21t", 2.0, "Second"),
		],
	)]);
	let set = compiled
		.decode(&response, "enwiki_titlesuggest", &mut CompletionRequestLog::new())
		.expect("Decode must succeed.");
	let texts: Vec<&str> = set.iter().map(|suggestion| suggestion.text.as_str()).collect();

	assert_eq!(set.page_ids(), vec![12, 20, 21]);
	assert_eq!(texts, vec!["Abc", "First", "Second"]);
	assert_eq!(set.suggestions[0].kind, SuggestionKind::Title);
	assert_eq!(set.suggestions[0].profile, "plain");
}

#[test]
fn decode_applies_source_discounts() {
	let compiled = compile("fuzzy", "abc", &[], 10, 0);
	let response = suggest_response([
		("plain", vec![completion_option("1t", 3.0, "One")]),
		(
			"plain_stop",
			vec![completion_option("1t", 1000.0, "One"), completion_option("2t", 4000.0, "Two")],
		),
	]);
	let set = compiled
		.decode(&response, "enwiki_titlesuggest", &mut CompletionRequestLog::new())
		.expect("Decode must succeed.");

	assert_eq!(set.page_ids(), vec![2, 1]);
	assert_eq!(set.suggestions[1].profile, "plain");
	assert_eq!(set.suggestions[1].score, 3.0);
	assert_eq!(set.suggestions[0].profile, "plain_stop");
}

#[test]
fn decode_order_is_independent_of_option_order() {
	let compiled = compile("strict", "abc", &[], 10, 0);
	let options = vec![
		completion_option("1t", 1.0, "One"),
		completion_option("2t", 4.0, "Two"),
		completion_option("3t", 3.0, "Three"),
		completion_option("4t", 2.0, "Four"),
	];
	let mut reversed = options.clone();

	reversed.reverse();

	let forward = compiled
		.decode(&suggest_response([("plain", options)]), "idx", &mut CompletionRequestLog::new())
		.expect("Decode must succeed.");
	let backward = compiled
		.decode(&suggest_response([("plain", reversed)]), "idx", &mut CompletionRequestLog::new())
		.expect("Decode must succeed.");

	assert_eq!(forward.page_ids(), vec![2, 3, 4, 1]);
	assert_eq!(forward, backward);
}

#[test]
fn decode_returns_the_requested_page() {
	let compiled = compile("strict", "abc", &[], 5, 3);

	assert_eq!(compiled.hard_limit(), 8);

	let options: Vec<serde_json::Value> =
		(1..=10).map(|page| completion_option(&format!("{page}t"), f64::from(page), "Page")).collect();
	let mut log = CompletionRequestLog::new();
	let set = compiled
		.decode(&suggest_response([("plain", options)]), "idx", &mut log)
		.expect("Decode must succeed.");

	assert_eq!(set.page_ids(), vec![7, 6, 5, 4, 3]);
	assert_eq!(log.results.len(), 5);
	assert_eq!(log.results[0].rank, 0);
	assert_eq!(log.results[0].page_id, 7);
}

#[test]
fn decode_past_the_hard_limit_is_empty() {
	let compiled = compile("strict", "abc", &[], 10, 50);

	assert!(!compiled.results_possible());

	let set = compiled
		.decode(
			&suggest_response([("plain", vec![completion_option("1t", 1.0, "One")])]),
			"idx",
			&mut CompletionRequestLog::new(),
		)
		.expect("Decode must succeed.");

	assert!(set.is_empty());
}

#[test]
fn decode_picks_title_text_for_main_namespace_titles() {
	let compiled = compile("strict", "abc", &[], 10, 0);
	let response = suggest_response([(
		"plain",
		vec![
			completion_option_with_target("1t", 3.0, "abc raw", "Abc", 0),
			completion_option_with_target("2r", 2.0, "Abc redirect", "Target", 0),
			completion_option_with_target("3t", 1.0, "Help:Abc", "Abc", 12),
		],
	)]);
	let set = compiled
		.decode(&response, "idx", &mut CompletionRequestLog::new())
		.expect("Decode must succeed.");
	let texts: Vec<&str> = set.iter().map(|suggestion| suggestion.text.as_str()).collect();

	assert_eq!(texts, vec!["Abc", "Abc redirect", "Help:Abc"]);
	assert_eq!(set.suggestions[2].namespace, Some(12));
}

#[test]
fn decode_skips_undecodable_ids_and_unknown_sections() {
	let compiled = compile("strict", "abc", &[], 10, 0);
	let response = suggest_response([
		("plain", vec![completion_option("garbage", 9.0, "Bad"), completion_option("5t", 1.0, "Five")]),
		("never_compiled", vec![completion_option("6t", 100.0, "Six")]),
	]);
	let set = compiled
		.decode(&response, "idx", &mut CompletionRequestLog::new())
		.expect("Decode must succeed.");

	assert_eq!(set.page_ids(), vec![5]);
}

#[test]
fn decode_handles_missing_and_malformed_suggest_sections() {
	let compiled = compile("strict", "abc", &[], 10, 0);
	let mut log = CompletionRequestLog::new();
	let missing = serde_json::json!({ "took": 1 });

	assert!(compiled.decode(&missing, "idx", &mut log).expect("Decode must succeed.").is_empty());
	assert_eq!(log.response, Some(missing));

	let empty = serde_json::json!({ "suggest": {} });

	assert!(compiled.decode(&empty, "idx", &mut log).expect("Decode must succeed.").is_empty());

	let malformed = serde_json::json!({ "suggest": ["plain"] });

	assert!(matches!(
		compiled.decode(&malformed, "idx", &mut log),
		Err(Error::InvalidResponse { .. })
	));

	let bad_options = serde_json::json!({ "suggest": { "plain": [{ "options": [{ "text": "x" }] }] } });

	assert!(matches!(
		compiled.decode(&bad_options, "idx", &mut log),
		Err(Error::InvalidResponse { .. })
	));
}

#[test]
fn request_log_carries_fingerprint_and_results() {
	let compiled = compile("strict", "abc", &[], 10, 0);
	let same = compile("strict", "abc", &[], 10, 0);
	let mut log = CompletionRequestLog::for_request("abc", &compiled);

	assert_eq!(log.request_fingerprint, Some(same.fingerprint()));
	assert_ne!(compiled.fingerprint(), compile("strict", "abd", &[], 10, 0).fingerprint());

	compiled
		.decode(
			&suggest_response([("plain", vec![completion_option("1t", 1.0, "One")])]),
			"enwiki_titlesuggest",
			&mut log,
		)
		.expect("Decode must succeed.");

	let payload = serde_json::to_value(&log).expect("Log must serialize.");

	assert_eq!(payload["index_name"], "enwiki_titlesuggest");
	assert_eq!(payload["term"], "abc");
	assert_eq!(payload["results"][0]["profile"], "plain");
	assert!(payload["created_at"].as_str().is_some_and(|created| created.contains('T')));
}
