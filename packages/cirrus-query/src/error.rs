pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invalid rescore profile: {message}")]
	InvalidRescoreProfile { message: String },
	#[error("Unknown {kind} profile '{name}'.")]
	UnknownProfile { kind: &'static str, name: String },
	#[error("Search term is {length} characters long, the limit is {limit}.")]
	RequestTooLong { length: usize, limit: usize },
	#[error("Cannot merge highlight field [{field}]: {message}")]
	HighlightMerge { field: String, message: String },
	#[error("Invalid search response: {message}")]
	InvalidResponse { message: String },
}
impl Error {
	pub(crate) fn invalid_profile(message: impl Into<String>) -> Self {
		Self::InvalidRescoreProfile { message: message.into() }
	}

	pub(crate) fn invalid_response(message: impl Into<String>) -> Self {
		Self::InvalidResponse { message: message.into() }
	}
}
