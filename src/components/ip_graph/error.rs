use thiserror::Error;

/// Failures surfaced by the graph core.
///
/// Contract violations abort a load and reach the caller. `ContainerUnmeasured`
/// is only ever logged: the scene falls back to its default size.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GraphError {
	/// Empty or blank root id.
	#[error("root asset id must not be empty")]
	EmptyRootId,

	/// The relationship list is not an array.
	#[error("relationships must be an array")]
	RelationshipsNotArray,

	/// The relationship array could not be decoded.
	#[error("relationships could not be decoded: {0}")]
	InvalidRecords(String),

	/// The container has no usable size.
	#[error("graph container measured {width}x{height}")]
	ContainerUnmeasured {
		/// Measured width in px.
		width: f64,
		/// Measured height in px.
		height: f64,
	},
}

impl GraphError {
	/// Short text shown in place of the graph.
	pub fn user_message(&self) -> &'static str {
		match self {
			GraphError::EmptyRootId => "No IP asset selected",
			GraphError::RelationshipsNotArray | GraphError::InvalidRecords(_) => {
				"Failed to load IP relationships"
			}
			GraphError::ContainerUnmeasured { .. } => "Graph area unavailable",
		}
	}
}
