// self
use crate::{_prelude::*, obs::OpKind};

/// Future wrapped in an [`OpSpan`].
pub type InstrumentedOp<F> = tracing::instrument::Instrumented<F>;

/// A span builder used by broker operations.
#[derive(Clone, Debug)]
pub struct OpSpan {
	span: tracing::Span,
}
impl OpSpan {
	/// Creates a new span tagged with the provided operation + stage.
	pub fn new(kind: OpKind, stage: &'static str) -> Self {
		let span = tracing::info_span!("filing_broker.op", op = kind.as_str(), stage);

		Self { span }
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedOp<Fut>
	where
		Fut: Future,
	{
		use tracing::Instrument;

		fut.instrument(self.span.clone())
	}
}
