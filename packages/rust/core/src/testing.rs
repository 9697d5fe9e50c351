//! Recording builder used by unit tests to observe dispatch order.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use compositor_builders::{BuildContext, Builder, ImageRegistry};
use compositor_shared::{CompositeError, Result, TemplateDefinition};

/// One observed builder call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Call {
    pub op: &'static str,
    pub builder: String,
    pub destination: String,
}

/// Shared, ordered log of builder calls.
#[derive(Debug, Clone, Default)]
pub(crate) struct CallLog(Arc<Mutex<Vec<Call>>>);

impl CallLog {
    fn record(&self, op: &'static str, builder: &str, destination: &Path) {
        self.0.lock().unwrap().push(Call {
            op,
            builder: builder.to_string(),
            destination: destination.display().to_string(),
        });
    }

    pub fn calls(&self) -> Vec<Call> {
        self.0.lock().unwrap().clone()
    }

    /// Destinations passed to `op`, in call order.
    pub fn destinations(&self, op: &str) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| c.op == op)
            .map(|c| c.destination)
            .collect()
    }
}

/// Builder that records every call and optionally fails for one destination.
pub(crate) struct RecordingBuilder {
    name: String,
    log: CallLog,
    fail_build_at: Option<String>,
    fail_validate_at: Option<String>,
}

impl RecordingBuilder {
    pub fn new(name: &str, log: CallLog) -> Self {
        Self {
            name: name.to_string(),
            log,
            fail_build_at: None,
            fail_validate_at: None,
        }
    }

    pub fn failing_build(mut self, destination: &str) -> Self {
        self.fail_build_at = Some(destination.to_string());
        self
    }

    pub fn failing_validate(mut self, destination: &str) -> Self {
        self.fail_validate_at = Some(destination.to_string());
        self
    }
}

#[async_trait]
impl Builder for RecordingBuilder {
    async fn build(
        &self,
        _ctx: &BuildContext,
        _registry: Option<&dyn ImageRegistry>,
        destination: &Path,
        _template: &TemplateDefinition,
    ) -> Result<()> {
        self.log.record("build", &self.name, destination);
        if self.fail_build_at.as_deref() == destination.to_str() {
            return Err(CompositeError::template("boom"));
        }
        Ok(())
    }

    async fn validate(&self, _ctx: &BuildContext, destination: &Path) -> Result<()> {
        self.log.record("validate", &self.name, destination);
        if self.fail_validate_at.as_deref() == destination.to_str() {
            return Err(CompositeError::template("invalid output"));
        }
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}
