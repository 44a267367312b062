//! Per-run state shared between the executor and the step runner.

use lakeform_config::TemplateContext;
use lakeform_core::RunId;
use lakeform_core::resource::Outputs;
use std::collections::BTreeMap;

use crate::runlog::RunLog;

/// Process-wide state for one deployment run: the accumulated outputs, the
/// log sink, and the current step index. Created at run start, discarded at
/// run end.
pub struct RunContext {
    pub run_id: RunId,
    template: TemplateContext,
    pub log: RunLog,
    pub step_index: usize,
}

impl RunContext {
    pub fn new(log: RunLog) -> Self {
        let run_id = RunId::new();
        Self {
            run_id,
            template: TemplateContext::new(run_id.to_string()),
            log,
            step_index: 0,
        }
    }

    /// Record a resource's outputs under namespaced `<node-id>.<key>` keys.
    pub fn record_outputs(&mut self, node_id: &str, outputs: &Outputs) {
        for (key, value) in outputs {
            self.template.insert(format!("{node_id}.{key}"), value.clone());
        }
    }

    /// Whether a namespaced output key has been produced.
    pub fn has_output(&self, key: &str) -> bool {
        self.template.contains(key)
    }

    /// All accumulated outputs.
    pub fn outputs(&self) -> &BTreeMap<String, String> {
        self.template.outputs()
    }

    /// The templating view of this context.
    pub fn template(&self) -> &TemplateContext {
        &self.template
    }
}
