//! Generation node: render a prompt, call the model once, keep what parses.

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::node::Node;
use super::state::GraphState;
use crate::kernel::response_parser::{extract, extract_list};
use crate::kernel::{GenerationParams, Prompt, ServerDeps};

/// Items recovered from one model response.
#[derive(Debug, Clone)]
pub struct GenerationOutput<I> {
    pub items: Vec<I>,
    /// The whole parsed document, `Null` when nothing could be parsed.
    pub document: Value,
}

impl<I> GenerationOutput<I> {
    /// Top-level string field of the document, if present.
    pub fn document_str(&self, key: &str) -> Option<&str> {
        self.document.get(key).and_then(Value::as_str)
    }
}

/// What a pipeline plugs into [`GenerationNode`].
pub trait GenerationStep: Send + Sync + 'static {
    type State: GraphState;
    type Item: DeserializeOwned + Send;

    const NAME: &'static str;

    /// Keys tried in order when the list is wrapped in an object.
    const ENTITY_KEYS: &'static [&'static str];

    /// Reads only the fields this step needs.
    fn prepare_input(&self, state: &Self::State) -> Prompt;

    fn into_patch(
        &self,
        state: &Self::State,
        output: GenerationOutput<Self::Item>,
    ) -> <Self::State as GraphState>::Patch;

    fn params(&self, defaults: GenerationParams) -> GenerationParams {
        defaults
    }
}

pub struct GenerationNode<G: GenerationStep> {
    step: G,
    deps: Arc<ServerDeps>,
}

impl<G: GenerationStep> GenerationNode<G> {
    pub fn new(step: G, deps: Arc<ServerDeps>) -> Self {
        Self { step, deps }
    }
}

#[async_trait]
impl<G: GenerationStep> Node<G::State> for GenerationNode<G> {
    fn name(&self) -> &str {
        G::NAME
    }

    async fn execute(&self, state: &G::State) -> Result<<G::State as GraphState>::Patch> {
        let prompt = self.step.prepare_input(state);
        let params = self.step.params(self.deps.generation);

        debug!(node = G::NAME, prompt_length = prompt.len(), "sending generation prompt");
        let raw = self
            .deps
            .ai
            .send(&prompt, &params)
            .await
            .with_context(|| format!("{} model call failed", G::NAME))?;

        let output = parse_items::<G::Item>(G::NAME, &raw, G::ENTITY_KEYS);
        info!(
            node = G::NAME,
            prompt_length = prompt.len(),
            item_count = output.items.len(),
            "generation complete"
        );

        Ok(self.step.into_patch(state, output))
    }
}

/// Recover a typed list from raw model text.
///
/// Never fails: an unparseable response or a missing list yields no items,
/// and individual items that do not fit `I` are skipped.
pub fn parse_items<I: DeserializeOwned>(node: &str, raw: &str, keys: &[&str]) -> GenerationOutput<I> {
    let document = match extract(raw) {
        Ok(document) => document,
        Err(e) => {
            warn!(node, error = %e, response_length = raw.len(), "could not parse model response");
            return GenerationOutput {
                items: Vec::new(),
                document: Value::Null,
            };
        }
    };

    let values = extract_list(&document, keys);
    if values.is_empty() {
        warn!(node, keys = ?keys, "model response has no entity list");
    }

    let items = values
        .iter()
        .enumerate()
        .filter_map(|(index, value)| match serde_json::from_value::<I>(value.clone()) {
            Ok(item) => Some(item),
            Err(e) => {
                warn!(node, index, error = %e, "skipping malformed item");
                None
            }
        })
        .collect();

    GenerationOutput { items, document }
}
