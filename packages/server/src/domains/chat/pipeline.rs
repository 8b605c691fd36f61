use std::sync::Arc;

use super::nodes::{route_after_classify, ClassifyNode, FallbackNode, ReplyNode, CLASSIFY, FALLBACK, GENERATE_REPLY};
use super::state::ChatState;
use crate::kernel::ServerDeps;
use crate::workflow::{GraphBuilder, WorkflowError, WorkflowGraph, END};

/// classify -> (generate_reply | fallback)
pub fn chat_graph(deps: Arc<ServerDeps>) -> Result<WorkflowGraph<ChatState>, WorkflowError> {
    GraphBuilder::new("chat")
        .add_node(ClassifyNode::new(deps.clone()))
        .add_node(ReplyNode::new(deps))
        .add_node(FallbackNode)
        .set_entry(CLASSIFY)
        .add_conditional_edges(CLASSIFY, route_after_classify, &[GENERATE_REPLY, FALLBACK])
        .add_edge(GENERATE_REPLY, END)
        .add_edge(FALLBACK, END)
        .compile()
}
