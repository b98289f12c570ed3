//! Agent runner with tool calling loop.

use crate::error::{CoraError, Result};
use crate::llm::{ChatModel, ChatRequest, ToolSpec};
use crate::memory::{Checkpoint, Checkpointer};
use crate::message::{Message, ToolCall};
use crate::tools::Tool;
use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Default bound on model calls per run.
pub const DEFAULT_MAX_ITERATIONS: usize = 15;

/// Step of the loop that produced an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Node {
    /// A model call.
    Agent,
    /// Execution of requested tool calls.
    Tools,
}

/// Messages produced by one step of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentEvent {
    pub node: Node,
    pub messages: Vec<Message>,
}

/// Per-run configuration.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Checkpoint thread the run reads from and writes to.
    pub thread_id: String,
}

impl RunConfig {
    pub fn new(thread_id: impl Into<String>) -> Self {
        Self {
            thread_id: thread_id.into(),
        }
    }
}

/// A hosted model wired with tools and a checkpointed memory.
pub struct Agent {
    model: Box<dyn ChatModel>,
    tools: Vec<Arc<dyn Tool>>,
    checkpointer: Arc<dyn Checkpointer>,
    system_prompt: Option<String>,
    max_iterations: usize,
}

enum Pending {
    /// Load the checkpoint and append these inputs.
    Start(Vec<Message>),
    CallModel,
    /// Run the calls of this reply; both are recorded together.
    CallTools(Message),
    Finished,
}

struct RunState {
    checkpoint: Checkpoint,
    pending: Pending,
    iterations: usize,
}

impl Agent {
    /// Create an agent over the given model, tools and checkpointer.
    pub fn new(
        model: Box<dyn ChatModel>,
        tools: Vec<Arc<dyn Tool>>,
        checkpointer: Arc<dyn Checkpointer>,
    ) -> Self {
        Self {
            model,
            tools,
            checkpointer,
            system_prompt: None,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }

    /// Set the fixed system instructions.
    pub fn with_system_prompt(mut self, prompt: &str) -> Self {
        self.system_prompt = Some(prompt.to_string());
        self
    }

    /// Set maximum iterations for the agent loop.
    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max;
        self
    }

    pub fn model(&self) -> &dyn ChatModel {
        self.model.as_ref()
    }

    /// Tools offered to the model.
    pub fn tools(&self) -> &[Arc<dyn Tool>] {
        &self.tools
    }

    pub fn checkpointer(&self) -> &Arc<dyn Checkpointer> {
        &self.checkpointer
    }

    /// Run the agent on new input messages, yielding one event per step.
    ///
    /// The checkpoint for `config.thread_id` is loaded first and rewritten after
    /// every step, so prior turns of the thread are visible to the model.
    pub fn stream(&self, input: Vec<Message>, config: &RunConfig) -> BoxStream<'_, Result<AgentEvent>> {
        let state = RunState {
            checkpoint: Checkpoint::new(&config.thread_id),
            pending: Pending::Start(input),
            iterations: 0,
        };

        stream::try_unfold(state, move |state| self.step(state)).boxed()
    }

    /// Run to completion and return every event.
    pub async fn invoke(&self, input: Vec<Message>, config: &RunConfig) -> Result<Vec<AgentEvent>> {
        self.stream(input, config).try_collect().await
    }

    async fn step(&self, mut state: RunState) -> Result<Option<(AgentEvent, RunState)>> {
        loop {
            match std::mem::replace(&mut state.pending, Pending::Finished) {
                Pending::Start(input) => {
                    if let Some(saved) = self.checkpointer.get(&state.checkpoint.thread_id).await? {
                        debug!("Resuming thread at step {}", saved.step);
                        state.checkpoint = saved;
                    }
                    let mut messages = state.checkpoint.messages.clone();
                    messages.extend(input);
                    state.checkpoint.advance(&messages);
                    self.checkpointer.put(&state.checkpoint).await?;
                    state.pending = Pending::CallModel;
                }
                Pending::CallModel => {
                    state.iterations += 1;
                    if state.iterations > self.max_iterations {
                        return Err(CoraError::RecursionLimit(self.max_iterations));
                    }

                    let mut reply = self.call_model(&state.checkpoint.messages).await?;
                    if reply.has_tool_calls() && !self.tools.is_empty() {
                        state.pending = Pending::CallTools(reply.clone());
                    } else {
                        if reply.has_tool_calls() {
                            warn!("Dropping {} tool call(s) with no tools bound", reply.tool_calls.len());
                            reply = reply.without_tool_calls();
                        }
                        self.record(&mut state.checkpoint, std::slice::from_ref(&reply))
                            .await?;
                    }

                    let event = AgentEvent {
                        node: Node::Agent,
                        messages: vec![reply],
                    };
                    return Ok(Some((event, state)));
                }
                Pending::CallTools(reply) => {
                    let mut results = Vec::with_capacity(reply.tool_calls.len());
                    for call in &reply.tool_calls {
                        results.push(self.execute_tool_call(call).await);
                    }

                    let mut step = Vec::with_capacity(results.len() + 1);
                    step.push(reply);
                    step.extend_from_slice(&results);
                    self.record(&mut state.checkpoint, &step).await?;
                    state.pending = Pending::CallModel;

                    let event = AgentEvent {
                        node: Node::Tools,
                        messages: results,
                    };
                    return Ok(Some((event, state)));
                }
                Pending::Finished => return Ok(None),
            }
        }
    }

    #[instrument(skip(self, messages), fields(model = %self.model.model()))]
    async fn call_model(&self, messages: &[Message]) -> Result<Message> {
        let specs: Vec<ToolSpec> = self.tools.iter().map(|t| t.spec()).collect();

        debug!("Agent model call with {} messages", messages.len());
        self.model
            .invoke(ChatRequest {
                system: self.system_prompt.as_deref(),
                messages,
                tools: &specs,
            })
            .await
    }

    /// Execute one tool call; failures become the tool message content.
    async fn execute_tool_call(&self, call: &ToolCall) -> Message {
        info!("Agent calling tool: {} with args: {}", call.name, call.args);

        let content = match self.tools.iter().find(|t| t.name() == call.name) {
            Some(tool) => match tool.call(&call.args).await {
                Ok(output) => output.to_string(),
                Err(e) => {
                    warn!("Tool {} failed: {}", call.name, e);
                    format!("Error: {}", e)
                }
            },
            None => format!("Error: {} is not a valid tool", call.name),
        };

        Message::tool(&call.id, &call.name, content)
    }

    async fn record(&self, checkpoint: &mut Checkpoint, new_messages: &[Message]) -> Result<()> {
        let mut messages = std::mem::take(&mut checkpoint.messages);
        messages.extend_from_slice(new_messages);
        checkpoint.advance(&messages);
        self.checkpointer.put(checkpoint).await
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted doubles for exercising the loop without hosted services.

    use super::*;
    use crate::llm::Provider;
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays canned replies and records the requests it saw.
    pub struct ScriptedModel {
        replies: Mutex<VecDeque<Message>>,
        pub seen: Arc<Mutex<Vec<Vec<Message>>>>,
        pub seen_tools: Arc<Mutex<Vec<usize>>>,
    }

    impl ScriptedModel {
        pub fn new(replies: Vec<Message>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                seen: Arc::new(Mutex::new(Vec::new())),
                seen_tools: Arc::new(Mutex::new(Vec::new())),
            }
        }
    }

    #[async_trait]
    impl ChatModel for ScriptedModel {
        fn provider(&self) -> Provider {
            Provider::OpenAI
        }

        fn model(&self) -> &str {
            "scripted"
        }

        async fn invoke(&self, request: ChatRequest<'_>) -> Result<Message> {
            self.seen.lock().unwrap().push(request.messages.to_vec());
            self.seen_tools.lock().unwrap().push(request.tools.len());
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| CoraError::Provider("script exhausted".to_string()))
        }
    }

    /// Search stand-in returning a fixed payload.
    pub struct EchoSearch;

    #[async_trait]
    impl Tool for EchoSearch {
        fn name(&self) -> &str {
            "tavily_search_results_json"
        }

        fn description(&self) -> &str {
            "echo"
        }

        fn parameters(&self) -> Value {
            json!({"type": "object", "properties": {"query": {"type": "string"}}, "required": ["query"]})
        }

        async fn call(&self, args: &Value) -> Result<Value> {
            match args.get("query").and_then(Value::as_str) {
                Some(q) => Ok(json!([{"title": "Forecast", "url": "https://example.com", "content": format!("sunny for {}", q)}])),
                None => Err(CoraError::Tool("Missing 'query' argument".to_string())),
            }
        }
    }

    pub fn search_call(id: &str, query: &str) -> ToolCall {
        ToolCall {
            id: id.to_string(),
            name: "tavily_search_results_json".to_string(),
            args: json!({ "query": query }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use crate::memory::MemorySaver;
    use crate::message::{Chunk, Content, Role};

    fn text(s: &str) -> Message {
        Message::assistant(Content::Text(s.to_string()))
    }

    #[tokio::test]
    async fn test_plain_answer_is_single_agent_event() {
        let saver = Arc::new(MemorySaver::new());
        let agent = Agent::new(Box::new(ScriptedModel::new(vec![text("Hi!")])), vec![], saver.clone());

        let events = agent
            .invoke(vec![Message::human("hello")], &RunConfig::new("s1"))
            .await
            .unwrap();

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].node, Node::Agent);
        assert_eq!(events[0].messages[0].text(), "Hi!");

        let saved = saver.get("s1").await.unwrap().unwrap();
        assert_eq!(saved.messages.len(), 2);
    }

    #[tokio::test]
    async fn test_tool_round_trip() {
        let model = ScriptedModel::new(vec![
            text("").with_tool_calls(vec![search_call("c1", "Oslo")]),
            text("It is sunny."),
        ]);
        let seen = model.seen.clone();
        let agent = Agent::new(
            Box::new(model),
            vec![Arc::new(EchoSearch)],
            Arc::new(MemorySaver::new()),
        );

        let events = agent
            .invoke(vec![Message::human("weather in Oslo?")], &RunConfig::new("s1"))
            .await
            .unwrap();

        let nodes: Vec<Node> = events.iter().map(|e| e.node).collect();
        assert_eq!(nodes, vec![Node::Agent, Node::Tools, Node::Agent]);

        let tool_message = &events[1].messages[0];
        assert_eq!(tool_message.role, Role::Tool);
        assert_eq!(tool_message.tool_call_id.as_deref(), Some("c1"));
        assert!(tool_message.text().contains("sunny for Oslo"));

        // Second model call sees human, assistant call, and tool result
        let seen = seen.lock().unwrap();
        assert_eq!(seen[1].len(), 3);
    }

    #[tokio::test]
    async fn test_unknown_tool_becomes_error_message() {
        let model = ScriptedModel::new(vec![
            text("").with_tool_calls(vec![ToolCall {
                id: "c1".to_string(),
                name: "python_repl".to_string(),
                args: serde_json::json!({}),
            }]),
            text("Sorry."),
        ]);
        let agent = Agent::new(
            Box::new(model),
            vec![Arc::new(EchoSearch)],
            Arc::new(MemorySaver::new()),
        );

        let events = agent
            .invoke(vec![Message::human("run code")], &RunConfig::new("s1"))
            .await
            .unwrap();
        assert_eq!(events[1].messages[0].text(), "Error: python_repl is not a valid tool");
    }

    #[tokio::test]
    async fn test_same_thread_reuses_checkpoint() {
        let saver = Arc::new(MemorySaver::new());

        let first = Agent::new(Box::new(ScriptedModel::new(vec![text("Nice to meet you, Ada.")])), vec![], saver.clone());
        first
            .invoke(vec![Message::human("I'm Ada")], &RunConfig::new("s1"))
            .await
            .unwrap();

        let model = ScriptedModel::new(vec![text("You're Ada.")]);
        let seen = model.seen.clone();
        let second = Agent::new(Box::new(model), vec![], saver.clone());
        second
            .invoke(vec![Message::human("Who am I?")], &RunConfig::new("s1"))
            .await
            .unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen[0].len(), 3);
        assert_eq!(seen[0][0].text(), "I'm Ada");

        let other = Agent::new(Box::new(ScriptedModel::new(vec![text("Hello")])), vec![], saver.clone());
        other
            .invoke(vec![Message::human("hi")], &RunConfig::new("s2"))
            .await
            .unwrap();
        assert_eq!(saver.get("s2").await.unwrap().unwrap().messages.len(), 2);
    }

    #[tokio::test]
    async fn test_iteration_limit() {
        let looping: Vec<Message> = (0..3)
            .map(|i| text("").with_tool_calls(vec![search_call(&format!("c{}", i), "again")]))
            .collect();
        let agent = Agent::new(
            Box::new(ScriptedModel::new(looping)),
            vec![Arc::new(EchoSearch)],
            Arc::new(MemorySaver::new()),
        )
        .with_max_iterations(2);

        let err = agent
            .invoke(vec![Message::human("loop")], &RunConfig::new("s1"))
            .await
            .unwrap_err();
        assert!(matches!(err, CoraError::RecursionLimit(2)));
    }

    #[tokio::test]
    async fn test_tool_calls_ignored_without_tools() {
        let agent = Agent::new(
            Box::new(ScriptedModel::new(vec![text("").with_tool_calls(vec![search_call("c1", "x")])])),
            vec![],
            Arc::new(MemorySaver::new()),
        );

        let events = agent
            .invoke(vec![Message::human("hi")], &RunConfig::new("s1"))
            .await
            .unwrap();
        assert_eq!(events.len(), 1);
        assert!(!events[0].messages[0].has_tool_calls());
    }

    #[tokio::test]
    async fn test_unanswered_tool_calls_never_reach_checkpoint() {
        let saver = Arc::new(MemorySaver::new());
        let reply = Message::assistant(Content::Chunks(vec![
            Chunk::Text { text: "Looking.".to_string() },
            Chunk::ToolUse {
                id: "c1".to_string(),
                name: "tavily_search_results_json".to_string(),
                input: serde_json::json!({"query": "x"}),
            },
        ]))
        .with_tool_calls(vec![search_call("c1", "x")]);
        let agent = Agent::new(Box::new(ScriptedModel::new(vec![reply])), vec![], saver.clone());

        agent
            .invoke(vec![Message::human("hi")], &RunConfig::new("s1"))
            .await
            .unwrap();

        let saved = saver.get("s1").await.unwrap().unwrap();
        let last = saved.messages.last().unwrap();
        assert!(!last.has_tool_calls());
        assert_eq!(last.content, Content::Chunks(vec![Chunk::Text { text: "Looking.".to_string() }]));
    }

    #[tokio::test]
    async fn test_stopping_before_tools_run_leaves_checkpoint_clean() {
        let saver = Arc::new(MemorySaver::new());
        let agent = Agent::new(
            Box::new(ScriptedModel::new(vec![
                text("").with_tool_calls(vec![search_call("c1", "Oslo")]),
                text("").with_tool_calls(vec![search_call("c2", "Oslo")]),
                text("Sunny."),
            ])),
            vec![Arc::new(EchoSearch)],
            saver.clone(),
        );

        {
            let mut stream = agent.stream(vec![Message::human("weather?")], &RunConfig::new("s1"));
            let first = stream.next().await.unwrap().unwrap();
            assert!(first.messages[0].has_tool_calls());
        }

        let saved = saver.get("s1").await.unwrap().unwrap();
        assert_eq!(saved.messages.len(), 1);
        assert_eq!(saved.messages[0].role, Role::Human);

        // A complete tool step lands in one write.
        let events = agent
            .invoke(vec![Message::human("weather?")], &RunConfig::new("s2"))
            .await
            .unwrap();
        assert_eq!(events.len(), 3);
        let saved = saver.get("s2").await.unwrap().unwrap();
        let roles: Vec<Role> = saved.messages.iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::Human, Role::Assistant, Role::Tool, Role::Assistant]);
    }
}
