pub mod realtime;
pub mod tools;

pub use realtime::{
    ClientConfig, RealtimeClient, RealtimeError, RealtimeEvent, RealtimeResult, SessionChannel,
    SessionState, TransportNegotiator,
};
pub use tools::{
    KnowledgeBase, ToolDispatcher, ToolHandler, ToolOutput, ToolProfile, ToolRegistry,
};
