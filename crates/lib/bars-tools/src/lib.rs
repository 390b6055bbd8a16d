//! Tool-invocation layer for bars-mcp.
//!
//! This crate wires the bar query collaborator into a small tool-calling
//! surface: a static registry describing the callable tools, a dispatcher
//! that validates and routes tool-call envelopes, and an SSE responder that
//! streams each result back as a single event.

pub mod dispatch;
pub mod registry;
pub mod server;

pub use dispatch::{Dispatcher, ToolCallRequest, ToolError, ToolErrorKind};
pub use registry::{ParamKind, ParamSpec, ToolDescriptor, ToolRegistry};
pub use server::{ToolServerConfig, serve, tool_router};
