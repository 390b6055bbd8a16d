//! Tool-call validation and routing.
//!
//! A [`Dispatcher`] turns one tool-call envelope into one result: registry
//! lookup, declaration-order parameter validation, defaulting, a single
//! round trip to the bar store, and an ordering check on what came back.
//! There are no retries and no partial results.

use std::error::Error;
use std::fmt;

use chrono::NaiveDateTime;
use serde::Serialize;
use serde_json::{Map, Value};

use bars_core::{Bar, BarStore, Clock, Granularity, StoreError, strictly_ascending};

use crate::registry::{
    ParamKind,
    ParamSpec,
    TOOL_GET_BARS_RANGE,
    TOOL_GET_LATEST_BARS,
    ToolDescriptor,
    ToolRegistry,
};

const DEFAULT_LIMIT: u32 = 10;

/// One incoming tool invocation, already unwrapped from its envelope.
#[derive(Debug, Clone)]
pub struct ToolCallRequest {
    pub name: String,
    pub arguments: Map<String, Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ToolErrorKind {
    UnknownTool,
    InvalidParameter,
    UpstreamUnavailable,
}

/// Structured dispatch failure, serialized as `{"kind": ..., "message": ...}`.
#[derive(Debug, Clone, Serialize)]
pub struct ToolError {
    pub kind: ToolErrorKind,
    pub message: String,
}

impl ToolError {
    #[must_use]
    pub fn unknown_tool(name: &str) -> Self {
        Self {
            kind: ToolErrorKind::UnknownTool,
            message: format!("unknown tool: {name}"),
        }
    }

    #[must_use]
    pub fn invalid_parameter(parameter: &str, reason: impl fmt::Display) -> Self {
        Self {
            kind: ToolErrorKind::InvalidParameter,
            message: format!("invalid parameter {parameter}: {reason}"),
        }
    }

    #[must_use]
    pub fn upstream(message: impl Into<String>) -> Self {
        Self {
            kind: ToolErrorKind::UpstreamUnavailable,
            message: message.into(),
        }
    }
}

impl fmt::Display for ToolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = &self.message;
        match self.kind {
            ToolErrorKind::UnknownTool => write!(f, "unknown tool: {message}"),
            ToolErrorKind::InvalidParameter => write!(f, "invalid parameter: {message}"),
            ToolErrorKind::UpstreamUnavailable => write!(f, "upstream unavailable: {message}"),
        }
    }
}

impl Error for ToolError {}

impl From<StoreError> for ToolError {
    fn from(err: StoreError) -> Self {
        Self::upstream(err.to_string())
    }
}

/// Validates tool-call requests against the registry and routes them to the
/// bar store. The clock is injected so `end_time` defaulting is reproducible.
pub struct Dispatcher<S, K> {
    registry: ToolRegistry,
    store: S,
    clock: K,
}

impl<S, K> Dispatcher<S, K>
where
    S: BarStore,
    K: Clock,
{
    #[must_use]
    pub fn new(store: S, clock: K) -> Self {
        Self {
            registry: ToolRegistry::new(),
            store,
            clock,
        }
    }

    #[must_use]
    pub const fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Dispatches one tool call to the matching bar query.
    ///
    /// # Errors
    /// Returns `UnknownTool` for an unregistered name (the store is never
    /// called), `InvalidParameter` on the first declaration-order validation
    /// failure, and `UpstreamUnavailable` when the store fails or returns an
    /// out-of-order sequence.
    pub async fn dispatch(&self, request: &ToolCallRequest) -> Result<Vec<Bar>, ToolError> {
        let Some(descriptor) = self.registry.find(&request.name) else {
            return Err(ToolError::unknown_tool(&request.name));
        };

        let args = Args {
            descriptor,
            map: &request.arguments,
        };
        args.reject_unknown()?;

        let bars = match descriptor.name {
            TOOL_GET_LATEST_BARS => self.latest_bars(&args).await?,
            TOOL_GET_BARS_RANGE => self.bars_range(&args).await?,
            other => return Err(ToolError::unknown_tool(other)),
        };

        if strictly_ascending(&bars) {
            Ok(bars)
        } else {
            Err(ToolError::upstream(
                "store returned bars out of ascending timestamp order",
            ))
        }
    }

    async fn latest_bars(&self, args: &Args<'_>) -> Result<Vec<Bar>, ToolError> {
        let granularity = args.granularity("time_level")?;
        let stock_code = args.string("stock_code")?;
        let end_time = args
            .datetime("end_time")?
            .unwrap_or_else(|| self.clock.now());
        let limit = args.integer("limit")?.unwrap_or(DEFAULT_LIMIT);

        let bars = self
            .store
            .fetch_latest(stock_code, granularity, end_time, limit)
            .await?;
        Ok(bars)
    }

    async fn bars_range(&self, args: &Args<'_>) -> Result<Vec<Bar>, ToolError> {
        let granularity = args.granularity("time_level")?;
        let stock_code = args.string("stock_code")?;
        let start_time = args.required_datetime("start_time")?;
        let end_time = args.required_datetime("end_time")?;

        if start_time > end_time {
            return Err(ToolError::invalid_parameter(
                "start_time",
                "start_time is after end_time",
            ));
        }

        let bars = self
            .store
            .fetch_range(stock_code, granularity, start_time, end_time)
            .await?;
        Ok(bars)
    }
}

/// Typed view over a request's argument object, checked against one
/// descriptor. Accessors are called in parameter declaration order so the
/// first reported violation is deterministic.
struct Args<'a> {
    descriptor: &'a ToolDescriptor,
    map: &'a Map<String, Value>,
}

impl Args<'_> {
    fn spec(&self, name: &str) -> &ParamSpec {
        self.descriptor
            .params
            .iter()
            .find(|spec| spec.name == name)
            .unwrap_or_else(|| {
                let tool = self.descriptor.name;
                panic!("parameter {name} not declared for tool {tool}")
            })
    }

    /// Fails closed on argument names the descriptor does not declare.
    fn reject_unknown(&self) -> Result<(), ToolError> {
        for name in self.map.keys() {
            if !self.descriptor.params.iter().any(|spec| spec.name == name) {
                return Err(ToolError::invalid_parameter(name, "unknown parameter"));
            }
        }
        Ok(())
    }

    fn value(&self, spec: &ParamSpec) -> Result<Option<&Value>, ToolError> {
        match self.map.get(spec.name) {
            Some(Value::Null) | None => {
                if spec.required {
                    Err(ToolError::invalid_parameter(spec.name, "required parameter is missing"))
                } else {
                    Ok(None)
                }
            }
            Some(value) => Ok(Some(value)),
        }
    }

    fn string(&self, name: &str) -> Result<&str, ToolError> {
        let spec = self.spec(name);
        let value = self
            .value(spec)?
            .ok_or_else(|| ToolError::invalid_parameter(name, "required parameter is missing"))?;
        value
            .as_str()
            .ok_or_else(|| ToolError::invalid_parameter(name, "expected a string"))
    }

    fn granularity(&self, name: &str) -> Result<Granularity, ToolError> {
        let spec = self.spec(name);
        let token = self.string(name)?;
        if let ParamKind::Enum(values) = spec.kind {
            if !values.contains(&token) {
                let allowed = values.join(", ");
                return Err(ToolError::invalid_parameter(
                    name,
                    format!("{token} is not one of: {allowed}"),
                ));
            }
        }
        token
            .parse()
            .map_err(|err| ToolError::invalid_parameter(name, err))
    }

    fn integer(&self, name: &str) -> Result<Option<u32>, ToolError> {
        let spec = self.spec(name);
        let Some(value) = self.value(spec)? else {
            return Ok(None);
        };
        let number = value
            .as_u64()
            .ok_or_else(|| ToolError::invalid_parameter(name, "expected a non-negative integer"))?;
        u32::try_from(number)
            .map(Some)
            .map_err(|_| ToolError::invalid_parameter(name, "value is out of range"))
    }

    fn datetime(&self, name: &str) -> Result<Option<NaiveDateTime>, ToolError> {
        let spec = self.spec(name);
        let Some(value) = self.value(spec)? else {
            return Ok(None);
        };
        let text = value
            .as_str()
            .ok_or_else(|| ToolError::invalid_parameter(name, "expected a date-time string"))?;
        parse_datetime(text)
            .map(Some)
            .map_err(|reason| ToolError::invalid_parameter(name, reason))
    }

    fn required_datetime(&self, name: &str) -> Result<NaiveDateTime, ToolError> {
        self.datetime(name)?
            .ok_or_else(|| ToolError::invalid_parameter(name, "required parameter is missing"))
    }
}

/// Parses an ISO 8601 datetime, tolerating a trailing `Z` suffix.
fn parse_datetime(text: &str) -> Result<NaiveDateTime, String> {
    let trimmed = text.strip_suffix('Z').unwrap_or(text);
    trimmed
        .parse()
        .map_err(|_| format!("{text} is not a YYYY-MM-DDTHH:MM:SS date-time"))
}
