//! Static catalog of callable tools.
//!
//! The registry is built once at startup and never mutated. Descriptors keep
//! their parameters as an ordered list so both validation order and catalog
//! serialization are deterministic; the `parameters` mapping is emitted in
//! declaration order rather than through an alphabetized map.

use serde::ser::{Serialize, SerializeMap, SerializeStruct, Serializer};
use serde_json::Value;

use bars_core::Granularity;

pub const TOOL_GET_LATEST_BARS: &str = "get_latest_bars";
pub const TOOL_GET_BARS_RANGE: &str = "get_bars_range";

const TIME_LEVELS: &[&str] = &[
    Granularity::Min15.as_str(),
    Granularity::Min30.as_str(),
    Granularity::Min60.as_str(),
];

/// Declared type of a single tool parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    String,
    Integer,
    DateTime,
    Enum(&'static [&'static str]),
}

impl ParamKind {
    /// JSON type token advertised in the catalog.
    #[must_use]
    pub const fn type_name(self) -> &'static str {
        match self {
            Self::String | Self::DateTime | Self::Enum(_) => "string",
            Self::Integer => "integer",
        }
    }
}

/// One declared tool parameter.
#[derive(Debug, Clone)]
pub struct ParamSpec {
    pub name: &'static str,
    pub kind: ParamKind,
    pub required: bool,
    pub default: Option<Value>,
    pub description: &'static str,
}

impl ParamSpec {
    const fn required(name: &'static str, kind: ParamKind, description: &'static str) -> Self {
        Self {
            name,
            kind,
            required: true,
            default: None,
            description,
        }
    }

    const fn optional(name: &'static str, kind: ParamKind, description: &'static str) -> Self {
        Self {
            name,
            kind,
            required: false,
            default: None,
            description,
        }
    }

    fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }
}

/// Description of one callable tool.
#[derive(Debug, Clone)]
pub struct ToolDescriptor {
    pub name: &'static str,
    pub description: &'static str,
    pub params: Vec<ParamSpec>,
}

impl Serialize for ToolDescriptor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("ToolDescriptor", 3)?;
        state.serialize_field("name", self.name)?;
        state.serialize_field("description", self.description)?;
        state.serialize_field("parameters", &ParamMap(&self.params))?;
        state.end()
    }
}

struct ParamMap<'a>(&'a [ParamSpec]);

impl Serialize for ParamMap<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for spec in self.0 {
            map.serialize_entry(spec.name, &ParamSchema(spec))?;
        }
        map.end()
    }
}

struct ParamSchema<'a>(&'a ParamSpec);

impl Serialize for ParamSchema<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let spec = self.0;
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("type", spec.kind.type_name())?;
        if let ParamKind::Enum(values) = spec.kind {
            map.serialize_entry("enum", values)?;
        }
        if spec.kind == ParamKind::DateTime {
            map.serialize_entry("format", "date-time")?;
        }
        map.serialize_entry("required", &spec.required)?;
        if let Some(default) = &spec.default {
            map.serialize_entry("default", default)?;
        }
        map.serialize_entry("description", spec.description)?;
        map.end()
    }
}

/// Fixed catalog of the callable tools.
#[derive(Debug, Clone)]
pub struct ToolRegistry {
    tools: Vec<ToolDescriptor>,
}

impl ToolRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self {
            tools: vec![latest_bars_descriptor(), bars_range_descriptor()],
        }
    }

    /// Ordered descriptor catalog.
    #[must_use]
    pub fn tools(&self) -> &[ToolDescriptor] {
        &self.tools
    }

    #[must_use]
    pub fn find(&self, name: &str) -> Option<&ToolDescriptor> {
        self.tools.iter().find(|tool| tool.name == name)
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn latest_bars_descriptor() -> ToolDescriptor {
    ToolDescriptor {
        name: TOOL_GET_LATEST_BARS,
        description: "Query the most recent intraday bars for a stock at or before an end time.",
        params: vec![
            ParamSpec::required(
                "time_level",
                ParamKind::Enum(TIME_LEVELS),
                "Time level, one of 15min, 30min, 60min.",
            ),
            ParamSpec::required("stock_code", ParamKind::String, "Stock code, e.g. sz002353."),
            ParamSpec::optional(
                "end_time",
                ParamKind::DateTime,
                "End time in YYYY-MM-DDTHH:MM:SS format; defaults to the current time.",
            ),
            ParamSpec::optional(
                "limit",
                ParamKind::Integer,
                "Number of bars to return, default 10.",
            )
            .with_default(Value::from(10)),
        ],
    }
}

fn bars_range_descriptor() -> ToolDescriptor {
    ToolDescriptor {
        name: TOOL_GET_BARS_RANGE,
        description: "Query all intraday bars for a stock within a time range.",
        params: vec![
            ParamSpec::required(
                "time_level",
                ParamKind::Enum(TIME_LEVELS),
                "Time level, one of 15min, 30min, 60min.",
            ),
            ParamSpec::required("stock_code", ParamKind::String, "Stock code, e.g. sz002353."),
            ParamSpec::required(
                "start_time",
                ParamKind::DateTime,
                "Start time in YYYY-MM-DDTHH:MM:SS format.",
            ),
            ParamSpec::required(
                "end_time",
                ParamKind::DateTime,
                "End time in YYYY-MM-DDTHH:MM:SS format.",
            ),
        ],
    }
}
