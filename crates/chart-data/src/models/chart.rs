use serde::{Deserialize, Serialize};

use super::requirements::DataRequirements;

/// Display metadata for a chart plus its (optional) data requirements.
///
/// Built once at start-up and never mutated after registration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChartConfig {
    /// Globally unique chart identifier (e.g. `btc-price`)
    pub chart_type: String,

    /// Human-readable title
    pub title: String,

    /// Display category (e.g. "Market Data")
    pub category: String,

    #[serde(default)]
    pub description: String,

    /// Whether the chart may be shown in production builds
    #[serde(default)]
    pub production_ready: bool,

    /// Pipeline-managed data requirements; absent for charts that bring their own data
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requirements: Option<DataRequirements>,
}

impl ChartConfig {
    pub fn new(
        chart_type: impl Into<String>,
        title: impl Into<String>,
        category: impl Into<String>,
    ) -> Self {
        Self {
            chart_type: chart_type.into(),
            title: title.into(),
            category: category.into(),
            description: String::new(),
            production_ready: false,
            requirements: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_production_ready(mut self, production_ready: bool) -> Self {
        self.production_ready = production_ready;
        self
    }

    pub fn with_requirements(mut self, requirements: DataRequirements) -> Self {
        self.requirements = Some(requirements);
        self
    }
}
