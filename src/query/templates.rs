//! Telemetry package statement templates
//!
//! Every query routed to the telemetry package is one `select ... from dual`
//! statement. The statement shape depends on the request kind, and the
//! package name on the deployment variant:
//!
//! | Kind          | Statement                                           |
//! |---------------|-----------------------------------------------------|
//! | `RangeQuery`  | `<pkg>.promql_range('<expr>',<from>,<to>,<step>)`   |
//! | `LabelNames`  | `<pkg>.promql_label('__name__',<from>,<to>)`        |
//! | `LabelKeys`   | `<pkg>.promql_label(' ',0,0)`                       |
//! | `LabelValues` | `<pkg>.promql_label('<key>',0,0)`                   |
//! | `Series`      | `<pkg>.promql_series('<metric>',<start>,<end>)`     |

use serde::{Deserialize, Serialize};
use std::fmt;

/// Database deployment the telemetry package lives in
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeploymentVariant {
    /// Self-managed database
    #[default]
    Standard,
    /// Autonomous database
    #[serde(alias = "ADB", alias = "adb")]
    Autonomous,
}

impl DeploymentVariant {
    /// Name of the telemetry query package for this deployment
    pub fn package(&self) -> &'static str {
        match self {
            DeploymentVariant::Standard => "DBMS_TELEMETRY_QUERY",
            DeploymentVariant::Autonomous => "DBMS_CLOUD_TELEMETRY_QUERY",
        }
    }

    /// Parse a deployment name, accepting the host's `ADB` marker
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim() {
            "ADB" | "adb" | "autonomous" => Some(DeploymentVariant::Autonomous),
            "standard" | "" => Some(DeploymentVariant::Standard),
            _ => None,
        }
    }
}

impl fmt::Display for DeploymentVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeploymentVariant::Standard => write!(f, "standard"),
            DeploymentVariant::Autonomous => write!(f, "autonomous"),
        }
    }
}

/// A rendered-ready statement template
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateKind {
    /// PromQL range evaluation
    RangeQuery { expr: String, from: i64, to: i64, step: i64 },
    /// Metric names seen in a window
    LabelNames { from: i64, to: i64 },
    /// All label keys
    LabelKeys,
    /// Values of one label key
    LabelValues { key: String },
    /// Series of one metric in a window
    Series { metric: String, start: i64, end: i64 },
}

impl TemplateKind {
    /// Render the statement for `variant`
    pub fn render(&self, variant: DeploymentVariant) -> String {
        let pkg = variant.package();
        match self {
            TemplateKind::RangeQuery { expr, from, to, step } => format!(
                "select {}.promql_range('{}',{},{},{}) from dual",
                pkg,
                quote_literal(expr),
                from,
                to,
                step
            ),
            TemplateKind::LabelNames { from, to } => {
                format!("select {}.promql_label('__name__',{},{}) from dual", pkg, from, to)
            }
            TemplateKind::LabelKeys => format!("select {}.promql_label(' ',0,0) from dual", pkg),
            TemplateKind::LabelValues { key } => {
                format!("select {}.promql_label('{}',0,0) from dual", pkg, quote_literal(key))
            }
            TemplateKind::Series { metric, start, end } => format!(
                "select {}.promql_series('{}',{},{}) from dual",
                pkg,
                quote_literal(metric),
                start,
                end
            ),
        }
    }
}

/// Escape text for use inside a single-quoted SQL literal
fn quote_literal(text: &str) -> String {
    text.replace('\'', "''")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_query_per_variant() {
        let kind = TemplateKind::RangeQuery {
            expr: "rate(cpu[5m])".to_string(),
            from: 100,
            to: 825,
            step: 10,
        };
        assert_eq!(
            kind.render(DeploymentVariant::Standard),
            "select DBMS_TELEMETRY_QUERY.promql_range('rate(cpu[5m])',100,825,10) from dual"
        );
        assert_eq!(
            kind.render(DeploymentVariant::Autonomous),
            "select DBMS_CLOUD_TELEMETRY_QUERY.promql_range('rate(cpu[5m])',100,825,10) from dual"
        );
    }

    #[test]
    fn test_listing_templates() {
        let v = DeploymentVariant::Standard;
        assert_eq!(
            TemplateKind::LabelNames { from: 1, to: 2 }.render(v),
            "select DBMS_TELEMETRY_QUERY.promql_label('__name__',1,2) from dual"
        );
        assert_eq!(
            TemplateKind::LabelKeys.render(v),
            "select DBMS_TELEMETRY_QUERY.promql_label(' ',0,0) from dual"
        );
        assert_eq!(
            TemplateKind::LabelValues { key: "node".into() }.render(v),
            "select DBMS_TELEMETRY_QUERY.promql_label('node',0,0) from dual"
        );
        assert_eq!(
            TemplateKind::Series { metric: "cpu".into(), start: 10, end: 20 }.render(v),
            "select DBMS_TELEMETRY_QUERY.promql_series('cpu',10,20) from dual"
        );
    }

    #[test]
    fn test_quotes_are_doubled() {
        let kind = TemplateKind::RangeQuery {
            expr: "up{job='db'}".to_string(),
            from: 0,
            to: 10,
            step: 1,
        };
        assert_eq!(
            kind.render(DeploymentVariant::Standard),
            "select DBMS_TELEMETRY_QUERY.promql_range('up{job=''db''}',0,10,1) from dual"
        );
    }

    #[test]
    fn test_deployment_names() {
        assert_eq!(DeploymentVariant::from_name("ADB"), Some(DeploymentVariant::Autonomous));
        assert_eq!(DeploymentVariant::from_name(""), Some(DeploymentVariant::Standard));
        assert_eq!(DeploymentVariant::from_name("cloud"), None);

        let parsed: DeploymentVariant = serde_json::from_str("\"ADB\"").unwrap();
        assert_eq!(parsed, DeploymentVariant::Autonomous);
        assert_eq!(parsed.to_string(), "autonomous");
    }
}
