//! Logical operation to provider endpoint mapping.

/// Endpoint paths for one logical operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperationSpec {
    /// Logical name callers use (e.g. `"keyword-check"`).
    pub name: &'static str,
    /// Path the submit request is POSTed to; responds with a ticket.
    pub submit_path: &'static str,
    /// Path the result fetch is POSTed to with the ticket id.
    pub result_path: &'static str,
}

const OPERATIONS: &[OperationSpec] = &[
    OperationSpec {
        name: "keyword-check",
        submit_path: "/v1/keywords/check",
        result_path: "/v1/keywords/check/result",
    },
    OperationSpec {
        name: "keyword-suggestions",
        submit_path: "/v1/keywords/suggestions",
        result_path: "/v1/keywords/suggestions/result",
    },
    OperationSpec {
        name: "app-profile",
        submit_path: "/v1/apps/profile",
        result_path: "/v1/apps/profile/result",
    },
    OperationSpec {
        name: "top-charts",
        submit_path: "/v1/charts/top",
        result_path: "/v1/charts/top/result",
    },
];

/// Look up the endpoint mapping for a logical operation name.
pub fn lookup(name: &str) -> Option<&'static OperationSpec> {
    OPERATIONS.iter().find(|op| op.name == name)
}

/// Names of all supported operations.
pub fn names() -> impl Iterator<Item = &'static str> {
    OPERATIONS.iter().map(|op| op.name)
}
