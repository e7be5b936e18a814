//! Shared HTTP constants (headers, problem URIs).

pub(crate) const HEADER_REQUEST_ID: &str = "x-request-id";

pub(crate) const PROBLEM_UNAUTHORIZED: &str = "https://certgate.dev/problems/unauthorized";
pub(crate) const PROBLEM_AUTHORIZATION_FAILURE: &str =
    "https://certgate.dev/problems/authorization-failure";
