//! Endpoint construction for agent backends.

/// Strips trailing slashes so endpoint paths can be appended safely.
pub fn normalize_base_url(base_url: &str) -> String {
    base_url.trim().trim_end_matches('/').to_string()
}

/// Builds `{base}/agents/{agent}/{action}`.
///
/// ```
/// use citychat::utils::url::agent_action_url;
///
/// assert_eq!(
///     agent_action_url("http://localhost:4111/api/", "cityAssistantAgent", "generate"),
///     "http://localhost:4111/api/agents/cityAssistantAgent/generate"
/// );
/// ```
pub fn agent_action_url(base_url: &str, agent_name: &str, action: &str) -> String {
    format!(
        "{}/agents/{}/{}",
        normalize_base_url(base_url),
        agent_name.trim_matches('/'),
        action.trim_start_matches('/')
    )
}

pub fn generate_url(base_url: &str, agent_name: &str) -> String {
    agent_action_url(base_url, agent_name, "generate")
}

pub fn stream_url(base_url: &str, agent_name: &str) -> String {
    agent_action_url(base_url, agent_name, "stream")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_trailing_slashes_and_whitespace() {
        assert_eq!(
            normalize_base_url(" http://localhost:4111/api/// "),
            "http://localhost:4111/api"
        );
    }

    #[test]
    fn builds_generate_and_stream_urls() {
        assert_eq!(
            generate_url("http://localhost:4111/api", "cityAssistantAgent"),
            "http://localhost:4111/api/agents/cityAssistantAgent/generate"
        );
        assert_eq!(
            stream_url("http://127.0.0.1:9000/api/", "/weather/"),
            "http://127.0.0.1:9000/api/agents/weather/stream"
        );
    }
}
