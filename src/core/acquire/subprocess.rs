use std::io::Write;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use serde_json::Value;
use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use super::AcquisitionResult;
use crate::api::{text_field, to_api_messages, AgentErrorPayload, GenerateRequest};
use crate::core::failure::Failure;
use crate::core::message::ConversationMessage;
use crate::core::transport::SubprocessTarget;

pub const NO_RESPONSE_PLACEHOLDER: &str = "No response generated";

/// Renders the runner script for `agent_name` exported by `module_path`.
///
/// The script only embeds configuration, encoded as JSON string literals.
/// Conversation content reaches the agent through standard input, so no user
/// text is ever part of the generated source.
pub fn render_script(module_path: &Path, agent_name: &str) -> Result<String, String> {
    let module = serde_json::to_string(&module_path.to_string_lossy())
        .map_err(|err| err.to_string())?;
    let agent = serde_json::to_string(agent_name).map_err(|err| err.to_string())?;

    Ok(format!(
        r#"import {{ pathToFileURL }} from 'node:url';

const MODULE_PATH = {module};
const AGENT_NAME = {agent};

async function readRequest() {{
  const chunks = [];
  for await (const chunk of process.stdin) chunks.push(chunk);
  return JSON.parse(Buffer.concat(chunks).toString('utf8'));
}}

try {{
  const request = await readRequest();
  const {{ mastra }} = await import(pathToFileURL(MODULE_PATH).href);
  const agent = mastra.getAgent(AGENT_NAME);
  const result = await agent.generate(request.messages, {{ threadId: request.threadId }});
  const text = typeof result?.text === 'string' ? result.text : JSON.stringify(result);
  console.log(JSON.stringify({{ text }}));
}} catch (err) {{
  console.error(JSON.stringify({{ error: err?.message ?? String(err) }}));
  process.exit(1);
}}
"#
    ))
}

fn write_script(script: &str) -> std::io::Result<NamedTempFile> {
    let mut file = tempfile::Builder::new()
        .prefix("citychat-agent-")
        .suffix(".mjs")
        .tempfile()?;
    file.write_all(script.as_bytes())?;
    file.flush()?;
    Ok(file)
}

pub(super) async fn acquire(
    target: &SubprocessTarget,
    messages: &[ConversationMessage],
    thread_id: &str,
    timeout: Duration,
) -> AcquisitionResult {
    let script = render_script(&target.module_path(), &target.agent_name)
        .map_err(Failure::agent_fault)?;
    let script_file = write_script(&script)
        .map_err(|err| Failure::agent_fault(format!("Unable to write agent script: {err}")))?;
    let payload = serde_json::to_vec(&GenerateRequest {
        messages: to_api_messages(messages),
        thread_id: thread_id.to_string(),
    })
    .map_err(|err| Failure::agent_fault(err.to_string()))?;

    let mut cmd = Command::new(&target.runtime);
    cmd.args(&target.runtime_args)
        .arg(script_file.path())
        .current_dir(&target.working_dir)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    debug!(
        runtime = %target.runtime,
        args = ?target.runtime_args,
        working_dir = %target.working_dir.display(),
        "Starting agent runtime"
    );
    let mut child = cmd.spawn().map_err(|err| {
        Failure::agent_fault(format!("Unable to start {}: {err}", target.runtime))
    })?;
    let mut stdin = child
        .stdin
        .take()
        .ok_or_else(|| Failure::agent_fault("Unable to retrieve stdin."))?;

    let feed = async move {
        let result = stdin.write_all(&payload).await;
        drop(stdin);
        result
    };
    let run = async move { tokio::join!(feed, child.wait_with_output()) };

    let output = match tokio::time::timeout(timeout, run).await {
        Err(_) => {
            return Err(Failure::timeout(format!(
                "agent runtime did not finish within {timeout:?}"
            )))
        }
        Ok((_, Err(err))) => return Err(Failure::agent_fault(err.to_string())),
        Ok((feed_result, Ok(output))) => {
            if let Err(err) = feed_result {
                // Runtimes that ignore stdin close the pipe early.
                debug!(error = %err, "Agent runtime did not consume the request");
            }
            output
        }
    };
    drop(script_file);

    debug!(status = %output.status, "Agent runtime exited");
    interpret_output(
        output.status.success(),
        output.status.code(),
        &String::from_utf8_lossy(&output.stdout),
        &String::from_utf8_lossy(&output.stderr),
    )
}

pub(super) fn interpret_output(
    success: bool,
    code: Option<i32>,
    stdout: &str,
    stderr: &str,
) -> AcquisitionResult {
    if !success {
        let message = error_message(stderr).unwrap_or_else(|| match code {
            Some(code) => format!("agent runtime exited with status {code}"),
            None => "agent runtime was terminated by a signal".to_string(),
        });
        return Err(Failure::agent_fault(message));
    }

    Ok(reply_from_stdout(stdout))
}

/// Takes `text` from the JSON answer, or the raw output when it is not JSON.
fn reply_from_stdout(stdout: &str) -> String {
    let trimmed = stdout.trim();
    if trimmed.is_empty() {
        return NO_RESPONSE_PLACEHOLDER.to_string();
    }

    let answer = parse_object(trimmed).or_else(|| last_line(trimmed).and_then(parse_object));
    match answer {
        Some(value) => text_field(&value)
            .filter(|text| !text.trim().is_empty())
            .map(str::to_owned)
            .unwrap_or_else(|| NO_RESPONSE_PLACEHOLDER.to_string()),
        None => trimmed.to_string(),
    }
}

fn error_message(stderr: &str) -> Option<String> {
    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        return None;
    }

    let payload = serde_json::from_str::<AgentErrorPayload>(trimmed).ok().or_else(|| {
        last_line(trimmed).and_then(|line| serde_json::from_str::<AgentErrorPayload>(line).ok())
    });
    match payload.map(|payload| payload.error) {
        Some(Value::String(message)) if !message.trim().is_empty() => Some(message),
        _ => Some(trimmed.to_string()),
    }
}

fn parse_object(text: &str) -> Option<Value> {
    serde_json::from_str::<Value>(text)
        .ok()
        .filter(Value::is_object)
}

fn last_line(text: &str) -> Option<&str> {
    text.lines().map(str::trim).rfind(|line| !line.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::failure::FailureKind;

    #[test]
    fn takes_text_from_json_stdout() {
        assert_eq!(
            interpret_output(true, Some(0), "{\"text\":\"ok\"}\n", ""),
            Ok("ok".to_string())
        );
    }

    #[test]
    fn skips_log_lines_before_json_answer() {
        let stdout = "Loading agent...\n[mastra] ready\n{\"text\":\"Tokyo is sunny\"}\n";
        assert_eq!(
            interpret_output(true, Some(0), stdout, ""),
            Ok("Tokyo is sunny".to_string())
        );
    }

    #[test]
    fn falls_back_to_raw_output_and_placeholder() {
        assert_eq!(
            interpret_output(true, Some(0), "  plain words \n", ""),
            Ok("plain words".to_string())
        );
        assert_eq!(
            interpret_output(true, Some(0), "   ", ""),
            Ok(NO_RESPONSE_PLACEHOLDER.to_string())
        );
        assert_eq!(
            interpret_output(true, Some(0), "{\"answer\":1}", ""),
            Ok(NO_RESPONSE_PLACEHOLDER.to_string())
        );
    }

    #[test]
    fn non_zero_exit_reports_stderr() {
        let failure = interpret_output(false, Some(1), "", "boom\n").expect_err("exit 1");
        assert_eq!(failure.kind, FailureKind::AgentFault);
        assert_eq!(failure.message, "boom");

        let failure = interpret_output(false, Some(1), "", "{\"error\":\"Agent not found\"}")
            .expect_err("json error");
        assert_eq!(failure.message, "Agent not found");

        let failure = interpret_output(false, Some(3), "", "").expect_err("silent exit");
        assert_eq!(failure.message, "agent runtime exited with status 3");
    }

    #[test]
    fn script_embeds_configuration_as_string_literals() {
        let script = render_script(Path::new("/srv/app/src/mastra/index.ts"), "city\"Agent")
            .expect("script should render");
        assert!(script.contains(r#"const MODULE_PATH = "/srv/app/src/mastra/index.ts";"#));
        assert!(script.contains(r#"const AGENT_NAME = "city\"Agent";"#));
        assert!(script.contains("process.stdin"));
    }
}
