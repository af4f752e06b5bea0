use crate::core::config::data::{Config, TransportKind};
use crate::core::transport::{default_runtime_args, DEFAULT_AGENT_MODULE, DEFAULT_RUNTIME};

fn or_unset(value: Option<&str>) -> &str {
    value.unwrap_or("(unset)")
}

impl Config {
    /// Prints the effective configuration, defaults filled in.
    pub fn print_all(&self) {
        let kind = self.transport_kind();
        println!("Current configuration:");
        println!("  transport: {kind}");
        println!("  agent: {}", self.agent_name());
        println!("  history: {}", self.history_for(kind).as_str());
        println!("  thread-prefix: {}", self.thread_prefix());
        println!(
            "  empty-reply-text: {}",
            or_unset(self.empty_reply_text.as_deref())
        );

        match kind {
            TransportKind::Buffered | TransportKind::Streaming => {
                println!("  endpoint: {}", self.endpoint());
            }
            TransportKind::Subprocess => self.print_subprocess(),
        }

        println!("  timeouts:");
        for kind in [
            TransportKind::Buffered,
            TransportKind::Streaming,
            TransportKind::Subprocess,
        ] {
            println!("    {kind}: {}s", self.timeout_for(kind).as_secs());
        }
    }

    fn print_subprocess(&self) {
        println!("  subprocess:");
        println!(
            "    runtime: {}",
            self.subprocess.runtime.as_deref().unwrap_or(DEFAULT_RUNTIME)
        );
        let args = self
            .subprocess
            .args
            .clone()
            .unwrap_or_else(default_runtime_args);
        if args.is_empty() {
            println!("    args: (none)");
        } else {
            println!("    args: {}", args.join(" "));
        }
        match &self.subprocess.working_dir {
            Some(dir) => println!("    working-dir: {}", dir.display()),
            None => println!("    working-dir: (current directory)"),
        }
        match &self.subprocess.module {
            Some(module) => println!("    module: {}", module.display()),
            None => println!("    module: {DEFAULT_AGENT_MODULE}"),
        }
    }
}
