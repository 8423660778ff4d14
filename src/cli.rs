//! Command line interface for the `agenix` demonstration binary.
//!
//! The binary runs one synchronous request/reply exchange over an in-memory
//! endpoint, which is handy for checking timeouts and logging settings.

use clap::Parser;

/// Command line arguments for the `agenix` binary.
#[derive(Debug, Parser)]
#[command(name = "agenix", version, about = "Run a demo request/reply exchange")]
pub struct Cli {
    /// Payload of the request message.
    #[arg(short, long, default_value = "<Req/>")]
    pub request: String,

    /// Payload of the reply; the request is echoed when omitted.
    #[arg(long)]
    pub reply: Option<String>,

    /// Milliseconds to wait for the reply.
    #[arg(short, long, default_value_t = 5000)]
    pub timeout_ms: u64,

    /// Milliseconds between two correlation lookups.
    #[arg(short, long, default_value_t = 500)]
    pub polling_interval_ms: u64,
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::Cli;

    #[test]
    fn defaults_apply() {
        let cli = Cli::parse_from(["agenix"]);
        assert_eq!(cli.request, "<Req/>");
        assert_eq!(cli.reply, None);
        assert_eq!(cli.timeout_ms, 5000);
        assert_eq!(cli.polling_interval_ms, 500);
    }

    #[test]
    fn parses_reply_and_timeout() {
        let cli = Cli::parse_from(["agenix", "--reply", "<Res/>", "-t", "250"]);
        assert_eq!(cli.reply.as_deref(), Some("<Res/>"));
        assert_eq!(cli.timeout_ms, 250);
    }
}
