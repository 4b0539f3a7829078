//! ChatWire command line: drive a web chat assistant through a real browser.
//!
//! With a prompt argument, performs exactly one prompt/response cycle and
//! prints the response to stdout. Without one, runs an interactive loop
//! until the user enters `s` (or `quit`).

use std::io::{self, Write};

use tracing::error;
use tracing_subscriber::EnvFilter;

use chatwire_core::{Credentials, SessionConfig};
use chatwire_session::{ChatSession, CookieStore};

fn print_help() {
    println!("ChatWire: web chat automation over Chrome DevTools");
    println!();
    println!("Usage: chatwire [options] [prompt]");
    println!();
    println!("  [prompt]          Run one prompt/response cycle and exit");
    println!("  (no prompt)       Interactive loop; enter 's' or 'quit' to stop");
    println!();
    println!("Options:");
    println!("  --headed          Run Chrome with a visible window");
    println!("  --reset-cookies   Delete the stored cookie file before starting");
    println!("  -h, --help        Show this help");
    println!();
    println!("Environment:");
    println!("  CHATWIRE_EMAIL / CHATWIRE_PASSWORD   Login credentials");
    println!("  CHATWIRE_CHROME                      Chrome binary override");
    println!("  CHATWIRE_CONTRACT                    Page-contract JSON override");
}

#[derive(Debug, Default, PartialEq, Eq)]
struct CliArgs {
    help: bool,
    headed: bool,
    reset_cookies: bool,
    prompt: Option<String>,
}

/// Parse everything after the binary name. At most one positional prompt is
/// accepted; a second one is an error, not a silent overwrite.
fn parse_args<I>(args: I) -> Result<CliArgs, String>
where
    I: IntoIterator<Item = String>,
{
    let mut parsed = CliArgs::default();
    for arg in args {
        match arg.as_str() {
            "--help" | "-h" => parsed.help = true,
            "--headed" => parsed.headed = true,
            "--reset-cookies" => parsed.reset_cookies = true,
            other if other.starts_with('-') => {
                return Err(format!("Unknown option: {other} (try --help)"));
            }
            other => {
                if parsed.prompt.is_some() {
                    return Err(format!(
                        "Unexpected extra argument: {other} (quote the prompt as one argument)"
                    ));
                }
                parsed.prompt = Some(other.to_string());
            }
        }
    }
    Ok(parsed)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = match parse_args(std::env::args().skip(1)) {
        Ok(args) => args,
        Err(message) => {
            eprintln!("{message}");
            std::process::exit(2);
        }
    };
    if args.help {
        print_help();
        return Ok(());
    }

    let mut config = SessionConfig::default();
    if args.headed {
        config.headless = false;
    }
    if args.reset_cookies {
        CookieStore::new(config.cookie_path.clone()).clear()?;
    }

    let credentials = Credentials::from_env()?;

    let mut session = match ChatSession::connect(&config, &credentials).await {
        Ok(session) => session,
        Err(e) => {
            error!(error = %e, "login failed");
            std::process::exit(1);
        }
    };

    // One-shot mode: answer on stdout, everything else on the log.
    if let Some(prompt) = args.prompt {
        let result = session.ask(&prompt).await;
        session.close();
        match result {
            Ok(answer) => {
                println!("{answer}");
                return Ok(());
            }
            Err(e) => {
                error!(error = %e, "prompt failed");
                std::process::exit(1);
            }
        }
    }

    println!("Ready. Type a prompt ('s' or 'quit' to exit).");
    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut line = String::new();
        if io::stdin().read_line(&mut line)? == 0 {
            break; // EOF
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line.eq_ignore_ascii_case("s") || line.eq_ignore_ascii_case("quit") {
            break;
        }

        match session.ask(line).await {
            Ok(answer) => println!("{answer}"),
            Err(e) => eprintln!("Error: {e}"),
        }
    }
    session.close();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_single_prompt_with_flags() {
        let args = parse_args(argv(&["--headed", "--reset-cookies", "what is 2+2?"])).unwrap();
        assert!(args.headed);
        assert!(args.reset_cookies);
        assert_eq!(args.prompt.as_deref(), Some("what is 2+2?"));
    }

    #[test]
    fn test_no_arguments_means_interactive() {
        let args = parse_args(argv(&[])).unwrap();
        assert_eq!(args, CliArgs::default());
    }

    #[test]
    fn test_second_positional_is_rejected() {
        let err = parse_args(argv(&["first prompt", "second"])).unwrap_err();
        assert!(err.contains("second"));
    }

    #[test]
    fn test_unknown_option_is_rejected() {
        let err = parse_args(argv(&["--verbose"])).unwrap_err();
        assert!(err.contains("--verbose"));
    }
}
