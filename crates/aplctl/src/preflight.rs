//! Checks run before any command touches a remote service

use colored::Colorize;

const LINODE_TOKEN: &str = "LINODE_TOKEN";
const PULUMI_ACCESS_TOKEN: &str = "PULUMI_ACCESS_TOKEN";

const LINODE_TOKEN_URL: &str = "https://cloud.linode.com/profile/tokens";
const PULUMI_TOKEN_URL: &str = "https://app.pulumi.com/user/settings/tokens";

#[derive(Debug, PartialEq, Eq)]
enum Failure {
    MissingToken {
        provider: &'static str,
        var: &'static str,
        url: &'static str,
    },
    Root,
}

impl std::fmt::Display for Failure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Failure::MissingToken { provider, .. } => write!(f, "{} api token: not found", provider),
            Failure::Root => write!(f, "invalid user: do not run as root"),
        }
    }
}

/// Both API tokens are set and the process is not running as root.
pub fn check() -> anyhow::Result<()> {
    // SAFETY: geteuid has no preconditions and cannot fail
    let euid = unsafe { libc::geteuid() };
    let result = evaluate(
        std::env::var(LINODE_TOKEN).ok().as_deref(),
        std::env::var(PULUMI_ACCESS_TOKEN).ok().as_deref(),
        euid,
    );

    match result {
        Ok(()) => Ok(()),
        Err(failure) => {
            if let Failure::MissingToken { var, url, .. } = &failure {
                print_token_help(var, url);
            }
            tracing::error!("{}", failure);
            Err(anyhow::anyhow!("{}", failure))
        }
    }
}

fn evaluate(linode: Option<&str>, pulumi: Option<&str>, euid: u32) -> Result<(), Failure> {
    if linode.is_none_or(str::is_empty) {
        return Err(Failure::MissingToken {
            provider: "linode",
            var: LINODE_TOKEN,
            url: LINODE_TOKEN_URL,
        });
    }
    if pulumi.is_none_or(str::is_empty) {
        return Err(Failure::MissingToken {
            provider: "pulumi",
            var: PULUMI_ACCESS_TOKEN,
            url: PULUMI_TOKEN_URL,
        });
    }
    if euid == 0 {
        return Err(Failure::Root);
    }
    Ok(())
}

fn print_token_help(var: &str, url: &str) {
    eprintln!("{} {} is not set", "Error:".red().bold(), var.cyan());
    eprintln!();
    eprintln!("  create a new token at: {}", url.cyan());
    eprintln!("  set shell environment variable (~/.bashrc, ~/.bash_profile, etc.)");
    eprintln!("  example: {}", format!("export {}=<TOKEN>", var).yellow());
    eprintln!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_good() {
        assert_eq!(evaluate(Some("l"), Some("p"), 1000), Ok(()));
    }

    #[test]
    fn test_linode_token_checked_first() {
        let err = evaluate(None, None, 0).unwrap_err();
        assert_eq!(err.to_string(), "linode api token: not found");

        let err = evaluate(Some(""), Some("p"), 1000).unwrap_err();
        assert!(matches!(err, Failure::MissingToken { var: LINODE_TOKEN, .. }));
    }

    #[test]
    fn test_pulumi_token() {
        let err = evaluate(Some("l"), Some(""), 1000).unwrap_err();
        assert_eq!(err.to_string(), "pulumi api token: not found");
        assert!(matches!(err, Failure::MissingToken { url: PULUMI_TOKEN_URL, .. }));
    }

    #[test]
    fn test_root_rejected() {
        let err = evaluate(Some("l"), Some("p"), 0).unwrap_err();
        assert_eq!(err, Failure::Root);
        assert_eq!(err.to_string(), "invalid user: do not run as root");
    }
}
