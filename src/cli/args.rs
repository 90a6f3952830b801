//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! # Global Flags
//!
//! These flags are available on all commands:
//! - `--help` / `-h`: Show help
//! - `--version`: Show version
//! - `--config <path>`: Use this configuration file
//! - `--debug`: Enable debug logging
//! - `--quiet` / `-q`: Minimal output

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// mirror-sync - Keep an origin and a mirror git repository in sync
#[derive(Parser, Debug)]
#[command(name = "mirror-sync")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (default: $MIRROR_SYNC_CONFIG, then the user config dir)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Minimal output; only warnings and errors are logged
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Parser::parse()
    }
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Synchronize configured repository pairs
    #[command(
        name = "run",
        long_about = "Synchronize configured repository pairs.\n\n\
            For each job, branches accepted by the job's rules are copied (when new) or \
            merged (when both sides moved) from origin to mirror, then from mirror to \
            origin. Tags are copied after branches, with the source side winning on \
            name collisions. Nothing is ever deleted.\n\n\
            Jobs run in configuration order and the first failure stops the run; \
            the process exits with the failure's code.",
        after_help = "\
WORKFLOW EXAMPLES:
    # Sync every configured job
    mirror-sync run

    # Sync one job
    mirror-sync run --job docs

EXIT CODES:
     0    success
    -1    unexpected error
    -2    ssh host could not be trusted
    -3    no ssh host in source url
    -4    working repository could not be created
    -5    source remote could not be added
    -6    destination remote could not be added
    -7    listing source refs failed
    -8    listing destination refs failed
    -9    fetching an updated branch failed
    -10   switching to an updated branch failed
    -11   push of an updated branch rejected (rerun)
    -12   fetching an added branch failed
    -13   push of an added branch rejected (rerun)
    -14   fetching destination tags failed
    -15   fetching source tags failed
    -16   pushing tags failed
    -17   working repository in use by another pass
    -18   configuration invalid
    -101  merge conflict, manual merge required"
    )]
    Run {
        /// Only run the named job
        #[arg(long, value_name = "NAME")]
        job: Option<String>,
    },

    /// Show what a run would change, without changing anything
    #[command(
        name = "plan",
        long_about = "Show what a run would change.\n\n\
            Lists both remotes of each job and classifies branches exactly as a run \
            would, along with the tags a run would add or overwrite. Nothing is \
            fetched, merged or pushed.",
        after_help = "\
WORKFLOW EXAMPLES:
    # Preview every job
    mirror-sync plan

    # Machine-readable preview of one job
    mirror-sync plan --job docs --json"
    )]
    Plan {
        /// Only plan the named job
        #[arg(long, value_name = "NAME")]
        job: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Locate or validate the configuration file
    #[command(
        name = "config",
        after_help = "\
WORKFLOW EXAMPLES:
    # Where is the configuration read from?
    mirror-sync config path

    # Validate it and list its jobs
    mirror-sync config check"
    )]
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Generate shell completion scripts
    #[command(
        name = "completion",
        long_about = "Generate shell completion scripts for tab-completion.\n\n\
            Outputs a completion script for the specified shell. Add the output \
            to your shell's configuration to enable tab-completion.",
        after_help = "\
WORKFLOW EXAMPLES:
    # Bash (add to ~/.bashrc)
    mirror-sync completion bash >> ~/.bashrc

    # Zsh (add to ~/.zshrc)
    mirror-sync completion zsh >> ~/.zshrc

    # Fish
    mirror-sync completion fish > ~/.config/fish/completions/mirror-sync.fish

    # PowerShell
    mirror-sync completion powershell >> $PROFILE"
    )]
    Completion {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Config subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum ConfigAction {
    /// Print the path of the configuration file that would be used
    Path,
    /// Load and validate the configuration, then list its jobs
    Check,
}

#[derive(clap::ValueEnum, Debug, Clone, Copy)]
#[allow(clippy::enum_variant_names)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::error::FailureSite;
    use clap::CommandFactory;

    #[test]
    fn cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn run_help_documents_every_exit_code() {
        let mut cmd = Cli::command();
        let run = cmd.find_subcommand_mut("run").unwrap();
        let help = run.render_long_help().to_string();
        for site in FailureSite::ALL {
            let entry = format!("{:<6}{}", site.code(), site.description());
            assert!(help.contains(&entry), "missing '{}'", entry);
        }
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["mirror-sync", "run", "--job", "docs", "--debug"]).unwrap();
        assert!(cli.debug);
        match cli.command {
            Command::Run { job } => assert_eq!(job.as_deref(), Some("docs")),
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn plan_json_flag() {
        let cli = Cli::try_parse_from(["mirror-sync", "plan", "--json"]).unwrap();
        assert!(matches!(cli.command, Command::Plan { json: true, job: None }));
    }
}
