use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "hlive")]
#[command(about = "Live preview for a containerized Hugo site", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Serve the site and restart the container whenever a file changes (default)
    Server,

    /// Run the image once with the given arguments and exit with its status
    Build {
        /// Arguments passed to the image entrypoint
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
}

impl Cli {
    pub fn into_command(self) -> Command {
        self.command.unwrap_or(Command::Server)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_server() {
        let cli = Cli::try_parse_from(["hlive"]).unwrap();
        assert_eq!(cli.into_command(), Command::Server);
    }

    #[test]
    fn build_keeps_flag_arguments() {
        let cli = Cli::try_parse_from(["hlive", "build", "--minify", "-d", "public"]).unwrap();
        assert_eq!(
            cli.into_command(),
            Command::Build {
                args: vec!["--minify".into(), "-d".into(), "public".into()]
            }
        );
    }

    #[test]
    fn unknown_subcommand_is_rejected() {
        assert!(Cli::try_parse_from(["hlive", "deploy"]).is_err());
    }
}
