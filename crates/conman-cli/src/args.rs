use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "conman",
    version,
    about = "Install trusted container apps as desktop launchers"
)]
pub struct Cli {
    /// Application to install, as `spotify` or `conman://spotify`
    #[arg(required_unless_present = "list")]
    pub app: Option<String>,

    /// Print every published application as JSON
    #[arg(long, conflicts_with = "app")]
    pub list: bool,

    /// Trust service URL
    #[arg(long, env = "CONMAN_TRUST_SERVER")]
    pub trust_server: Option<String>,

    /// Install under this directory instead of $HOME
    #[arg(long, env = "CONMAN_HOME")]
    pub home: Option<PathBuf>,

    /// Skip pulling the container image
    #[arg(long)]
    pub no_pull: bool,
}
