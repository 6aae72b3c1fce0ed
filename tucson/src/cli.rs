use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tucson_core::Settings;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Set at build time by release pipelines.
pub const BUILD_STAMP: &str = match option_env!("TUCSON_BUILD_STAMP") {
    Some(stamp) => stamp,
    None => "No BuildStamp Provided",
};

pub const GIT_HASH: &str = match option_env!("TUCSON_GIT_HASH") {
    Some(hash) => hash,
    None => "No Git Commit Provided",
};

#[derive(Debug, Parser)]
#[command(name = "tucson", version, about = "tucson; an authenticating reverse proxy")]
pub struct Cli {
    /// Config file (default is $HOME/.tucson.yaml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Enable pretty (human readable) logging output
    #[arg(long, global = true)]
    pub pretty: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start the tucson server
    Serve(ServeArgs),
    /// Print version information
    Version,
}

/// Flags of `tucson serve`. Each one given overrides file and environment.
#[derive(Debug, Default, Args)]
pub struct ServeArgs {
    /// Address to listen on
    #[arg(long)]
    pub listen: Option<String>,

    /// Name of the default origin
    #[arg(long)]
    pub default_origin: Option<String>,

    /// Signing key for session tokens
    #[arg(short = 'k', long)]
    pub signing_key: Option<String>,

    /// OIDC issuer URL
    #[arg(long)]
    pub oidc_issuer: Option<String>,

    /// OIDC client id
    #[arg(long)]
    pub oidc_client_id: Option<String>,

    /// OIDC client secret
    #[arg(long)]
    pub oidc_client_secret: Option<String>,

    /// OIDC callback/redirect URL
    #[arg(long)]
    pub oidc_redirect_url: Option<String>,
}

impl Cli {
    /// Layer the global logging flags over `settings`.
    pub fn apply_globals(&self, settings: &mut Settings) {
        if self.debug {
            settings.logging.debug = true;
        }
        if self.pretty {
            settings.logging.pretty = true;
        }
    }
}

impl ServeArgs {
    pub fn apply(&self, settings: &mut Settings) {
        let overrides = [
            (&self.listen, &mut settings.listen),
            (&self.default_origin, &mut settings.default_origin),
            (&self.oidc_issuer, &mut settings.oidc.issuer),
            (&self.oidc_client_id, &mut settings.oidc.client_id),
            (&self.oidc_client_secret, &mut settings.oidc.client_secret),
            (&self.oidc_redirect_url, &mut settings.oidc.redirect_url),
        ];
        for (flag, slot) in overrides {
            if let Some(value) = flag {
                *slot = value.clone();
            }
        }
        if let Some(key) = &self.signing_key {
            settings.signing_key = Some(key.clone());
        }
    }
}

pub fn version_text() -> String {
    format!("tucson {VERSION}\nbuild: {BUILD_STAMP}\ncommit: {GIT_HASH}")
}
