pub mod commands;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::app::ServerTarget;
use crate::domain::{FeedDescriptor, FeedKind, FeedOptions};

#[derive(Parser)]
#[command(name = "notestream")]
#[command(about = "Mirror Misskey-compatible timelines in the terminal", long_about = None)]
pub struct Cli {
    /// Config file to use instead of ~/.config/notestream/config.toml
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Configured server to use
    #[arg(short, long, global = true)]
    pub server: Option<String>,

    /// Server origin, bypassing the configured servers
    #[arg(long, global = true)]
    pub origin: Option<String>,

    /// Access token to use with --origin or to override the configured one
    #[arg(long, global = true)]
    pub credential: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn target(&self) -> ServerTarget {
        ServerTarget {
            server: self.server.clone(),
            origin: self.origin.clone(),
            credential: self.credential.clone(),
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct FeedArgs {
    /// Feed kind: home, local, social, global, list or user
    pub kind: FeedKind,

    /// List id for `list`, user id for `user`
    pub parameter: Option<String>,

    /// Only notes with attachments
    #[arg(long)]
    pub with_files: bool,

    /// Include replies
    #[arg(long)]
    pub with_replies: bool,
}

impl FeedArgs {
    pub fn descriptor(&self) -> FeedDescriptor {
        FeedDescriptor {
            kind: self.kind,
            parameter: self.parameter.clone(),
            options: FeedOptions {
                with_files: self.with_files.then_some(true),
                with_replies: self.with_replies.then_some(true),
            },
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// List configured servers
    Servers,
    /// Print a feed page by page, then exit
    Page {
        #[command(flatten)]
        feed: FeedArgs,

        /// Number of pages to fetch
        #[arg(short, long, default_value_t = 1)]
        pages: usize,
    },
    /// Follow a feed live until interrupted
    Watch {
        #[command(flatten)]
        feed: FeedArgs,
    },
}
