use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueHint, builder::BoolishValueParser};
use uuid::Uuid;

/// Command-line arguments for the pressroom binary.
#[derive(Debug, Parser)]
#[command(name = "pressroom", version, about = "Pressroom blog content engine")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(
        long = "config-file",
        env = "PRESSROOM_CONFIG_FILE",
        value_name = "PATH",
        value_hint = ValueHint::FilePath
    )]
    pub config_file: Option<PathBuf>,

    #[command(flatten)]
    pub overrides: Overrides,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Apply database migrations.
    Migrate,
    /// Print one page of the published feed.
    Feed(FeedArgs),
    /// Print the published feed and reprint it whenever posts change.
    Watch(FeedArgs),
    /// List every post, optionally filtered by title.
    List(ListArgs),
    /// Print total, published and draft counts.
    Stats(OutputArgs),
    /// Create a post.
    Create(CreateArgs),
    /// Edit an existing post.
    Edit(EditArgs),
    /// Flip a post between published and draft.
    Toggle(PostIdArgs),
    /// Delete a post.
    Delete(DeleteArgs),
    /// Print a published post.
    Show(PostIdArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct Overrides {
    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new(),
        global = true
    )]
    pub log_json: Option<bool>,

    /// Override the database connection URL.
    #[arg(long = "database-url", value_name = "URL", global = true)]
    pub database_url: Option<String>,

    /// Override the directory images are written to.
    #[arg(
        long = "uploads-directory",
        value_name = "PATH",
        value_hint = ValueHint::DirPath,
        global = true
    )]
    pub uploads_directory: Option<PathBuf>,

    /// Override the number of posts per feed page.
    #[arg(long = "feed-page-size", value_name = "COUNT", global = true)]
    pub feed_page_size: Option<usize>,

    /// Act as this operator id.
    #[arg(long = "operator-id", value_name = "UUID", global = true)]
    pub operator_id: Option<Uuid>,

    /// Act under this operator display name.
    #[arg(long = "operator-name", value_name = "NAME", global = true)]
    pub operator_name: Option<String>,
}

#[derive(Debug, Args, Clone)]
pub struct FeedArgs {
    /// 1-indexed page number.
    #[arg(long, default_value_t = 1)]
    pub page: usize,

    #[command(flatten)]
    pub output: OutputArgs,
}

#[derive(Debug, Args, Default, Clone)]
pub struct OutputArgs {
    /// Print JSON instead of text.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub json: bool,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ListArgs {
    /// Case-insensitive title filter.
    #[arg(long, value_name = "QUERY")]
    pub search: Option<String>,
}

#[derive(Debug, Args, Clone)]
pub struct CreateArgs {
    #[arg(long)]
    pub title: String,

    #[arg(long)]
    pub description: String,

    /// Post body; `-` reads it from stdin.
    #[arg(long)]
    pub content: String,

    /// Author name shown to readers; defaults to the operator's name.
    #[arg(long)]
    pub author: Option<String>,

    /// Image file to upload and attach.
    #[arg(long, value_name = "PATH", value_hint = ValueHint::FilePath)]
    pub image: Option<PathBuf>,

    /// Save as a draft instead of publishing.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub draft: bool,
}

#[derive(Debug, Args, Clone)]
pub struct EditArgs {
    pub id: Uuid,

    #[arg(long)]
    pub title: Option<String>,

    #[arg(long)]
    pub description: Option<String>,

    /// Post body; `-` reads it from stdin.
    #[arg(long)]
    pub content: Option<String>,

    #[arg(long)]
    pub author: Option<String>,

    /// Replacement image file.
    #[arg(long, value_name = "PATH", value_hint = ValueHint::FilePath)]
    pub image: Option<PathBuf>,

    /// Set publication state.
    #[arg(long, value_name = "BOOL", value_parser = BoolishValueParser::new())]
    pub published: Option<bool>,
}

#[derive(Debug, Args, Clone)]
pub struct PostIdArgs {
    pub id: Uuid,
}

#[derive(Debug, Args, Clone)]
pub struct DeleteArgs {
    pub id: Uuid,

    /// Skip the confirmation prompt.
    #[arg(long, short = 'y', action = clap::ArgAction::SetTrue)]
    pub yes: bool,
}
