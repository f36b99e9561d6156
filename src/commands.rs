use std::net::SocketAddr;

use clap::{Args, Subcommand};

use crate::client::{ApiClient, PostDraft};
use crate::config::Config;
use crate::db;
use crate::db::models::ContentKind;
use crate::feed::render::{render_feed, render_filter_line, render_post};
use crate::feed::{self, FeedPost, FeedTab, FilterCache, NewFilter};
use crate::routes;
use crate::seed;
use crate::state::AppState;
use crate::store::{SqlitePostStore, SqliteUserStore};

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run the API server (the default)
    Serve,
    /// Insert sample users and posts into an empty database
    Seed,
    /// Print the feed fetched from the API
    Feed(FeedArgs),
    /// Manage saved feed filters
    #[command(subcommand)]
    Filters(FiltersCommand),
    /// Create, like or delete posts through the API
    #[command(subcommand)]
    Post(PostCommand),
}

#[derive(Args, Debug, Clone)]
pub struct FeedArgs {
    /// Which tab to show
    #[arg(long, value_enum, default_value_t = FeedTab::All)]
    pub tab: FeedTab,

    /// Filter id to apply; becomes the last-used filter
    #[arg(long, conflicts_with = "no_filter")]
    pub filter: Option<String>,

    /// Ignore the last-used filter for this run
    #[arg(long)]
    pub no_filter: bool,

    /// Maximum number of posts to fetch
    #[arg(long)]
    pub limit: Option<u32>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum FiltersCommand {
    /// List built-in and saved filters
    List,
    /// Save a new filter and make it active
    Create(CreateFilterArgs),
    /// Make an existing filter active
    Use { id: String },
    /// Forget the active filter
    Clear,
}

#[derive(Args, Debug, Clone)]
pub struct CreateFilterArgs {
    pub name: String,

    #[arg(long, default_value = "")]
    pub description: String,

    /// Caption keyword (repeatable, or comma-separated)
    #[arg(long = "keyword", value_delimiter = ',')]
    pub keywords: Vec<String>,

    #[arg(long = "tag", value_delimiter = ',')]
    pub tags: Vec<String>,

    #[arg(long = "location", value_delimiter = ',')]
    pub locations: Vec<String>,

    #[arg(long)]
    pub max_creators: Option<u32>,

    /// Allowed post kind (repeatable); all kinds when omitted
    #[arg(long = "kind", value_delimiter = ',')]
    pub kinds: Vec<ContentKind>,

    #[arg(long)]
    pub min_likes: Option<i64>,

    #[arg(long)]
    pub public: bool,
}

impl From<CreateFilterArgs> for NewFilter {
    fn from(args: CreateFilterArgs) -> Self {
        NewFilter {
            name: args.name,
            description: args.description,
            keywords: args.keywords,
            tags: args.tags,
            locations: args.locations,
            max_creators: args.max_creators,
            post_types: (!args.kinds.is_empty()).then_some(args.kinds),
            min_likes: args.min_likes,
            is_public: args.public,
        }
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum PostCommand {
    /// Publish a post
    Create(CreatePostArgs),
    /// Like a post, or take a like back with --unlike
    Like {
        id: i64,
        #[arg(long)]
        unlike: bool,
    },
    /// Delete a post
    Delete { id: i64 },
}

#[derive(Args, Debug, Clone)]
pub struct CreatePostArgs {
    #[arg(long)]
    pub kind: ContentKind,

    /// Media URL for photo/video, body text for text posts
    #[arg(long)]
    pub content: String,

    #[arg(long)]
    pub caption: String,

    #[arg(long = "tag", value_delimiter = ',')]
    pub tags: Vec<String>,

    #[arg(long)]
    pub location: Option<String>,

    /// Log in first so the post is attributed to this account
    #[arg(long, requires = "password")]
    pub email: Option<String>,

    #[arg(long, requires = "email")]
    pub password: Option<String>,
}

pub async fn execute(command: Command, config: Config) -> anyhow::Result<()> {
    match command {
        Command::Serve => serve(config).await,
        Command::Seed => run_seed(config).await,
        Command::Feed(args) => show_feed(args, &config).await,
        Command::Filters(cmd) => manage_filters(cmd, &config),
        Command::Post(cmd) => manage_posts(cmd, &config).await,
    }
}

pub async fn serve(config: Config) -> anyhow::Result<()> {
    let pool = db::create_pool(&config.db_path())?;
    db::run_migrations(&pool)?;

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    let state = AppState::from_config(pool, config)?;
    let app = routes::router(state);

    tracing::info!("Listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn run_seed(config: Config) -> anyhow::Result<()> {
    let pool = db::create_pool(&config.db_path())?;
    db::run_migrations(&pool)?;

    let users = SqliteUserStore::new(pool.clone());
    let posts = SqlitePostStore::new(pool);
    let summary = seed::seed(&users, &posts, config.auth.bcrypt_cost).await?;

    println!(
        "Seeded {} users and {} posts (password: {})",
        summary.users_created,
        summary.posts_created,
        seed::SAMPLE_PASSWORD
    );
    Ok(())
}

async fn show_feed(args: FeedArgs, config: &Config) -> anyhow::Result<()> {
    let mut cache = FilterCache::open(config.filter_cache_path())?;
    let filter = match (&args.filter, args.no_filter) {
        (_, true) => None,
        (Some(id), false) => Some(cache.select(id)?),
        (None, false) => cache.active(),
    };

    let client = ApiClient::new(&config.client.api_url)?;
    let posts: Vec<FeedPost> = client
        .list_posts(args.limit)
        .await?
        .into_iter()
        .map(FeedPost::from)
        .collect();

    let visible = feed::apply(&posts, args.tab, filter.as_ref());
    tracing::debug!(fetched = posts.len(), shown = visible.len(), "Applied feed filter");
    print!("{}", render_feed(&visible, args.tab, filter.as_ref()));
    Ok(())
}

fn manage_filters(cmd: FiltersCommand, config: &Config) -> anyhow::Result<()> {
    let mut cache = FilterCache::open(config.filter_cache_path())?;

    match cmd {
        FiltersCommand::List => {
            let active = cache.last_used().map(str::to_string);
            for filter in cache.all_filters() {
                let is_active = active.as_deref() == Some(filter.id.as_str());
                println!("{}", render_filter_line(&filter, is_active));
            }
        }
        FiltersCommand::Create(args) => {
            let filter = NewFilter::from(args).build()?;
            let saved = cache.save(filter)?;
            println!("Saved filter {} ({}) and made it active", saved.id, saved.name);
        }
        FiltersCommand::Use { id } => {
            let filter = cache.select(&id)?;
            println!("Active filter: {}", filter.name);
        }
        FiltersCommand::Clear => {
            cache.clear_active()?;
            println!("No active filter");
        }
    }
    Ok(())
}

async fn manage_posts(cmd: PostCommand, config: &Config) -> anyhow::Result<()> {
    let mut client = ApiClient::new(&config.client.api_url)?;

    match cmd {
        PostCommand::Create(args) => {
            if let (Some(email), Some(password)) = (&args.email, &args.password) {
                let user = client.login(email, password).await?;
                tracing::info!(username = %user.username, "Logged in");
            }
            let draft = PostDraft {
                content_type: args.kind,
                content: args.content,
                caption: args.caption,
                filter_tags: feed::filter::clean_entries(args.tags),
                location: args.location,
            };
            let post = client.create_post(&draft).await?;
            println!("{}", render_post(&post.into()));
        }
        PostCommand::Like { id, unlike } => {
            let post = client.toggle_like(id, !unlike).await?;
            println!("Post {} now has {} likes", post.id, post.likes);
        }
        PostCommand::Delete { id } => {
            println!("{}", client.delete_post(id).await?);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Cli;
    use clap::Parser;

    fn parse(args: &[&str]) -> Command {
        let mut argv = vec!["storyfeed"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap().command.unwrap()
    }

    #[test]
    fn no_subcommand_is_allowed() {
        let cli = Cli::try_parse_from(["storyfeed"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn feed_defaults_to_all_tab() {
        match parse(&["feed"]) {
            Command::Feed(args) => {
                assert_eq!(args.tab, FeedTab::All);
                assert!(args.filter.is_none());
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn feed_filter_and_no_filter_conflict() {
        let res = Cli::try_parse_from(["storyfeed", "feed", "--filter", "tech", "--no-filter"]);
        assert!(res.is_err());
    }

    #[test]
    fn filter_create_parses_lists_and_kinds() {
        let cmd = parse(&[
            "filters", "create", "Dev", "--keyword", "rust,go", "--kind", "text", "--kind",
            "video", "--min-likes", "10",
        ]);
        let Command::Filters(FiltersCommand::Create(args)) = cmd else {
            panic!("expected filters create");
        };
        let filter = NewFilter::from(args).build().unwrap();
        assert_eq!(filter.keywords, ["rust", "go"]);
        assert_eq!(filter.post_types, [ContentKind::Text, ContentKind::Video]);
        assert_eq!(filter.min_likes, Some(10));
    }

    #[test]
    fn post_like_parses_unlike_flag() {
        match parse(&["post", "like", "7", "--unlike"]) {
            Command::Post(PostCommand::Like { id, unlike }) => {
                assert_eq!(id, 7);
                assert!(unlike);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn post_create_email_requires_password() {
        let res = Cli::try_parse_from([
            "storyfeed", "post", "create", "--kind", "text", "--content", "hi", "--caption",
            "hello", "--email", "a@b.com",
        ]);
        assert!(res.is_err());
    }
}
