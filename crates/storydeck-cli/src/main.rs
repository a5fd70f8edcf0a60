use std::env;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::bail;
use anyhow::Context;
use clap::Parser;
use clap::Subcommand;
use tracing_subscriber::EnvFilter;

use storydeck_api::HttpAdapter;
use storydeck_api::SortDirection;
use storydeck_api::StoryApi;
use storydeck_api::StoryQuery;
use storydeck_api::StorySort;
use storydeck_api::StoryTemplate;
use storydeck_core::Config;
use storydeck_core::NormalizedStory;
use storydeck_core::PassthroughMigration;
use storydeck_core::StoryId;
use storydeck_core::StoryListState;
use storydeck_core::StoryStatus;

#[derive(Debug, Parser)]
#[command(name = "storydeck", version, about = "Story dashboard from the terminal")]
struct Cli {
    /// Path to a config file; defaults to ~/.config/storydeck/config.toml.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List stories.
    List {
        /// Statuses to include, comma separated (publish,draft,future,private,pending).
        #[arg(long, value_delimiter = ',')]
        status: Vec<String>,
        /// Free-text search term.
        #[arg(long)]
        search: Option<String>,
        /// Sort field: date, modified, title or author.
        #[arg(long, default_value = "modified")]
        orderby: String,
        /// Sort direction: asc or desc.
        #[arg(long, default_value = "desc")]
        order: String,
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = 24)]
        per_page: u32,
        /// Use the widget envelope endpoint instead of the dashboard one.
        #[arg(long)]
        widget: bool,
    },
    /// Move a story to the trash.
    Trash { id: u64 },
    /// Create a draft copy of a story.
    Duplicate { id: u64 },
    /// Create a draft story from a template file and print the editor URL.
    FromTemplate { file: PathBuf },
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    let adapter = match (&config.auth.username, &config.auth.application_password) {
        (Some(user), Some(password)) => HttpAdapter::with_basic_auth(user, password),
        _ => HttpAdapter::new(),
    };
    let api = StoryApi::new(adapter, config, Arc::new(PassthroughMigration));

    match cli.command {
        Command::List {
            status,
            search,
            orderby,
            order,
            page,
            per_page,
            widget,
        } => {
            let query = build_query(&status, search, &orderby, &order, page, per_page)?;
            if widget {
                api.fetch_stories_for_widget(&query).await;
            } else {
                api.fetch_stories(&query).await;
            }
            let state = api.state();
            check(&state)?;
            print_listing(&state);
        }
        Command::Trash { id } => {
            let story = find_story(&api, id).await?;
            api.trash_story(&story).await;
            check(&api.state())?;
            println!("trashed story {id}");
        }
        Command::Duplicate { id } => {
            let story = find_story(&api, id).await?;
            api.duplicate_story(&story).await;
            let state = api.state();
            check(&state)?;
            if let Some(copy_id) = state.stories_order.first() {
                println!("created copy {copy_id}");
            }
        }
        Command::FromTemplate { file } => {
            let raw = fs::read_to_string(&file)
                .with_context(|| format!("reading template {}", file.display()))?;
            let template: StoryTemplate =
                serde_json::from_str(&raw).context("parsing template file")?;
            let intent = api.create_story_from_template(&template).await;
            check(&api.state())?;
            match intent {
                Some(intent) => println!("{}", intent.url),
                None => bail!("story creation did not return an editor link"),
            }
        }
    }

    Ok(())
}

fn build_query(
    status: &[String],
    search: Option<String>,
    orderby: &str,
    order: &str,
    page: u32,
    per_page: u32,
) -> anyhow::Result<StoryQuery> {
    let mut query = StoryQuery {
        search_term: search.filter(|s| !s.is_empty()),
        page,
        per_page,
        ..StoryQuery::default()
    };

    if !status.is_empty() {
        query.status = status
            .iter()
            .map(|name| {
                StoryStatus::parse(name)
                    .with_context(|| format!("unknown status {name:?}"))
            })
            .collect::<anyhow::Result<_>>()?;
    }

    query.sort_option = match orderby {
        "date" => StorySort::Date,
        "modified" => StorySort::Modified,
        "title" => StorySort::Title,
        "author" => StorySort::Author,
        other => bail!("unknown sort field {other:?}"),
    };
    query.sort_direction = match order {
        "asc" => SortDirection::Asc,
        "desc" => SortDirection::Desc,
        other => bail!("unknown sort direction {other:?}"),
    };

    Ok(query)
}

async fn find_story(
    api: &StoryApi<HttpAdapter>,
    id: u64,
) -> anyhow::Result<NormalizedStory> {
    let query = StoryQuery {
        per_page: 100,
        ..StoryQuery::default()
    };
    api.fetch_stories(&query).await;
    let state = api.state();
    check(&state)?;
    match state.stories.get(&StoryId(id)) {
        Some(story) => Ok(story.clone()),
        None => bail!("story {id} not found in the first {} stories", query.per_page),
    }
}

fn check(state: &StoryListState) -> anyhow::Result<()> {
    if let Some(err) = &state.error {
        bail!("{}: {}", err.message.title, err.message.body);
    }
    Ok(())
}

fn print_listing(state: &StoryListState) {
    println!("{:>8}  {:<8}  {:<16}  {}", "ID", "STATUS", "MODIFIED", "TITLE");
    for story in state.ordered_stories() {
        let modified = story
            .modified
            .map(|at| at.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:>8}  {:<8}  {:<16}  {}",
            story.id, story.status.as_str(), modified, story.title
        );
    }
    if let Some(total_pages) = state.total_pages {
        tracing::info!(
            shown = state.stories_order.len(),
            total_pages,
            "listing fetched"
        );
    }
}

fn load_config(path: Option<&std::path::Path>) -> anyhow::Result<Config> {
    let mut config = match config_file(path) {
        Some(file) if file.exists() => {
            let raw = fs::read_to_string(&file)
                .with_context(|| format!("reading config {}", file.display()))?;
            toml::from_str(&raw).with_context(|| format!("parsing config {}", file.display()))?
        }
        _ => Config::default(),
    };

    if let Ok(api) = env::var("STORYDECK_API") {
        config.api.story_api = api;
    }
    if let Ok(url) = env::var("STORYDECK_EDIT_URL") {
        config.api.edit_story_url = url;
    }
    if let Ok(user) = env::var("STORYDECK_USER") {
        config.auth.username = Some(user);
    }
    if let Ok(password) = env::var("STORYDECK_APP_PASSWORD") {
        config.auth.application_password = Some(password);
    }

    Ok(config)
}

fn config_file(path: Option<&std::path::Path>) -> Option<PathBuf> {
    match path {
        Some(path) => Some(path.to_path_buf()),
        None => dirs::config_dir().map(|dir| dir.join("storydeck").join("config.toml")),
    }
}
