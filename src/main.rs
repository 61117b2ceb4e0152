use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinSet;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use tubemagic::api::{EnvKeySelector, GeminiClient, RemoteGenerationClient};
use tubemagic::chat::{ChatController, GREETING};
use tubemagic::project::{FileStorage, Project, ProjectStore};
use tubemagic::{AssetLifecycleController, Config, ImageSize, MediaDir, Scene};

#[derive(Parser, Debug)]
#[command(name = "tubemagic")]
#[command(about = "AI YouTube automation: script, SEO and per-scene visuals from one prompt", long_about = None)]
struct Args {
    /// Gemini API key (overrides GEMINI_API_KEY and the stored key)
    #[arg(long, global = true)]
    api_key: Option<String>,

    /// Directory holding history and generated media
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a new production package from one prompt
    Generate {
        /// Prompt text
        #[arg(short, long)]
        text: Option<String>,

        /// Read the prompt from a file
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Generate images for scenes of a project
    Image {
        /// Scene id, e.g. scene-0 (repeatable)
        #[arg(short, long = "scene", required = true)]
        scenes: Vec<String>,

        /// Resolution tier
        #[arg(long, value_enum, default_value_t = ImageSize::Standard)]
        size: ImageSize,

        /// Project id (defaults to the most recent project)
        #[arg(short, long)]
        project: Option<String>,
    },

    /// Generate videos for scenes of a project
    Video {
        /// Scene id, e.g. scene-0 (repeatable)
        #[arg(short, long = "scene", required = true)]
        scenes: Vec<String>,

        /// Project id (defaults to the most recent project)
        #[arg(short, long)]
        project: Option<String>,
    },

    /// Print a project
    Show {
        #[arg(short, long)]
        project: Option<String>,
    },

    /// List the project library
    History {
        /// Remove every saved project
        #[arg(long)]
        clear: bool,
    },

    /// Move a project to the top of the library
    Select { project: String },

    /// Talk to the TubeMagic assistant
    Chat {
        /// Send a single message instead of starting a session
        #[arg(short, long)]
        message: Option<String>,
    },

    /// Show or change settings
    Config {
        #[arg(long)]
        set_api_key: Option<String>,

        #[arg(long)]
        show: bool,
    },
}

struct App {
    client: Arc<dyn RemoteGenerationClient>,
    store: Arc<ProjectStore>,
    assets: Arc<AssetLifecycleController>,
}

impl App {
    fn build(config: &Config, api_key: Option<String>) -> anyhow::Result<Self> {
        let data_dir = config.data_dir()?;
        let credentials = Arc::new(EnvKeySelector::new(api_key.as_deref()));
        let client: Arc<dyn RemoteGenerationClient> = Arc::new(
            GeminiClient::new(config.gemini(api_key.unwrap_or_default()))
                .context("Failed to create HTTP client")?,
        );

        let store = Arc::new(ProjectStore::open(
            client.clone(),
            Box::new(FileStorage::new(&data_dir)),
            config.history_limit,
        ));
        let assets = Arc::new(AssetLifecycleController::new(
            client.clone(),
            store.clone(),
            credentials,
            MediaDir::new(config.media_dir()?),
            config.poll_policy(),
        ));

        Ok(Self {
            client,
            store,
            assets,
        })
    }

    /// Make `project_id` (or the most recent project) current.
    fn open_project(&self, project_id: Option<&str>) -> anyhow::Result<Project> {
        let id = match project_id {
            Some(id) => id.to_string(),
            None => self
                .store
                .history()
                .first()
                .map(|p| p.id.clone())
                .context("No projects yet. Run `tubemagic generate --text ...` first")?,
        };
        Ok(self.store.select(&id)?)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_thread_ids(false)
        .with_level(true)
        .init();

    dotenvy::dotenv().ok();

    let args = Args::parse();

    if let Err(e) = run(args).await {
        error!("{:#}", e);
        std::process::exit(1);
    }
    Ok(())
}

async fn run(args: Args) -> anyhow::Result<()> {
    let mut config = Config::load()?;
    if let Some(dir) = args.data_dir {
        config.data_dir = Some(dir);
    }
    let api_key = args.api_key.or_else(|| config.get_api_key());

    match args.command {
        Command::Config { set_api_key, show } => {
            if let Some(key) = set_api_key {
                config.set_api_key(key)?;
                println!("✔ API key saved");
            }
            if show {
                println!("Settings:");
                println!("  text model:    {}", config.text_model);
                println!("  image model:   {}", config.image_model);
                println!("  video model:   {}", config.video_model);
                println!("  poll:          every {}s, up to {} times", config.poll_interval_secs, config.max_poll_attempts);
                println!("  history limit: {}", config.history_limit);
                println!("  data dir:      {}", config.data_dir()?.display());
                println!("  API key:       {}", if api_key.is_some() { "set" } else { "not set" });
            }
        }

        Command::Generate { text, file } => {
            let prompt = if let Some(text) = text {
                text
            } else if let Some(path) = file {
                tokio::fs::read_to_string(&path)
                    .await
                    .with_context(|| format!("Failed to read file: {}", path.display()))?
            } else {
                anyhow::bail!("Either --text or --file must be provided");
            };

            let app = App::build(&config, api_key)?;
            info!("Input prompt length: {} characters", prompt.len());
            match app.store.create_project(&prompt).await {
                Ok(project) => print_project(&project),
                Err(e) => {
                    error!("{}", e);
                    anyhow::bail!(e.user_message());
                }
            }
        }

        Command::Image {
            scenes,
            size,
            project,
        } => {
            let app = App::build(&config, api_key)?;
            app.open_project(project.as_deref())?;

            let mut tasks = JoinSet::new();
            for scene_id in scenes {
                let assets = app.assets.clone();
                tasks.spawn(async move {
                    let result = assets.request_image(&scene_id, size).await;
                    (scene_id, result)
                });
            }
            report(&mut tasks).await?;
        }

        Command::Video { scenes, project } => {
            let app = App::build(&config, api_key)?;
            app.open_project(project.as_deref())?;

            let mut tasks = JoinSet::new();
            for scene_id in scenes {
                let assets = app.assets.clone();
                tasks.spawn(async move {
                    let result = assets.request_video(&scene_id).await;
                    (scene_id, result)
                });
            }
            report(&mut tasks).await?;
        }

        Command::Show { project } => {
            let app = App::build(&config, api_key)?;
            print_project(&app.open_project(project.as_deref())?);
        }

        Command::History { clear } => {
            let app = App::build(&config, api_key)?;
            if clear {
                app.store.clear_history()?;
                println!("✔ Project library cleared");
                return Ok(());
            }

            let history = app.store.history();
            if history.is_empty() {
                println!("Project library is empty");
            }
            for project in history {
                println!(
                    "{}  {}  {}",
                    project.id,
                    project.timestamp.format("%Y-%m-%d"),
                    if project.youtube_title.is_empty() { "Untitled" } else { project.youtube_title.as_str() }
                );
            }
        }

        Command::Select { project } => {
            let app = App::build(&config, api_key)?;
            let selected = app.open_project(Some(project.as_str()))?;
            app.store.save_to_history(&selected)?;
            println!("✔ Selected {}", selected.youtube_title);
        }

        Command::Chat { message } => {
            let app = App::build(&config, api_key)?;
            let mut chat = ChatController::new(app.client.clone());

            if let Some(message) = message {
                let reply = chat.send(&message).await;
                print_last_reply(&chat);
                reply?;
                return Ok(());
            }

            println!("{}", GREETING);
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            while let Some(line) = lines.next_line().await? {
                let line = line.trim();
                if line == "exit" || line == "quit" {
                    break;
                }
                if line.is_empty() {
                    continue;
                }
                // a failed turn leaves the apology in the transcript
                if let Err(e) = chat.send(line).await {
                    warn!("Chat turn failed: {}", e);
                }
                print_last_reply(&chat);
            }
        }
    }

    Ok(())
}

async fn report(
    tasks: &mut JoinSet<(String, Result<Scene, tubemagic::AssetError>)>,
) -> anyhow::Result<()> {
    let mut failed = 0;
    while let Some(joined) = tasks.join_next().await {
        let (scene_id, result) = joined?;
        match result {
            Ok(scene) => match (scene.image_url(), scene.video_url()) {
                (Some(url), _) => println!("✔ {} image ready ({} bytes of data URI)", scene_id, url.len()),
                (_, Some(path)) => println!("✔ {} video saved: {}", scene_id, path),
                _ => println!("✔ {} done", scene_id),
            },
            Err(e) => {
                failed += 1;
                println!("✘ {}: {}", scene_id, e);
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("{} scene request(s) failed", failed);
    }
    Ok(())
}

fn print_last_reply(chat: &ChatController) {
    if let Some(last) = chat.transcript().last() {
        println!("assistant> {}", last.text);
    }
}

fn print_project(project: &Project) {
    println!("\n🎬 {}", project.youtube_title);
    println!("   id: {}  created: {}", project.id, project.timestamp.format("%Y-%m-%d %H:%M"));
    println!("\n── Master Script ──\n{}", project.script);
    println!("\n── Voice-Over ──");
    for line in project.voice_over_lines() {
        println!("  🎙 {}", line);
    }
    println!("\n── SEO ──");
    println!("  Thumbnail: {}", project.thumbnail_text);
    println!("  Tags:      {}", project.tags.join(", "));
    println!("  Hashtags:  {}", project.hashtags.join(" "));
    println!("  Music:     {}", project.music_style);
    println!("\n── Scenes ({}) ──", project.scenes.len());
    for scene in &project.scenes {
        let media = match (scene.image_url(), scene.video_url()) {
            (Some(_), _) => "image".to_string(),
            (_, Some(path)) => format!("video {}", path),
            _ => "no media".to_string(),
        };
        println!("  [{}] {} ({})", scene.id, scene.text, media);
    }
}
