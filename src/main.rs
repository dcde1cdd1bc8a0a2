use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Parser;
use skinkit_config::SkinConfig;
use skinkit_core::{
    Environment, FileStore, Hook, HttpOptionsApi, IntersectionEntry, Key, LocalStore,
    MemoryStore, OptionsApi, PageContext, PreferenceStore, PreferenceWriter, Skin,
};
use skinkit_dom::Document;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "skinkit")]
#[command(about = "Replay an interaction session against server-rendered skin markup")]
#[command(version)]
struct Cli {
    /// Page markup to enhance
    page: PathBuf,

    /// Actions applied in order: click:<id>, key:<id>, scroll:<top>,
    /// resize:<width>, hook:<editor-activate|editor-deactivate|post-edit>,
    /// toggle:<feature>, pref:<feature>=<value>
    actions: Vec<Action>,

    /// Configuration file (defaults to ./skinkit.toml when present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Persist preferences remotely instead of in the local store
    #[arg(long)]
    registered: bool,

    /// Pretend intersection observation is unavailable
    #[arg(long)]
    no_observer: bool,

    /// Page action, as reported by the server
    #[arg(long, default_value = "view")]
    action: String,

    /// Page namespace number
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    namespace: i32,

    /// JSON file standing in for browser local storage
    #[arg(long)]
    store: Option<PathBuf>,
}

#[derive(Debug, Clone)]
enum Action {
    Click(String),
    Key(String),
    Scroll(f64),
    Resize(u32),
    Hook(HookName),
    Toggle(String),
    Pref { feature: String, value: String },
}

#[derive(Debug, Clone, Copy)]
enum HookName {
    EditorActivate,
    EditorDeactivate,
    PostEdit,
}

impl FromStr for Action {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, arg) = s
            .split_once(':')
            .ok_or_else(|| format!("expected <kind>:<argument>, got `{s}`"))?;
        let action = match kind {
            "click" => Action::Click(arg.to_string()),
            "key" => Action::Key(arg.to_string()),
            "scroll" => Action::Scroll(arg.parse().map_err(|_| format!("bad offset `{arg}`"))?),
            "resize" => Action::Resize(arg.parse().map_err(|_| format!("bad width `{arg}`"))?),
            "hook" => Action::Hook(match arg {
                "editor-activate" => HookName::EditorActivate,
                "editor-deactivate" => HookName::EditorDeactivate,
                "post-edit" => HookName::PostEdit,
                other => return Err(format!("unknown hook `{other}`")),
            }),
            "toggle" => Action::Toggle(arg.to_string()),
            "pref" => {
                let (feature, value) = arg
                    .split_once('=')
                    .ok_or_else(|| format!("expected pref:<feature>=<value>, got `{s}`"))?;
                Action::Pref {
                    feature: feature.to_string(),
                    value: value.to_string(),
                }
            }
            other => return Err(format!("unknown action `{other}`")),
        };
        Ok(action)
    }
}

fn main() -> Result<()> {
    let _ = env_logger::try_init();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => {
            let mut config = SkinConfig::load_from_file(path)
                .with_context(|| format!("loading {}", path.display()))?;
            config.merge_with_env();
            config
        }
        None => SkinConfig::load(),
    };

    let html = std::fs::read_to_string(&cli.page)
        .with_context(|| format!("reading {}", cli.page.display()))?;
    let doc = Document::parse(&html);

    let local: Box<dyn LocalStore> = match &cli.store {
        Some(path) => Box::new(FileStore::open(path)),
        None => Box::new(MemoryStore::new()),
    };
    let local_key = config.preferences.local_key.clone();
    let prefs = if cli.registered {
        let debounce = Duration::from_millis(config.preferences.debounce_ms);
        let writer = match &config.preferences.options_endpoint {
            Some(endpoint) => PreferenceWriter::spawn(HttpOptionsApi::new(endpoint)?, debounce),
            None => PreferenceWriter::spawn(LogOptions, debounce),
        };
        PreferenceStore::registered(local, local_key, writer)
    } else {
        PreferenceStore::anonymous(local, local_key)
    };

    let page = PageContext {
        namespace: cli.namespace,
        action: cli.action.clone(),
    };
    let env = Environment {
        intersection_observer: !cli.no_observer,
    };
    let mut skin = Skin::init(doc, config, &page, env, prefs)?;
    report(&mut skin);

    for action in &cli.actions {
        info!(?action, "applying");
        apply(&mut skin, action)?;
        report(&mut skin);
    }

    skin.flush_preferences();
    println!("{}", skin.document().to_html());
    Ok(())
}

/// Remote stand-in used when no options endpoint is configured.
struct LogOptions;

impl OptionsApi for LogOptions {
    fn save_option(&self, name: &str, value: &str) -> Result<()> {
        info!(name, value, "save option");
        Ok(())
    }
}

fn element(skin: &Skin, id: &str) -> Result<skinkit_dom::ElementId> {
    match skin.document().get_element_by_id(id) {
        Some(el) => Ok(el),
        None => bail!("no element with id `{id}`"),
    }
}

fn apply(skin: &mut Skin, action: &Action) -> Result<()> {
    match action {
        Action::Click(id) => {
            let el = element(skin, id)?;
            let outcome = skin.click(el)?;
            info!(?outcome, "click");
        }
        Action::Key(id) => {
            let el = element(skin, id)?;
            let outcome = skin.activate_key(el, Key::Enter)?;
            info!(?outcome, "key");
        }
        Action::Scroll(top) => {
            let boundary = skin
                .sticky_header()
                .map(|sticky| sticky.boundary())
                .or_else(|| skin.document().get_element_by_id("firstHeading"));
            if let Some(target) = boundary {
                skin.intersect(&[IntersectionEntry {
                    target,
                    is_intersecting: *top >= 0.0,
                    top: *top,
                }]);
            }
            skin.scroll_to(-*top);
        }
        Action::Resize(width) => skin.resize(*width)?,
        Action::Hook(name) => skin.hook(match name {
            HookName::EditorActivate => Hook::EditorActivated,
            HookName::EditorDeactivate => Hook::EditorDeactivated,
            HookName::PostEdit => Hook::PostEdit,
        })?,
        Action::Toggle(feature) => {
            let enabled = skin.toggle_feature(feature)?;
            info!(%feature, enabled, "toggled");
        }
        Action::Pref { feature, value } => skin.select_client_pref(feature, value)?,
    }
    Ok(())
}

fn report(skin: &mut Skin) {
    for event in skin.take_events() {
        info!(?event, "event");
    }
}
