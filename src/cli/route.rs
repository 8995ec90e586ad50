//! CLI route: single route table and run context. Dispatches to domain services and presentation.

use crate::annotate::{Annotation, Annotator, SourceFile};
use crate::cli::output::map_error;
use crate::cli::parse::{CacheCommands, Commands};
use crate::cli::presentation::{format_file_list, format_stats, format_status, StatusReport};
use crate::config::{ConfigLoader, MarginConfig};
use crate::error::ApiError;
use crate::generation::CommentaryGenerator;
use crate::level::AbstractionLevel;
use crate::provider::profile::provider_type_slug;
use crate::provider::ProviderFactory;
use crate::render;
use crate::store::CommentStore;
use crate::watch::{WatchConfig, WatchSession};
use crate::workspace::{detect_workspace_root, resolve_input_path};
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Runtime context for CLI execution: workspace, merged config, output style.
pub struct RunContext {
    workspace_root: PathBuf,
    cwd: PathBuf,
    config: MarginConfig,
    config_files: Vec<PathBuf>,
    color: bool,
}

impl RunContext {
    /// Resolve the workspace root and load configuration for it.
    pub fn new(workspace: PathBuf, config_path: Option<PathBuf>) -> Result<Self, ApiError> {
        let cwd = std::env::current_dir()
            .map_err(|e| ApiError::ConfigError(format!("Cannot read current directory: {}", e)))?;
        let workspace_root = detect_workspace_root(&resolve_input_path(&cwd, &workspace));

        let (config, config_files) = match config_path {
            Some(path) => {
                let path = resolve_input_path(&cwd, &path);
                (ConfigLoader::load_from_file(&path)?, vec![path])
            }
            None => {
                let files = ConfigLoader::global_config_path()
                    .into_iter()
                    .chain(std::iter::once(ConfigLoader::workspace_config_path(
                        &workspace_root,
                    )))
                    .filter(|p| p.is_file())
                    .collect();
                (ConfigLoader::load(&workspace_root)?, files)
            }
        };

        config.validate().map_err(|errors| {
            let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            ApiError::ConfigError(format!(
                "Configuration validation failed:\n{}",
                messages.join("\n")
            ))
        })?;

        debug!(workspace = %workspace_root.display(), "Run context ready");
        Ok(Self {
            workspace_root,
            cwd,
            config,
            config_files,
            color: std::io::stdout().is_terminal() && std::env::var_os("NO_COLOR").is_none(),
        })
    }

    pub fn workspace_root(&self) -> &Path {
        &self.workspace_root
    }

    pub fn config(&self) -> &MarginConfig {
        &self.config
    }

    /// Execute a CLI command via the single route table.
    pub fn execute(&self, command: &Commands) -> Result<String, ApiError> {
        match command {
            Commands::Hello => Ok("Hello from margin! Run `margin annotate <file>` to get started.".to_string()),
            Commands::Status { format } => self.handle_status(format),
            Commands::Show { file } => {
                let path = self.resolve(file);
                let source = SourceFile::read(&path)?;
                Ok(render::render_raw(
                    &format!("{} ({})", self.display_path(&path), source.language.tag()),
                    &source.content,
                    self.color,
                ))
            }
            Commands::Annotate {
                file,
                level,
                force,
                format,
            } => self.handle_annotate(file, *level, *force, format),
            Commands::Level {
                file,
                level,
                format,
            } => self.handle_annotate(file, *level, false, format),
            Commands::Cache { command } => self.handle_cache_command(command),
            Commands::Watch {
                file,
                level,
                debounce_ms,
            } => self.handle_watch(file, *level, *debounce_ms),
        }
    }

    fn handle_status(&self, format: &str) -> Result<String, ApiError> {
        let store = self.open_store();
        let provider = &self.config.provider;
        let report = StatusReport {
            workspace_root: self.workspace_root.clone(),
            store_path: store.path().to_path_buf(),
            provider: provider_type_slug(provider.provider_type).to_string(),
            model: provider.model.clone(),
            api_key: provider.api_key_status(),
            config_files: self.config_files.clone(),
            stats: store.stats(),
        };
        format_status(&report, format, self.color)
    }

    fn handle_annotate(
        &self,
        file: &Path,
        level: u8,
        force: bool,
        format: &str,
    ) -> Result<String, ApiError> {
        let level = AbstractionLevel::try_from(level)?;
        let path = self.resolve(file);
        // Fail on bad input before building a provider client.
        SourceFile::read(&path)?;

        let mut annotator = self.annotator();
        let runtime = build_runtime()?;
        let annotation = runtime.block_on(annotator.annotate(&path, level, force))?;
        self.render(&annotation, format)
    }

    fn handle_cache_command(&self, command: &CacheCommands) -> Result<String, ApiError> {
        let mut store = self.open_store();
        match command {
            CacheCommands::List { format } => format_file_list(&store.list_stored_files(), format),
            CacheCommands::Stats { format } => format_stats(&store.stats(), format),
            CacheCommands::Remove { file, level } => {
                let path = self.resolve(file);
                let key = store.key_for(&path);
                match level {
                    Some(level) => {
                        let level = AbstractionLevel::try_from(*level)?;
                        if store.get_entry(&path, level).is_none() {
                            return Ok(format!("No cached level {} commentary for {}", level, key));
                        }
                        store.remove_entry(&path, level);
                        Ok(format!("Removed level {} commentary for {}", level, key))
                    }
                    None => {
                        if !store.document().entries.contains_key(&key) {
                            return Ok(format!("No cached commentary for {}", key));
                        }
                        store.remove_file(&path);
                        Ok(format!("Removed all cached commentary for {}", key))
                    }
                }
            }
            CacheCommands::Clear => {
                let files = store.stats().total_files;
                store.clear();
                Ok(format!("Cleared cached commentary for {} file(s)", files))
            }
            CacheCommands::Prune => {
                let removed = store.prune_missing_files();
                Ok(format!("Pruned {} missing file(s)", removed))
            }
        }
    }

    fn handle_watch(
        &self,
        file: &Path,
        level: u8,
        debounce_ms: Option<u64>,
    ) -> Result<String, ApiError> {
        let level = AbstractionLevel::try_from(level)?;
        let path = self.resolve(file);
        SourceFile::read(&path)?;

        let debounce_ms = debounce_ms.unwrap_or(self.config.watch.debounce_ms);
        if debounce_ms == 0 {
            return Err(ApiError::ConfigError(
                "--debounce-ms must be greater than zero".to_string(),
            ));
        }

        let mut annotator = self.annotator();
        let runtime = build_runtime()?;
        self.refresh(&runtime, &mut annotator, &path, level);

        let mut session = WatchSession::new(&path, WatchConfig { debounce_ms });
        eprintln!(
            "Watching {} (Ctrl-C to stop)",
            self.display_path(session.target())
        );
        session.run(|changed| self.refresh(&runtime, &mut annotator, changed, level))?;
        Ok(String::new())
    }

    /// One watch iteration: annotate (cache-first) and print. Failures are
    /// reported and the watch goes on.
    fn refresh(
        &self,
        runtime: &tokio::runtime::Runtime,
        annotator: &mut Annotator,
        path: &Path,
        level: AbstractionLevel,
    ) {
        match runtime.block_on(annotator.annotate(path, level, false)) {
            Ok(annotation) => match self.render(&annotation, "text") {
                Ok(out) => println!("{}\n", out),
                Err(e) => eprintln!("{}", map_error(&e)),
            },
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Watch refresh failed");
                eprintln!("{}", map_error(&e));
            }
        }
    }

    fn render(&self, annotation: &Annotation, format: &str) -> Result<String, ApiError> {
        let source = std::fs::read_to_string(&annotation.path)
            .map_err(|_| ApiError::MissingInput(annotation.path.clone()))?;
        let mut shown = annotation.clone();
        shown.path = PathBuf::from(self.display_path(&annotation.path));
        if format == "json" {
            render::render_annotation_json(&shown, &source)
        } else {
            Ok(render::render_annotation(&shown, &source, self.color))
        }
    }

    fn annotator(&self) -> Annotator {
        let store = self.open_store();
        match ProviderFactory::from_config(&self.config.provider) {
            Ok(client) => {
                info!(
                    provider = client.provider_name(),
                    model = client.model_name(),
                    "Provider ready"
                );
                let generator =
                    CommentaryGenerator::new(client, self.config.provider.default_options.clone());
                Annotator::new(store, generator)
            }
            Err(e) => {
                debug!(error = %e, "Provider unavailable; serving cached commentary only");
                let reason = match e {
                    ApiError::ProviderNotConfigured(reason) => reason,
                    other => other.to_string(),
                };
                Annotator::cache_only(store, reason)
            }
        }
    }

    fn open_store(&self) -> CommentStore {
        CommentStore::open_with_file_name(&self.workspace_root, &self.config.store.file_name)
    }

    fn resolve(&self, file: &Path) -> PathBuf {
        resolve_input_path(&self.cwd, file)
    }

    /// Workspace-relative form of `path` for display, when it lies inside.
    fn display_path(&self, path: &Path) -> String {
        path.strip_prefix(&self.workspace_root)
            .unwrap_or(path)
            .display()
            .to_string()
    }
}

fn build_runtime() -> Result<tokio::runtime::Runtime, ApiError> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| ApiError::ProviderError(format!("Failed to start async runtime: {}", e)))
}
