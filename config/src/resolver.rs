//! Collapse raw [`Settings`] into [`EffectiveSettings`].
//!
//! The two error-format flags are mutually exclusive. When both are set the
//! user is asked how to proceed every time settings are resolved; the answer
//! is never persisted.

use std::future::Future;

use ferrule_types::{EffectiveSettings, ErrorFormat, RUST_SRC_PATH, ToolEnvironment};
use tokio::sync::watch;

use crate::settings::Settings;

pub const CONFLICT_MESSAGE: &str = "useJsonErrors and useNewErrorFormat are both enabled. \
     The two error formats are mutually exclusive; JSON errors can be used for this session \
     or the settings can be updated.";

/// Answers offered when the error-format flags conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConflictChoice {
    /// Use JSON errors for now without touching the stored settings.
    Ignore,
    /// Open the settings so the user can fix them.
    UpdateSettings,
}

impl ConflictChoice {
    pub const ALL: [Self; 2] = [Self::Ignore, Self::UpdateSettings];

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Ignore => "Ignore",
            Self::UpdateSettings => "Update Settings",
        }
    }
}

/// User-facing side of conflict resolution.
pub trait ConflictPrompt: Send + Sync {
    /// Show `message` with `choices`. `None` means the prompt was dismissed.
    fn choose(
        &self,
        message: &str,
        choices: &[ConflictChoice],
    ) -> impl Future<Output = Option<ConflictChoice>> + Send;

    /// Bring up the settings for editing.
    fn open_settings(&self) -> impl Future<Output = ()> + Send;
}

/// Owns the current [`EffectiveSettings`] and publishes every change.
#[derive(Debug)]
pub struct ConfigurationResolver {
    env: ToolEnvironment,
    effective: watch::Sender<EffectiveSettings>,
}

impl ConfigurationResolver {
    #[must_use]
    pub fn new(env: ToolEnvironment) -> Self {
        let (effective, _) = watch::channel(EffectiveSettings::default());
        Self { env, effective }
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<EffectiveSettings> {
        self.effective.subscribe()
    }

    #[must_use]
    pub fn current(&self) -> EffectiveSettings {
        *self.effective.borrow()
    }

    #[must_use]
    pub fn environment(&self) -> &ToolEnvironment {
        &self.env
    }

    /// Resolve `settings`, prompting on an error-format conflict.
    ///
    /// Also exports `rustLangSrcPath` as `RUST_SRC_PATH` to the shared tool
    /// environment when it is set and differs from the current value.
    pub async fn resolve<P: ConflictPrompt>(
        &self,
        settings: &Settings,
        prompt: &P,
    ) -> EffectiveSettings {
        self.sync_environment(settings);

        let error_format = self.resolve_error_format(settings, prompt).await;
        let effective = EffectiveSettings {
            format_on_save: settings.format_on_save,
            check_on_save: settings.check_on_save,
            check_with: settings.check_with,
            error_format,
        };
        self.effective.send_replace(effective);
        tracing::debug!(
            format_on_save = effective.format_on_save,
            check_on_save = effective.check_on_save,
            check_with = effective.check_with.as_str(),
            error_format = effective.error_format.label(),
            "Resolved settings"
        );
        effective
    }

    async fn resolve_error_format<P: ConflictPrompt>(
        &self,
        settings: &Settings,
        prompt: &P,
    ) -> ErrorFormat {
        match (settings.use_json_errors, settings.use_new_error_format) {
            (false, _) => return ErrorFormat::Human,
            (true, false) => return ErrorFormat::Json,
            (true, true) => {}
        }

        let previous = self.current().error_format;
        tracing::warn!("useJsonErrors and useNewErrorFormat are both enabled");
        match prompt.choose(CONFLICT_MESSAGE, &ConflictChoice::ALL).await {
            Some(ConflictChoice::Ignore) => ErrorFormat::Json,
            Some(ConflictChoice::UpdateSettings) => {
                prompt.open_settings().await;
                previous
            }
            None => previous,
        }
    }

    fn sync_environment(&self, settings: &Settings) {
        let Some(path) = settings.rust_src_path() else {
            return;
        };
        if self.env.sync(RUST_SRC_PATH, &path) {
            tracing::info!(path = %path, "Exported {RUST_SRC_PATH}");
        }
    }
}
