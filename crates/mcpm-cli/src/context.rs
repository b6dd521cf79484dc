//! Per-invocation state
//!
//! Loads [`Settings`] once and decides whether this run may prompt: only
//! when not disabled by a flag and stdin is a terminal.

use std::io::IsTerminal;

use mcpm_core::{InputMode, PackageManager, Settings};
use mcpm_registry::RegistryClient;

use crate::error::Result;
use crate::interactive::TerminalPrompter;

pub struct Context {
    pub manager: PackageManager,
    interactive: bool,
}

impl Context {
    pub fn load(non_interactive: bool) -> Result<Self> {
        let settings = Settings::load()?;
        tracing::debug!(
            home = %settings.home.display(),
            registry = %settings.registry_url,
            secrets = ?settings.secret_backend,
            "loaded settings"
        );
        Ok(Self {
            manager: PackageManager::from_settings(settings),
            interactive: can_prompt(non_interactive),
        })
    }

    pub fn settings(&self) -> &Settings {
        self.manager.settings()
    }

    pub fn is_interactive(&self) -> bool {
        self.interactive
    }

    pub fn registry(&self) -> Result<RegistryClient> {
        Ok(RegistryClient::new(&self.settings().registry_url)?)
    }

    /// Prompt through `prompter` when interactive.
    pub fn input_mode<'a>(&self, prompter: &'a mut TerminalPrompter) -> InputMode<'a> {
        if self.interactive {
            InputMode::Interactive(prompter)
        } else {
            InputMode::NonInteractive
        }
    }
}

/// Whether prompts can be shown at all.
pub fn can_prompt(non_interactive: bool) -> bool {
    !non_interactive && std::io::stdin().is_terminal()
}
