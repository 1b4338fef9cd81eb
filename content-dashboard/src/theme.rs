use crate::types::{BoundaryError, PreferenceStore, Result};
use tracing::{debug, warn};

/// Preference key of the dark-mode flag.
pub const DARK_MODE_KEY: &str = "darkMode";

/// Dark-mode flag persisted as a JSON boolean.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ThemePreference {
    dark_mode: bool,
}

impl ThemePreference {
    pub fn is_dark(&self) -> bool {
        self.dark_mode
    }

    /// Read the saved flag. Missing or unreadable values mean light mode,
    /// and so does a store that cannot be read at all.
    pub fn load<P: PreferenceStore + ?Sized>(store: &P) -> Result<Self> {
        let dark_mode = match store.load(DARK_MODE_KEY) {
            Ok(None) => false,
            Ok(Some(raw)) => serde_json::from_str::<bool>(&raw).unwrap_or_else(|e| {
                warn!("Ignoring unreadable {} value {:?}: {}", DARK_MODE_KEY, raw, e);
                false
            }),
            Err(BoundaryError::Storage(message)) => {
                warn!("Ignoring unreadable preference store for {}: {}", DARK_MODE_KEY, message);
                false
            }
            Err(e) => return Err(e.into()),
        };
        Ok(Self { dark_mode })
    }

    pub fn set<P: PreferenceStore + ?Sized>(&mut self, store: &P, dark_mode: bool) -> Result<()> {
        store.save(DARK_MODE_KEY, &serde_json::to_string(&dark_mode)?)?;
        self.dark_mode = dark_mode;
        debug!("Dark mode {}", if dark_mode { "on" } else { "off" });
        Ok(())
    }

    /// Flip and persist. Returns the new value.
    pub fn toggle<P: PreferenceStore + ?Sized>(&mut self, store: &P) -> Result<bool> {
        let next = !self.dark_mode;
        self.set(store, next)?;
        Ok(next)
    }
}
