use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use thiserror::Error;
use tracing::{debug, info};

use crate::{
    rules::{RuleDocument, RuleSet},
    util::Counted,
};

/// Default injected arguments shipped with the binary.
static BUILTIN_TESTS: &str = include_str!("../data/aws/builtin_tests.yaml");

#[derive(Error, Debug)]
pub enum RuleLoadError {
    #[error("Failed to load builtin test rules")]
    BuiltinLoadError,

    #[error("Failed to read custom tests file `{0}`")]
    FileReadError(PathBuf),

    #[error("Failed to parse custom tests file `{0}`")]
    FileParseError(PathBuf),
}

/// Loads and merges rule sources. The builtin set applies first; each
/// additional file applies on top of everything before it, so later files
/// win for identical patterns.
pub struct RuleLoader {
    load_builtins: bool,
    additional_load_paths: Vec<PathBuf>,
}

impl RuleLoader {
    pub fn new() -> Self {
        Self { load_builtins: true, additional_load_paths: Vec::new() }
    }

    pub fn load_builtins(mut self, load_builtins: bool) -> Self {
        self.load_builtins = load_builtins;
        self
    }

    pub fn additional_rule_load_paths<P: AsRef<Path>, I: IntoIterator<Item = P>>(
        mut self,
        paths: I,
    ) -> Self {
        self.additional_load_paths.extend(paths.into_iter().map(|p| p.as_ref().to_owned()));
        self
    }

    pub fn load(&self) -> Result<RuleSet> {
        let mut set = RuleSet::default();

        if self.load_builtins {
            let document: RuleDocument =
                serde_yaml::from_str(BUILTIN_TESTS).context(RuleLoadError::BuiltinLoadError)?;
            set.merge(document);
            debug!("Loaded {} from builtins", Counted::regular(set.num_rules(), "test rule"));
        }

        for path in &self.additional_load_paths {
            let text = std::fs::read_to_string(path)
                .with_context(|| RuleLoadError::FileReadError(path.clone()))?;
            let document: RuleDocument = serde_yaml::from_str(&text)
                .with_context(|| RuleLoadError::FileParseError(path.clone()))?;
            set.merge(document);
            debug!("Merged custom tests from {}", path.display());
        }

        info!(
            "Loaded {} across {}",
            Counted::regular(set.num_rules(), "test rule"),
            Counted::regular(set.num_services(), "service")
        );
        Ok(set)
    }
}

impl Default for RuleLoader {
    fn default() -> Self {
        Self::new()
    }
}
