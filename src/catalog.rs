//! Path catalog loaded from `paths.json`, plus the explicit page state and the
//! pure filter, sort and routing functions that operate on it.

use crate::config::{Config, ShellConfig};
use crate::details::{ExploitationSteps, Permissions, Prerequisites};
use crate::shell::{Mount, container_id, mount_visualization};
use crate::visualization::{Visualization, is_truthy};
use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

static DETAIL_ROUTE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^/paths/([a-z0-9-]+)$").unwrap());
static LEGACY_HASH_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^[a-z0-9]+-\d{3}$").unwrap());

/// One catalogued privilege-escalation technique.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathEntry {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub services: Vec<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub detection_tools: Option<BTreeMap<String, Value>>,
    #[serde(default)]
    pub permissions: Option<Permissions>,
    /// Older entries list required permissions under this key instead.
    #[serde(default, rename = "requiredPermissions")]
    legacy_required_permissions: Option<Permissions>,
    #[serde(default)]
    pub prerequisites: Option<Prerequisites>,
    #[serde(default)]
    pub limitations: Option<String>,
    #[serde(default)]
    pub exploitation_steps: Option<ExploitationSteps>,
    #[serde(default)]
    pub attack_visualization: Option<Visualization>,
}

impl PathEntry {
    fn has_detection(&self) -> bool {
        self.detection_tools.as_ref().is_some_and(|tools| !tools.is_empty())
    }

    /// Mounts this entry's diagram, or returns `None` when it has none.
    pub fn mount_visualization(&self, config: &Config, fullscreen: bool) -> Option<Mount> {
        let visualization = self.attack_visualization.as_ref()?;
        Some(mount_visualization(
            container_id(&self.id, fullscreen),
            visualization,
            config,
        ))
    }
}

pub fn parse_catalog(contents: &str) -> Result<Vec<PathEntry>> {
    let mut paths: Vec<PathEntry> =
        serde_json::from_str(contents).context("invalid paths catalog")?;
    for path in &mut paths {
        let legacy = path.legacy_required_permissions.take();
        path.permissions = path.permissions.take().or(legacy);
    }
    tracing::debug!(paths = paths.len(), "loaded path catalog");
    Ok(paths)
}

pub fn load_catalog(path: &Path) -> Result<Vec<PathEntry>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read catalog {}", path.display()))?;
    parse_catalog(&contents)
}

pub fn find_path<'a>(paths: &'a [PathEntry], id: &str) -> Option<&'a PathEntry> {
    paths.iter().find(|path| path.id == id)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetectionFilter {
    /// Paths no detection tool covers.
    Undetected,
    Tool(String),
}

impl DetectionFilter {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "" => None,
            "none" => Some(Self::Undetected),
            tool => Some(Self::Tool(tool.to_string())),
        }
    }

    fn matches(&self, path: &PathEntry) -> bool {
        match self {
            Self::Undetected => !path.has_detection(),
            Self::Tool(tool) => path
                .detection_tools
                .as_ref()
                .and_then(|tools| tools.get(tool))
                .is_some_and(is_truthy),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filters {
    pub search: String,
    pub category: Option<String>,
    pub service: Option<String>,
    pub detection: Option<DetectionFilter>,
}

impl Filters {
    pub fn matches(&self, path: &PathEntry) -> bool {
        let term = self.search.to_lowercase();
        let matches_search = term.is_empty()
            || path.name.to_lowercase().contains(&term)
            || path.description.to_lowercase().contains(&term)
            || path.id.to_lowercase().contains(&term)
            || path
                .services
                .iter()
                .any(|service| service.to_lowercase().contains(&term));
        let matches_category = self
            .category
            .as_ref()
            .is_none_or(|category| &path.category == category);
        let matches_service = self
            .service
            .as_ref()
            .is_none_or(|service| path.services.contains(service));
        let matches_detection = self
            .detection
            .as_ref()
            .is_none_or(|detection| detection.matches(path));
        matches_search && matches_category && matches_service && matches_detection
    }
}

pub fn apply_filters<'a>(paths: &'a [PathEntry], filters: &Filters) -> Vec<&'a PathEntry> {
    paths.iter().filter(|path| filters.matches(path)).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum SortColumn {
    Id,
    Name,
    Category,
}

impl SortColumn {
    fn key(self, path: &PathEntry) -> String {
        match self {
            Self::Id => path.id.to_lowercase(),
            Self::Name => path.name.to_lowercase(),
            Self::Category => path.category.to_lowercase(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortState {
    pub column: SortColumn,
    pub direction: SortDirection,
}

impl SortState {
    /// Clicking the active column flips direction; any other column starts ascending.
    pub fn toggle(current: Option<Self>, column: SortColumn) -> Self {
        match current {
            Some(state) if state.column == column => Self {
                column,
                direction: match state.direction {
                    SortDirection::Ascending => SortDirection::Descending,
                    SortDirection::Descending => SortDirection::Ascending,
                },
            },
            _ => Self {
                column,
                direction: SortDirection::Ascending,
            },
        }
    }
}

/// Stable, case-insensitive sort.
pub fn sort_paths(paths: &mut [&PathEntry], sort: SortState) {
    paths.sort_by(|a, b| {
        let ordering = sort.column.key(a).cmp(&sort.column.key(b));
        match sort.direction {
            SortDirection::Ascending => ordering,
            SortDirection::Descending => ordering.reverse(),
        }
    });
}

/// Sorted unique service names for the service filter.
pub fn services(paths: &[PathEntry]) -> Vec<String> {
    paths
        .iter()
        .flat_map(|path| path.services.iter().cloned())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewMode {
    Cards,
    Table,
}

impl ViewMode {
    pub fn for_viewport(shell: &ShellConfig) -> Self {
        if shell.is_narrow() { Self::Cards } else { Self::Table }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Home,
    List,
    Detail(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub route: Route,
    /// Location the address bar should be replaced with, if any.
    pub redirect: Option<String>,
}

/// Maps a location to a view. `hash` may carry its leading `#`.
pub fn resolve_route(pathname: &str, hash: Option<&str>, paths: &[PathEntry]) -> Resolution {
    let legacy = hash
        .map(|hash| hash.trim_start_matches('#'))
        .filter(|hash| LEGACY_HASH_RE.is_match(hash))
        .map(|hash| format!("/paths/{hash}"));
    let pathname = legacy.as_deref().unwrap_or(pathname);

    if let Some(caps) = DETAIL_ROUTE_RE.captures(pathname) {
        let id = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
        if find_path(paths, id).is_some() {
            return Resolution {
                route: Route::Detail(id.to_string()),
                redirect: legacy,
            };
        }
        tracing::debug!(id, "unknown path id; redirecting to list");
        return Resolution {
            route: Route::List,
            redirect: Some("/paths/".to_string()),
        };
    }
    let route = match pathname {
        "/paths" | "/paths/" => Route::List,
        _ => Route::Home,
    };
    Resolution {
        route,
        redirect: legacy,
    }
}

/// Page state, passed explicitly; every transition returns a new state.
#[derive(Debug, Clone)]
pub struct AppState {
    pub paths: Vec<PathEntry>,
    pub filters: Filters,
    pub sort: Option<SortState>,
    pub view_mode: ViewMode,
    pub route: Route,
}

impl AppState {
    pub fn new(paths: Vec<PathEntry>, shell: &ShellConfig) -> Self {
        Self {
            paths,
            filters: Filters::default(),
            sort: None,
            view_mode: ViewMode::for_viewport(shell),
            route: Route::Home,
        }
    }

    pub fn with_filters(self, filters: Filters) -> Self {
        Self { filters, ..self }
    }

    pub fn with_view_mode(self, view_mode: ViewMode) -> Self {
        Self { view_mode, ..self }
    }

    pub fn toggle_sort(self, column: SortColumn) -> Self {
        let sort = Some(SortState::toggle(self.sort, column));
        Self { sort, ..self }
    }

    /// Resolves a location against the catalog; returns the redirect, if any.
    pub fn navigate(self, pathname: &str, hash: Option<&str>) -> (Self, Option<String>) {
        let resolution = resolve_route(pathname, hash, &self.paths);
        (
            Self {
                route: resolution.route,
                ..self
            },
            resolution.redirect,
        )
    }

    /// Filtered paths in the active sort order (catalog order when unsorted).
    pub fn visible(&self) -> Vec<&PathEntry> {
        let mut visible = apply_filters(&self.paths, &self.filters);
        if let Some(sort) = self.sort {
            sort_paths(&mut visible, sort);
        }
        visible
    }

    pub fn current_path(&self) -> Option<&PathEntry> {
        match &self.route {
            Route::Detail(id) => find_path(&self.paths, id),
            Route::Home | Route::List => None,
        }
    }
}
