//! Domains and the sub-domain graph.
//!
//! Every query has one main domain. Fields of related domains are reached by
//! walking the sub-domain graph, e.g. `items -> archive -> entry`.

use serde::{Deserialize, Serialize};

use crate::registry::SqlTableName;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    Items,
    Properties,
    Statistics,
    Archives,
    Entries,
    Artifacts,
    Dependencies,
    Modules,
    ModuleProperties,
    Builds,
    BuildProperties,
    BuildPromotions,
}

impl Domain {
    pub const ALL: [Domain; 12] = [
        Domain::Items,
        Domain::Properties,
        Domain::Statistics,
        Domain::Archives,
        Domain::Entries,
        Domain::Artifacts,
        Domain::Dependencies,
        Domain::Modules,
        Domain::ModuleProperties,
        Domain::Builds,
        Domain::BuildProperties,
        Domain::BuildPromotions,
    ];

    /// Resolve the main domain of a textual query, e.g. `items` or `build.properties`.
    pub fn from_main_name(name: &str) -> Option<Domain> {
        match name {
            "items" => Some(Domain::Items),
            "properties" => Some(Domain::Properties),
            "stats" => Some(Domain::Statistics),
            "archive.entries" | "entries" => Some(Domain::Entries),
            "artifacts" => Some(Domain::Artifacts),
            "dependencies" => Some(Domain::Dependencies),
            "modules" => Some(Domain::Modules),
            "module.properties" => Some(Domain::ModuleProperties),
            "builds" => Some(Domain::Builds),
            "build.properties" => Some(Domain::BuildProperties),
            "build.promotions" => Some(Domain::BuildPromotions),
            _ => None,
        }
    }

    /// Name of this domain when it appears as a path segment below a parent domain.
    pub fn segment(self) -> &'static str {
        match self {
            Domain::Items => "item",
            Domain::Properties => "property",
            Domain::Statistics => "stat",
            Domain::Archives => "archive",
            Domain::Entries => "entry",
            Domain::Artifacts => "artifact",
            Domain::Dependencies => "dependency",
            Domain::Modules => "module",
            Domain::ModuleProperties => "property",
            Domain::Builds => "build",
            Domain::BuildProperties => "property",
            Domain::BuildPromotions => "promotion",
        }
    }

    /// Key used for nested child rows in the JSON output.
    pub fn plural(self) -> &'static str {
        match self {
            Domain::Items => "items",
            Domain::Properties => "properties",
            Domain::Statistics => "stats",
            Domain::Archives => "archives",
            Domain::Entries => "entries",
            Domain::Artifacts => "artifacts",
            Domain::Dependencies => "dependencies",
            Domain::Modules => "modules",
            Domain::ModuleProperties => "properties",
            Domain::Builds => "builds",
            Domain::BuildProperties => "properties",
            Domain::BuildPromotions => "promotions",
        }
    }

    pub fn sub_domains(self) -> &'static [Domain] {
        match self {
            Domain::Items => &[
                Domain::Properties,
                Domain::Statistics,
                Domain::Archives,
                Domain::Artifacts,
                Domain::Dependencies,
            ],
            Domain::Properties => &[Domain::Items],
            Domain::Statistics => &[Domain::Items],
            Domain::Archives => &[Domain::Items, Domain::Entries],
            Domain::Entries => &[Domain::Archives],
            Domain::Artifacts => &[Domain::Items, Domain::Modules],
            Domain::Dependencies => &[Domain::Items, Domain::Modules],
            Domain::Modules => &[
                Domain::Artifacts,
                Domain::Dependencies,
                Domain::Builds,
                Domain::ModuleProperties,
            ],
            Domain::ModuleProperties => &[Domain::Modules],
            Domain::Builds => &[
                Domain::Modules,
                Domain::BuildProperties,
                Domain::BuildPromotions,
            ],
            Domain::BuildProperties => &[Domain::Builds],
            Domain::BuildPromotions => &[Domain::Builds],
        }
    }

    /// Follow one edge of the sub-domain graph by its segment name.
    pub fn sub_domain(self, segment: &str) -> Option<Domain> {
        self.sub_domains()
            .iter()
            .copied()
            .find(|d| d.segment() == segment)
    }

    pub fn primary_table(self) -> SqlTableName {
        match self {
            Domain::Items => SqlTableName::Nodes,
            Domain::Properties => SqlTableName::NodeProps,
            Domain::Statistics => SqlTableName::Stats,
            Domain::Archives => SqlTableName::IndexedArchives,
            Domain::Entries => SqlTableName::IndexedArchivesEntries,
            Domain::Artifacts => SqlTableName::BuildArtifacts,
            Domain::Dependencies => SqlTableName::BuildDependencies,
            Domain::Modules => SqlTableName::BuildModules,
            Domain::ModuleProperties => SqlTableName::ModuleProps,
            Domain::Builds => SqlTableName::Builds,
            Domain::BuildProperties => SqlTableName::BuildProps,
            Domain::BuildPromotions => SqlTableName::BuildPromotions,
        }
    }

    /// The property domain reachable from this domain through the `@key` shorthand.
    pub fn property_domain(self) -> Option<Domain> {
        match self {
            Domain::Items | Domain::Properties => Some(Domain::Properties),
            Domain::Modules | Domain::ModuleProperties => Some(Domain::ModuleProperties),
            Domain::Builds | Domain::BuildProperties => Some(Domain::BuildProperties),
            _ => None,
        }
    }

    pub fn is_property_domain(self) -> bool {
        matches!(
            self,
            Domain::Properties | Domain::ModuleProperties | Domain::BuildProperties
        )
    }
}

impl std::fmt::Display for Domain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.plural())
    }
}
