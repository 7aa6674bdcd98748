//! Field registry: the bridge between AQL fields and the physical schema.
//!
//! Every [`PhysicalField`] maps to exactly one table column. The mapping is a
//! static table built once and queried by field or by table.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::domain::Domain;
use crate::error::{AqlError, AqlResult};

/// Table ids at or above this value are dynamic and render as `prefix + id`.
pub const MINIMAL_DYNAMIC_TABLE_ID: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SqlTableName {
    Nodes,
    NodeProps,
    Stats,
    IndexedArchives,
    IndexedArchivesEntries,
    ArchivePaths,
    ArchiveNames,
    BuildArtifacts,
    BuildDependencies,
    BuildModules,
    ModuleProps,
    Builds,
    BuildProps,
    BuildPromotions,
}

impl SqlTableName {
    pub fn table_name(self) -> &'static str {
        match self {
            SqlTableName::Nodes => "nodes",
            SqlTableName::NodeProps => "node_props",
            SqlTableName::Stats => "stats",
            SqlTableName::IndexedArchives => "indexed_archives",
            SqlTableName::IndexedArchivesEntries => "indexed_archives_entries",
            SqlTableName::ArchivePaths => "archive_paths",
            SqlTableName::ArchiveNames => "archive_names",
            SqlTableName::BuildArtifacts => "build_artifacts",
            SqlTableName::BuildDependencies => "build_dependencies",
            SqlTableName::BuildModules => "build_modules",
            SqlTableName::ModuleProps => "module_props",
            SqlTableName::Builds => "builds",
            SqlTableName::BuildProps => "build_props",
            SqlTableName::BuildPromotions => "build_promotions",
        }
    }

    pub fn alias_prefix(self) -> &'static str {
        match self {
            SqlTableName::Nodes => "n",
            SqlTableName::NodeProps => "np",
            SqlTableName::Stats => "s",
            SqlTableName::IndexedArchives => "ia",
            SqlTableName::IndexedArchivesEntries => "iae",
            SqlTableName::ArchivePaths => "ap",
            SqlTableName::ArchiveNames => "an",
            SqlTableName::BuildArtifacts => "ba",
            SqlTableName::BuildDependencies => "bd",
            SqlTableName::BuildModules => "bm",
            SqlTableName::ModuleProps => "mp",
            SqlTableName::Builds => "b",
            SqlTableName::BuildProps => "bp",
            SqlTableName::BuildPromotions => "bpr",
        }
    }

    /// Key/value tables searched by `@key` criteria.
    pub fn is_property_table(self) -> bool {
        matches!(
            self,
            SqlTableName::NodeProps | SqlTableName::ModuleProps | SqlTableName::BuildProps
        )
    }
}

/// A table occurrence in a generated query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SqlTable {
    pub name: SqlTableName,
    pub id: u32,
}

impl SqlTable {
    pub fn new(name: SqlTableName, id: u32) -> Self {
        Self { name, id }
    }

    pub fn main(name: SqlTableName) -> Self {
        Self { name, id: 0 }
    }

    pub fn alias(&self) -> String {
        if self.id == 0 {
            self.name.alias_prefix().to_string()
        } else {
            format!("{}{}", self.name.alias_prefix(), self.id)
        }
    }

    pub fn is_dynamic(&self) -> bool {
        self.id >= MINIMAL_DYNAMIC_TABLE_ID
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldType {
    String,
    Long,
    Integer,
    Date,
    ItemType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PhysicalField {
    ItemId,
    ItemRepo,
    ItemPath,
    ItemName,
    ItemType,
    ItemDepth,
    ItemCreated,
    ItemCreatedBy,
    ItemModified,
    ItemModifiedBy,
    ItemUpdated,
    ItemSize,
    ItemActualSha1,
    ItemOriginalSha1,
    ItemActualMd5,
    ItemOriginalMd5,
    PropertyKey,
    PropertyValue,
    StatDownloaded,
    StatDownloads,
    StatDownloadedBy,
    ArchiveEntryName,
    ArchiveEntryPath,
    ArtifactName,
    ArtifactType,
    ArtifactSha1,
    ArtifactMd5,
    DependencyName,
    DependencyScope,
    DependencyType,
    DependencySha1,
    DependencyMd5,
    ModuleName,
    ModulePropertyKey,
    ModulePropertyValue,
    BuildUrl,
    BuildName,
    BuildNumber,
    BuildCreated,
    BuildCreatedBy,
    BuildModified,
    BuildModifiedBy,
    BuildPropertyKey,
    BuildPropertyValue,
    BuildPromotionCreated,
    BuildPromotionCreatedBy,
    BuildPromotionStatus,
    BuildPromotionRepo,
    BuildPromotionComment,
    BuildPromotionUserName,
}

/// Where a field lives and how it reads back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldExtension {
    pub field: PhysicalField,
    pub domain: Domain,
    /// Name of the field within its domain, as written in queries and JSON output.
    pub name: &'static str,
    /// Column alias in generated SQL.
    pub alias: &'static str,
    pub table: SqlTableName,
    pub column: &'static str,
    pub nullable: bool,
    pub field_type: FieldType,
}

macro_rules! ext {
    ($field:ident, $domain:ident, $name:expr, $alias:expr, $table:ident, $column:expr, $nullable:expr, $ty:ident) => {
        FieldExtension {
            field: PhysicalField::$field,
            domain: Domain::$domain,
            name: $name,
            alias: $alias,
            table: SqlTableName::$table,
            column: $column,
            nullable: $nullable,
            field_type: FieldType::$ty,
        }
    };
}

static EXTENSIONS: &[FieldExtension] = &[
    ext!(ItemId, Items, "id", "itemId", Nodes, "node_id", false, Long),
    ext!(ItemRepo, Items, "repo", "itemRepo", Nodes, "repo", false, String),
    ext!(ItemPath, Items, "path", "itemPath", Nodes, "node_path", false, String),
    ext!(ItemName, Items, "name", "itemName", Nodes, "node_name", false, String),
    ext!(ItemType, Items, "type", "itemType", Nodes, "node_type", false, ItemType),
    ext!(ItemDepth, Items, "depth", "itemDepth", Nodes, "depth", false, Integer),
    ext!(ItemCreated, Items, "created", "itemCreated", Nodes, "created", false, Date),
    ext!(ItemCreatedBy, Items, "created_by", "itemCreatedBy", Nodes, "created_by", true, String),
    ext!(ItemModified, Items, "modified", "itemModified", Nodes, "modified", true, Date),
    ext!(ItemModifiedBy, Items, "modified_by", "itemModifiedBy", Nodes, "modified_by", true, String),
    ext!(ItemUpdated, Items, "updated", "itemUpdated", Nodes, "updated", true, Date),
    ext!(ItemSize, Items, "size", "itemSize", Nodes, "bin_length", true, Long),
    ext!(ItemActualSha1, Items, "actual_sha1", "itemActualSha1", Nodes, "sha1_actual", true, String),
    ext!(ItemOriginalSha1, Items, "original_sha1", "itemOriginalSha1", Nodes, "sha1_original", true, String),
    ext!(ItemActualMd5, Items, "actual_md5", "itemActualMd5", Nodes, "md5_actual", true, String),
    ext!(ItemOriginalMd5, Items, "original_md5", "itemOriginalMd5", Nodes, "md5_original", true, String),
    ext!(PropertyKey, Properties, "key", "propertyKey", NodeProps, "prop_key", false, String),
    ext!(PropertyValue, Properties, "value", "propertyValue", NodeProps, "prop_value", true, String),
    ext!(StatDownloaded, Statistics, "downloaded", "statDownloaded", Stats, "last_downloaded", true, Date),
    ext!(StatDownloads, Statistics, "downloads", "statDownloads", Stats, "download_count", true, Long),
    ext!(StatDownloadedBy, Statistics, "downloaded_by", "statDownloadedBy", Stats, "last_downloaded_by", true, String),
    ext!(ArchiveEntryName, Entries, "name", "archiveEntryName", ArchiveNames, "entry_name", false, String),
    ext!(ArchiveEntryPath, Entries, "path", "archiveEntryPath", ArchivePaths, "entry_path", false, String),
    ext!(ArtifactName, Artifacts, "name", "artifactName", BuildArtifacts, "artifact_name", false, String),
    ext!(ArtifactType, Artifacts, "type", "artifactType", BuildArtifacts, "artifact_type", true, String),
    ext!(ArtifactSha1, Artifacts, "sha1", "artifactSha1", BuildArtifacts, "sha1", true, String),
    ext!(ArtifactMd5, Artifacts, "md5", "artifactMd5", BuildArtifacts, "md5", true, String),
    ext!(DependencyName, Dependencies, "name", "dependencyName", BuildDependencies, "dependency_name_id", false, String),
    ext!(DependencyScope, Dependencies, "scope", "dependencyScope", BuildDependencies, "dependency_scopes", true, String),
    ext!(DependencyType, Dependencies, "type", "dependencyType", BuildDependencies, "dependency_type", true, String),
    ext!(DependencySha1, Dependencies, "sha1", "dependencySha1", BuildDependencies, "sha1", true, String),
    ext!(DependencyMd5, Dependencies, "md5", "dependencyMd5", BuildDependencies, "md5", true, String),
    ext!(ModuleName, Modules, "name", "moduleName", BuildModules, "module_name_id", false, String),
    ext!(ModulePropertyKey, ModuleProperties, "key", "modulePropertyKey", ModuleProps, "prop_key", false, String),
    ext!(ModulePropertyValue, ModuleProperties, "value", "modulePropertyValue", ModuleProps, "prop_value", true, String),
    ext!(BuildUrl, Builds, "url", "buildUrl", Builds, "ci_url", true, String),
    ext!(BuildName, Builds, "name", "buildName", Builds, "build_name", false, String),
    ext!(BuildNumber, Builds, "number", "buildNumber", Builds, "build_number", false, String),
    ext!(BuildCreated, Builds, "created", "buildCreated", Builds, "created", false, Date),
    ext!(BuildCreatedBy, Builds, "created_by", "buildCreatedBy", Builds, "created_by", true, String),
    ext!(BuildModified, Builds, "modified", "buildModified", Builds, "modified", true, Date),
    ext!(BuildModifiedBy, Builds, "modified_by", "buildModifiedBy", Builds, "modified_by", true, String),
    ext!(BuildPropertyKey, BuildProperties, "key", "buildPropertyKey", BuildProps, "prop_key", false, String),
    ext!(BuildPropertyValue, BuildProperties, "value", "buildPropertyValue", BuildProps, "prop_value", true, String),
    ext!(BuildPromotionCreated, BuildPromotions, "created", "buildPromotionCreated", BuildPromotions, "created", false, Date),
    ext!(BuildPromotionCreatedBy, BuildPromotions, "created_by", "buildPromotionCreatedBy", BuildPromotions, "created_by", true, String),
    ext!(BuildPromotionStatus, BuildPromotions, "status", "buildPromotionStatus", BuildPromotions, "status", false, String),
    ext!(BuildPromotionRepo, BuildPromotions, "repo", "buildPromotionRepo", BuildPromotions, "repo", true, String),
    ext!(BuildPromotionComment, BuildPromotions, "comment", "buildPromotionComment", BuildPromotions, "promotion_comment", true, String),
    ext!(BuildPromotionUserName, BuildPromotions, "user_name", "buildPromotionUserName", BuildPromotions, "ci_user", true, String),
];

static BY_FIELD: Lazy<HashMap<PhysicalField, &'static FieldExtension>> =
    Lazy::new(|| EXTENSIONS.iter().map(|e| (e.field, e)).collect());

static BY_TABLE: Lazy<HashMap<SqlTableName, Vec<PhysicalField>>> = Lazy::new(|| {
    let mut map: HashMap<SqlTableName, Vec<PhysicalField>> = HashMap::new();
    for ext in EXTENSIONS {
        map.entry(ext.table).or_default().push(ext.field);
    }
    map
});

/// Resolve the physical location of a field.
pub fn lookup(field: PhysicalField) -> AqlResult<&'static FieldExtension> {
    BY_FIELD
        .get(&field)
        .copied()
        .ok_or_else(|| AqlError::Configuration(format!("no column registered for {:?}", field)))
}

/// All fields stored in the given table.
pub fn fields_of(table: SqlTableName) -> &'static [PhysicalField] {
    BY_TABLE.get(&table).map(|v| v.as_slice()).unwrap_or(&[])
}

/// All fields exposed by a domain, in registry order.
pub fn domain_fields(domain: Domain) -> impl Iterator<Item = PhysicalField> {
    EXTENSIONS
        .iter()
        .filter(move |e| e.domain == domain)
        .map(|e| e.field)
}

/// Find a field by its name within a domain.
pub fn field_by_name(domain: Domain, name: &str) -> Option<PhysicalField> {
    EXTENSIONS
        .iter()
        .find(|e| e.domain == domain && e.name == name)
        .map(|e| e.field)
}

/// Fields returned when a query does not include fields of its main domain.
pub fn default_fields(domain: Domain) -> &'static [PhysicalField] {
    use PhysicalField::*;
    match domain {
        Domain::Items => &[
            ItemRepo,
            ItemPath,
            ItemName,
            ItemType,
            ItemSize,
            ItemCreated,
            ItemCreatedBy,
            ItemModified,
            ItemModifiedBy,
            ItemUpdated,
        ],
        Domain::Properties => &[PropertyKey, PropertyValue],
        Domain::Statistics => &[StatDownloaded, StatDownloads, StatDownloadedBy],
        Domain::Archives => &[],
        Domain::Entries => &[ArchiveEntryName, ArchiveEntryPath],
        Domain::Artifacts => &[ArtifactName, ArtifactType, ArtifactSha1, ArtifactMd5],
        Domain::Dependencies => &[
            DependencyName,
            DependencyScope,
            DependencyType,
            DependencySha1,
            DependencyMd5,
        ],
        Domain::Modules => &[ModuleName],
        Domain::ModuleProperties => &[ModulePropertyKey, ModulePropertyValue],
        Domain::Builds => &[
            BuildUrl,
            BuildName,
            BuildNumber,
            BuildCreated,
            BuildCreatedBy,
            BuildModified,
            BuildModifiedBy,
        ],
        Domain::BuildProperties => &[BuildPropertyKey, BuildPropertyValue],
        Domain::BuildPromotions => &[
            BuildPromotionCreated,
            BuildPromotionCreatedBy,
            BuildPromotionStatus,
            BuildPromotionRepo,
            BuildPromotionComment,
            BuildPromotionUserName,
        ],
    }
}

/// The key and value fields of a property domain.
pub fn property_fields(domain: Domain) -> Option<(PhysicalField, PhysicalField)> {
    match domain {
        Domain::Properties => Some((PhysicalField::PropertyKey, PhysicalField::PropertyValue)),
        Domain::ModuleProperties => Some((
            PhysicalField::ModulePropertyKey,
            PhysicalField::ModulePropertyValue,
        )),
        Domain::BuildProperties => Some((
            PhysicalField::BuildPropertyKey,
            PhysicalField::BuildPropertyValue,
        )),
        _ => None,
    }
}

/// Foreign key links between tables, as `(table, column)` pairs.
static LINKS: &[((SqlTableName, &str), (SqlTableName, &str))] = &[
    ((SqlTableName::Nodes, "node_id"), (SqlTableName::NodeProps, "node_id")),
    ((SqlTableName::Nodes, "node_id"), (SqlTableName::Stats, "node_id")),
    ((SqlTableName::Nodes, "sha1_actual"), (SqlTableName::IndexedArchives, "archive_sha1")),
    ((SqlTableName::Nodes, "sha1_actual"), (SqlTableName::BuildArtifacts, "sha1")),
    ((SqlTableName::Nodes, "sha1_actual"), (SqlTableName::BuildDependencies, "sha1")),
    (
        (SqlTableName::IndexedArchives, "indexed_archives_id"),
        (SqlTableName::IndexedArchivesEntries, "indexed_archives_id"),
    ),
    (
        (SqlTableName::IndexedArchivesEntries, "entry_path_id"),
        (SqlTableName::ArchivePaths, "path_id"),
    ),
    (
        (SqlTableName::IndexedArchivesEntries, "entry_name_id"),
        (SqlTableName::ArchiveNames, "name_id"),
    ),
    ((SqlTableName::BuildArtifacts, "module_id"), (SqlTableName::BuildModules, "module_id")),
    ((SqlTableName::BuildDependencies, "module_id"), (SqlTableName::BuildModules, "module_id")),
    ((SqlTableName::BuildModules, "build_id"), (SqlTableName::Builds, "build_id")),
    ((SqlTableName::BuildModules, "module_id"), (SqlTableName::ModuleProps, "module_id")),
    ((SqlTableName::Builds, "build_id"), (SqlTableName::BuildProps, "build_id")),
    ((SqlTableName::Builds, "build_id"), (SqlTableName::BuildPromotions, "build_id")),
];

/// Join columns between two linked tables: `(column of from, column of to)`.
pub fn link(from: SqlTableName, to: SqlTableName) -> AqlResult<(&'static str, &'static str)> {
    LINKS
        .iter()
        .find_map(|((a, a_col), (b, b_col))| {
            if *a == from && *b == to {
                Some((*a_col, *b_col))
            } else if *b == from && *a == to {
                Some((*b_col, *a_col))
            } else {
                None
            }
        })
        .ok_or_else(|| {
            AqlError::Configuration(format!(
                "no link between {} and {}",
                from.table_name(),
                to.table_name()
            ))
        })
}

/// Tables visited when reaching `field_table` through a sub-domain path.
pub fn table_chain(sub_domains: &[Domain], field_table: SqlTableName) -> Vec<SqlTableName> {
    let mut chain: Vec<SqlTableName> = sub_domains.iter().map(|d| d.primary_table()).collect();
    if chain.last() != Some(&field_table) {
        chain.push(field_table);
    }
    chain
}

impl PhysicalField {
    pub fn extension(self) -> AqlResult<&'static FieldExtension> {
        lookup(self)
    }

    pub fn domain(self) -> Option<Domain> {
        lookup(self).ok().map(|e| e.domain)
    }

    pub fn name(self) -> &'static str {
        lookup(self).map(|e| e.name).unwrap_or("unknown")
    }

    pub fn all() -> impl Iterator<Item = PhysicalField> {
        EXTENSIONS.iter().map(|e| e.field)
    }
}
