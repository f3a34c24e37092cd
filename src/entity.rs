//! Entity descriptors.
//!
//! One generic controller serves all five dashboard views. What differs
//! between them (endpoint, aliases, sortable columns, default sort, facet,
//! editable fields, create form) is declared here as static data.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::normalize::FieldAlias;
use crate::record::Record;
use crate::sort::{parse_instant, FieldKind, SortDirection};

/// The five entity types served by the data service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Users,
    Teams,
    Activities,
    Workouts,
    Leaderboard,
}

impl EntityKind {
    pub const ALL: [EntityKind; 5] = [
        EntityKind::Users,
        EntityKind::Teams,
        EntityKind::Activities,
        EntityKind::Workouts,
        EntityKind::Leaderboard,
    ];

    pub fn descriptor(self) -> &'static EntityDescriptor {
        match self {
            EntityKind::Users => &USERS,
            EntityKind::Teams => &TEAMS,
            EntityKind::Activities => &ACTIVITIES,
            EntityKind::Workouts => &WORKOUTS,
            EntityKind::Leaderboard => &LEADERBOARD,
        }
    }

    /// Path segment under `/api/`.
    pub fn resource(self) -> &'static str {
        self.descriptor().resource
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.resource())
    }
}

/// What a cell shows when its field is absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fallback {
    Text(&'static str),
    /// 1-based position in the displayed list
    Position,
}

const NA: Fallback = Fallback::Text("N/A");
const ZERO: Fallback = Fallback::Text("0");

/// A displayed column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub key: &'static str,
    pub kind: FieldKind,
    pub sortable: bool,
    pub fallback: Fallback,
}

impl Column {
    const fn sortable(key: &'static str, kind: FieldKind, fallback: Fallback) -> Self {
        Self {
            key,
            kind,
            sortable: true,
            fallback,
        }
    }

    const fn plain(key: &'static str, fallback: Fallback) -> Self {
        Self {
            key,
            kind: FieldKind::Text,
            sortable: false,
            fallback,
        }
    }
}

/// Create-form declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreateSpec {
    /// Text fields taken from the form, in body order
    pub fields: &'static [&'static str],
    /// Fields that must be non-empty
    pub required: &'static [&'static str],
    /// Collection fields sent as empty arrays
    pub empty_collections: &'static [&'static str],
}

/// Static description of one dashboard view.
#[derive(Debug)]
pub struct EntityDescriptor {
    pub kind: EntityKind,
    pub resource: &'static str,
    /// Singular noun used in messages ("User", "Team")
    pub noun: &'static str,
    pub aliases: &'static [FieldAlias],
    pub columns: &'static [Column],
    /// Initial sort; `None` keeps server order until the first sort
    pub default_sort: Option<&'static str>,
    /// Direction for a freshly selected column
    pub default_direction: SortDirection,
    pub facet_field: Option<&'static str>,
    pub editable_fields: &'static [&'static str],
    pub create: Option<CreateSpec>,
}

const ID_ALIAS: FieldAlias = FieldAlias::new("id", &["_id"]);

pub static USERS: EntityDescriptor = EntityDescriptor {
    kind: EntityKind::Users,
    resource: "users",
    noun: "User",
    aliases: &[ID_ALIAS],
    columns: &[
        Column::plain("id", NA),
        Column::sortable("name", FieldKind::Text, NA),
        Column::sortable("email", FieldKind::Text, NA),
        Column::sortable("team", FieldKind::Text, NA),
    ],
    default_sort: Some("name"),
    default_direction: SortDirection::Ascending,
    facet_field: Some("team"),
    editable_fields: &["name", "email", "team"],
    create: None,
};

pub static TEAMS: EntityDescriptor = EntityDescriptor {
    kind: EntityKind::Teams,
    resource: "teams",
    noun: "Team",
    aliases: &[ID_ALIAS],
    columns: &[
        Column::sortable("name", FieldKind::Text, NA),
        Column::plain("description", Fallback::Text("")),
        Column::sortable("members", FieldKind::Count, ZERO),
    ],
    default_sort: Some("name"),
    default_direction: SortDirection::Ascending,
    facet_field: None,
    editable_fields: &[],
    create: Some(CreateSpec {
        fields: &["name", "description"],
        required: &["name"],
        empty_collections: &["members"],
    }),
};

pub static ACTIVITIES: EntityDescriptor = EntityDescriptor {
    kind: EntityKind::Activities,
    resource: "activities",
    noun: "Activity",
    aliases: &[
        ID_ALIAS,
        FieldAlias::new("user_name", &["user"]),
        FieldAlias::new("calories", &["calories_burned"]),
    ],
    columns: &[
        Column::plain("id", NA),
        Column::sortable("user_name", FieldKind::Text, NA),
        Column::sortable("activity_type", FieldKind::Text, NA),
        Column::sortable("duration", FieldKind::Number, NA),
        Column::sortable("calories", FieldKind::Number, NA),
        Column::sortable("date", FieldKind::Date, NA),
    ],
    default_sort: Some("date"),
    default_direction: SortDirection::Descending,
    facet_field: Some("activity_type"),
    editable_fields: &[],
    create: None,
};

pub static WORKOUTS: EntityDescriptor = EntityDescriptor {
    kind: EntityKind::Workouts,
    resource: "workouts",
    noun: "Workout",
    aliases: &[ID_ALIAS],
    columns: &[
        Column::sortable("name", FieldKind::Text, Fallback::Text("Unnamed Workout")),
        Column::plain("description", Fallback::Text("No description available")),
        Column::sortable("duration", FieldKind::Number, ZERO),
        Column::sortable("difficulty", FieldKind::Text, NA),
        Column::sortable("calories_estimate", FieldKind::Number, ZERO),
        Column::sortable("exercises", FieldKind::Count, ZERO),
    ],
    default_sort: None,
    default_direction: SortDirection::Ascending,
    facet_field: None,
    editable_fields: &[],
    create: None,
};

// total_points is kept as a fallback for total_calories only; the two are
// not assumed to be the same metric.
pub static LEADERBOARD: EntityDescriptor = EntityDescriptor {
    kind: EntityKind::Leaderboard,
    resource: "leaderboard",
    noun: "Leaderboard entry",
    aliases: &[
        ID_ALIAS,
        FieldAlias::new("user_name", &["user"]),
        FieldAlias::new("total_calories", &["total_points"]),
    ],
    columns: &[
        Column::sortable("rank", FieldKind::Number, Fallback::Position),
        Column::sortable("user_name", FieldKind::Text, NA),
        Column::plain("team", NA),
        Column::sortable("total_calories", FieldKind::Number, ZERO),
        Column::sortable("total_activities", FieldKind::Number, ZERO),
    ],
    default_sort: Some("total_calories"),
    default_direction: SortDirection::Descending,
    facet_field: Some("team"),
    editable_fields: &[],
    create: None,
};

impl EntityDescriptor {
    pub fn column(&self, key: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.key == key)
    }

    /// Column if it exists and is sortable.
    pub fn sort_column(&self, key: &str) -> Option<&Column> {
        self.column(key).filter(|c| c.sortable)
    }

    pub fn is_editable(&self) -> bool {
        !self.editable_fields.is_empty()
    }

    /// Cell text for `field` of a record shown at `position` (0-based).
    pub fn display(&self, record: &Record, field: &str, position: usize) -> String {
        let column = self.column(field);
        let fallback = column.map(|c| c.fallback).unwrap_or(NA);

        let text = match column.map(|c| c.kind) {
            Some(FieldKind::Count) => Some(record.count(field).to_string()),
            Some(FieldKind::Date) => record
                .get(field)
                .and_then(parse_instant)
                .map(|dt| dt.format("%b %-d, %Y").to_string()),
            _ => record.text(field),
        };

        text.unwrap_or_else(|| match fallback {
            Fallback::Text(s) => s.to_string(),
            Fallback::Position => (position + 1).to_string(),
        })
    }
}
