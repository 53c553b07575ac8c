use diesel::deserialize::{FromSql, FromSqlRow};
use diesel::expression::AsExpression;
use diesel::serialize;
use diesel::serialize::{IsNull, Output, ToSql};
use diesel::sql_types::Text;
use diesel::sqlite::{Sqlite, SqliteValue};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Returned when a stored or submitted value is not a known variant
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind}: {value}")]
pub struct ParseKindError {
    pub kind: &'static str,
    pub value: String,
}

/// Declares a closed set of lowercase string values stored in a TEXT column.
macro_rules! text_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $kind:literal {
            $( $(#[$vmeta:meta])* $variant:ident => $text:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, AsExpression, FromSqlRow)]
        #[serde(rename_all = "snake_case")]
        #[diesel(sql_type = Text)]
        pub enum $name {
            $( $(#[$vmeta])* $variant ),+
        }

        impl $name {
            /// All variants, in declaration order
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// The value as stored and serialized
            pub fn as_str(&self) -> &'static str {
                match self {
                    $( $name::$variant => $text ),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.pad(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = ParseKindError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_ascii_lowercase().replace([' ', '-'], "_").as_str() {
                    $( $text => Ok($name::$variant), )+
                    _ => Err(ParseKindError { kind: $kind, value: s.to_string() }),
                }
            }
        }

        impl FromSql<Text, Sqlite> for $name {
            fn from_sql(value: SqliteValue<'_, '_, '_>) -> diesel::deserialize::Result<Self> {
                let text = <String as FromSql<Text, Sqlite>>::from_sql(value)?;
                Ok(text.parse::<$name>()?)
            }
        }

        impl ToSql<Text, Sqlite> for $name {
            fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Sqlite>) -> serialize::Result {
                out.set_value(self.as_str().to_string());
                Ok(IsNull::No)
            }
        }
    };
}

text_enum! {
    /// What kind of media a row tracks
    MediaType, "media type" {
        Movie => "movie",
        Series => "series",
        Book => "book",
        Album => "album",
        Podcast => "podcast",
        Game => "game",
    }
}

text_enum! {
    /// Where the user is with a piece of media
    MediaStatus, "media status" {
        Planned => "planned",
        InProgress => "in_progress",
        Completed => "completed",
        Dropped => "dropped",
    }
}

text_enum! {
    /// Todo priority
    TodoPriority, "todo priority" {
        Low => "low",
        Medium => "medium",
        High => "high",
    }
}

impl MediaType {
    /// Whether OMDb can describe this kind of media
    pub fn is_screen(&self) -> bool {
        matches!(self, MediaType::Movie | MediaType::Series)
    }
}
