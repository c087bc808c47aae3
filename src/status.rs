//! Closed vocabularies for the status-like columns.
//!
//! Each enum is stored as its display text in a `VARCHAR` column and rejects
//! unknown values both when deserialising request bodies and when reading rows.

use std::fmt;
use std::io::Write;
use std::str::FromStr;

use diesel::deserialize::{self, FromSql};
use diesel::pg::{Pg, PgValue};
use diesel::serialize::{self, IsNull, Output, ToSql};
use diesel::sql_types::Text;
use diesel::{AsExpression, FromSqlRow};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
#[error("unknown {kind} value '{value}'")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

macro_rules! text_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, AsExpression, FromSqlRow,
        )]
        #[diesel(sql_type = Text)]
        pub enum $name {
            $(
                #[serde(rename = $text)]
                $variant,
            )+
        }

        impl $name {
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $text,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                match value {
                    $($text => Ok(Self::$variant),)+
                    other => Err(UnknownVariant {
                        kind: stringify!($name),
                        value: other.to_string(),
                    }),
                }
            }
        }

        impl ToSql<Text, Pg> for $name {
            fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
                out.write_all(self.as_str().as_bytes())?;
                Ok(IsNull::No)
            }
        }

        impl FromSql<Text, Pg> for $name {
            fn from_sql(bytes: PgValue<'_>) -> deserialize::Result<Self> {
                let raw = std::str::from_utf8(bytes.as_bytes())?;
                Ok(raw.parse()?)
            }
        }
    };
}

text_enum! {
    /// Lifecycle of a dispatch. `Received` is only ever set as a side effect of
    /// recording a receipt against the dispatch.
    DispatchStatus {
        Pending => "Pending",
        Received => "Received",
        Completed => "Completed",
    }
}

text_enum! {
    ReceiptStatus {
        Received => "Received",
        Posted => "Posted",
        Completed => "Completed",
    }
}

text_enum! {
    CashStatus {
        Active => "Active",
        Cancelled => "Cancelled",
    }
}

text_enum! {
    EntryKind {
        Bill => "Bill",
        Payment => "Payment",
    }
}

text_enum! {
    ChargeType {
        Fixed => "Fixed",
        Variable => "Variable",
    }
}

text_enum! {
    RecordStatus {
        Active => "Active",
        Inactive => "Inactive",
    }
}

impl Default for DispatchStatus {
    fn default() -> Self {
        Self::Pending
    }
}

impl Default for ChargeType {
    fn default() -> Self {
        Self::Fixed
    }
}

impl ReceiptStatus {
    /// Allowed moves between receipt states.
    ///
    /// | from      | to                              |
    /// |-----------|---------------------------------|
    /// | Received  | Received, Posted, Completed     |
    /// | Posted    | Posted, Received, Completed     |
    /// | Completed | Completed                       |
    ///
    /// `Posted -> Received` happens when a partial payment is applied to a
    /// posted receipt.
    pub fn can_transition_to(self, next: ReceiptStatus) -> bool {
        use ReceiptStatus::*;
        matches!(
            (self, next),
            (Received, Received | Posted | Completed)
                | (Posted, Posted | Received | Completed)
                | (Completed, Completed)
        )
    }

    /// Status a receipt takes once a payment has been applied.
    pub fn after_payment(remaining_is_zero: bool) -> Self {
        if remaining_is_zero {
            ReceiptStatus::Completed
        } else {
            ReceiptStatus::Received
        }
    }
}
